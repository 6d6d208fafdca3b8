use std::sync::atomic::{AtomicUsize, Ordering};

use crate::BooleanEvaluator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/**
 * A cleartext bit wearing the ciphertext interface.
 */
pub struct PlainBit {
    value: bool,
}

#[derive(Debug, Default)]
/**
 * A [`BooleanEvaluator`] over cleartext bits, for tests and debugging.
 *
 * `encrypt` and `decrypt` stand in for the real scheme's key operations,
 * and every AND/OR/NOT invocation bumps an internal counter so callers can
 * observe how much boolean work a run performed.
 */
pub struct PlainEvaluator {
    gate_count: AtomicUsize,
}

impl PlainEvaluator {
    /**
     * Creates a new evaluator with a zeroed gate counter.
     */
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * Trivially "encrypts" the given bits.
     */
    pub fn encrypt(&self, bits: &[bool]) -> Vec<PlainBit> {
        bits.iter().map(|bit| PlainBit { value: *bit }).collect()
    }

    /**
     * Recovers the bits held in the given ciphertexts.
     */
    pub fn decrypt(&self, bits: &[PlainBit]) -> Vec<bool> {
        bits.iter().map(|bit| bit.value).collect()
    }

    /**
     * The number of AND/OR/NOT invocations since construction.
     */
    pub fn gate_count(&self) -> usize {
        self.gate_count.load(Ordering::Relaxed)
    }
}

impl BooleanEvaluator for PlainEvaluator {
    type Ciphertext = PlainBit;

    fn new_ciphertext(&self) -> PlainBit {
        PlainBit::default()
    }

    fn copy(&self, out: &mut PlainBit, src: &PlainBit) {
        out.value = src.value;
    }

    fn constant(&self, out: &mut PlainBit, bit: bool) {
        out.value = bit;
    }

    fn and(&self, out: &mut PlainBit, a: &PlainBit, b: &PlainBit) {
        self.gate_count.fetch_add(1, Ordering::Relaxed);
        out.value = a.value && b.value;
    }

    fn or(&self, out: &mut PlainBit, a: &PlainBit, b: &PlainBit) {
        self.gate_count.fetch_add(1, Ordering::Relaxed);
        out.value = a.value || b.value;
    }

    fn not(&self, out: &mut PlainBit, a: &PlainBit) {
        self.gate_count.fetch_add(1, Ordering::Relaxed);
        out.value = !a.value;
    }
}
