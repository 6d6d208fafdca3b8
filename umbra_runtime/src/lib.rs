#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate contains the types and functions for executing an Umbra
//! [`Circuit`](umbra_circuit::Circuit) homomorphically over encrypted bits.
//!
//! A [`Runtime`] wraps a circuit [`Package`](umbra_circuit::Package) and its
//! call metadata. Each [`run`](Runtime::run) walks the entry circuit in
//! dependency order: a coordinator repeatedly gathers the nodes whose
//! operands are ready and hands them to a fixed pool of worker threads,
//! which evaluate gates through a caller-supplied [`BooleanEvaluator`].
//! When the graph drains, the output collector copies the encrypted result
//! bits into the caller's buffers, reversing the graph's big-endian bit
//! order into the host's little-endian layout.
//!
//! The gate provider is opaque to this crate: anything implementing
//! [`BooleanEvaluator`] works, from a bootstrapped FHE gate library to the
//! bundled cleartext [`PlainEvaluator`].

mod error;
mod metadata;
mod plain;
mod run;
mod runtime;
mod slice;

pub use crate::error::*;
pub use crate::metadata::*;
pub use crate::plain::*;
pub use crate::runtime::*;

/**
 * A homomorphic gate library over single-bit ciphertexts.
 *
 * The implementor doubles as the cloud-key handle: one value is shared
 * immutably by every worker thread for the duration of a run, so gate
 * evaluation must be safe under concurrent `&self` calls. Gates are
 * deterministic and treated as infallible. A ciphertext is freed by
 * dropping it.
 */
pub trait BooleanEvaluator: Sync {
    /**
     * An encryption of a single bit.
     */
    type Ciphertext: Send + Sync;

    /**
     * Allocates a fresh ciphertext. Its initial bit value is unspecified.
     */
    fn new_ciphertext(&self) -> Self::Ciphertext;

    /**
     * Copies the bit held in `src` into `out`.
     */
    fn copy(&self, out: &mut Self::Ciphertext, src: &Self::Ciphertext);

    /**
     * Sets `out` to a trivial encryption of `bit`.
     */
    fn constant(&self, out: &mut Self::Ciphertext, bit: bool);

    /**
     * Writes the AND of `a` and `b` into `out`.
     */
    fn and(&self, out: &mut Self::Ciphertext, a: &Self::Ciphertext, b: &Self::Ciphertext);

    /**
     * Writes the OR of `a` and `b` into `out`.
     */
    fn or(&self, out: &mut Self::Ciphertext, a: &Self::Ciphertext, b: &Self::Ciphertext);

    /**
     * Writes the NOT of `a` into `out`.
     */
    fn not(&self, out: &mut Self::Ciphertext, a: &Self::Ciphertext);
}
