use serde::{Deserialize, Serialize};

use crate::Literal;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/**
 * The operation a circuit node performs.
 *
 * `And`, `Or`, and `Not` are the gate operations; everything else is
 * structural or address computation and produces no ciphertext of its own.
 * Operands are ordered; the index of each operand is carried on the graph
 * edge feeding the node.
 */
pub enum Operation {
    /**
     * A named function parameter. Its bits live in the caller's argument
     * buffer of the same name.
     */
    Parameter(String),

    /**
     * A compile-time constant.
     */
    Literal(Literal),

    /**
     * Extracts `width` bits of operand 0 starting at bit `start`. The
     * evaluated circuits only ever slice a single bit at a time.
     */
    BitSlice {
        /**
         * The first bit of the extracted range.
         */
        start: usize,

        /**
         * The number of extracted bits.
         */
        width: usize,
    },

    /**
     * Logical shift right. Operand 0 is the shifted value, operand 1 the
     * shift amount.
     */
    ShiftRightLogical,

    /**
     * Big-endian concatenation of its operands into one bit vector.
     */
    Concat,

    /**
     * An element read. Operand 0 is the array; the remaining operands are
     * the index per dimension.
     */
    ArrayIndex,

    /**
     * A read of the given field of the tuple at operand 0.
     */
    TupleIndex(usize),

    /**
     * Array construction from its operands.
     */
    Array,

    /**
     * Tuple construction from its operands.
     */
    Tuple,

    /**
     * The AND of two single-bit operands.
     */
    And,

    /**
     * The OR of two single-bit operands.
     */
    Or,

    /**
     * The NOT of one single-bit operand.
     */
    Not,
}

impl Operation {
    /**
     * Whether this is a [`Operation::Parameter`].
     */
    pub fn is_parameter(&self) -> bool {
        matches!(self, Operation::Parameter(_))
    }

    /**
     * Whether this is a [`Operation::Literal`].
     */
    pub fn is_literal(&self) -> bool {
        matches!(self, Operation::Literal(_))
    }

    /**
     * Whether this is a [`Operation::BitSlice`].
     */
    pub fn is_bit_slice(&self) -> bool {
        matches!(self, Operation::BitSlice { .. })
    }

    /**
     * Whether this is a [`Operation::ShiftRightLogical`].
     */
    pub fn is_shift_right(&self) -> bool {
        matches!(self, Operation::ShiftRightLogical)
    }

    /**
     * Whether this is a [`Operation::Concat`].
     */
    pub fn is_concat(&self) -> bool {
        matches!(self, Operation::Concat)
    }

    /**
     * Whether this is a [`Operation::ArrayIndex`].
     */
    pub fn is_array_index(&self) -> bool {
        matches!(self, Operation::ArrayIndex)
    }

    /**
     * Whether this is a [`Operation::TupleIndex`].
     */
    pub fn is_tuple_index(&self) -> bool {
        matches!(self, Operation::TupleIndex(_))
    }

    /**
     * Whether this is one of the gate operations (`And`, `Or`, `Not`).
     */
    pub fn is_gate(&self) -> bool {
        matches!(self, Operation::And | Operation::Or | Operation::Not)
    }
}
