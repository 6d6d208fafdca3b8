use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/**
 * The shape of the value a circuit node produces.
 *
 * Every type flattens to a contiguous run of single-bit ciphertexts in a
 * caller's buffer; [`flat_bit_count`](Self::flat_bit_count) gives the run's
 * length. Bit vectors are stored big-endian inside the graph and
 * little-endian in host buffers; the runtime's output collector performs
 * the reversal.
 */
pub enum Type {
    /**
     * A bit vector of the given width.
     */
    Bits(usize),

    /**
     * A fixed-size array.
     */
    Array {
        /**
         * The type of each element.
         */
        element: Box<Type>,

        /**
         * The number of elements.
         */
        size: usize,
    },

    /**
     * An ordered collection of heterogeneously-typed fields.
     */
    Tuple(Vec<Type>),
}

impl Type {
    /**
     * The number of single-bit ciphertexts this type occupies when
     * flattened into a host buffer.
     */
    pub fn flat_bit_count(&self) -> usize {
        match self {
            Type::Bits(width) => *width,
            Type::Array { element, size } => element.flat_bit_count() * size,
            Type::Tuple(fields) => fields.iter().map(Type::flat_bit_count).sum(),
        }
    }
}
