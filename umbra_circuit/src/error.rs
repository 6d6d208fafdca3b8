use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
/**
 * A structural defect found while validating a [`Circuit`](crate::Circuit).
 */
pub enum IRError {
    /**
     * The graph contains a cycle.
     */
    #[error("the graph contains a cycle")]
    CyclicGraph,

    /**
     * A node's incoming edges skip an operand position.
     */
    #[error("node {node} has no operand at position {position}")]
    MissingOperand {
        /**
         * The offending node's index.
         */
        node: usize,

        /**
         * The first absent operand position.
         */
        position: usize,
    },

    /**
     * A node has the wrong number of operands for its operation.
     */
    #[error("node {node} expects {expected} operands but has {actual}")]
    WrongOperandCount {
        /**
         * The offending node's index.
         */
        node: usize,

        /**
         * The operand count the operation requires. For variable-arity
         * operations this is the minimum.
         */
        expected: usize,

        /**
         * The operand count the node actually has.
         */
        actual: usize,
    },

    /**
     * A gate node, or one of its operands, is not single-bit.
     */
    #[error("gate node {node} involves a value wider than one bit")]
    NonBitGate {
        /**
         * The offending node's index.
         */
        node: usize,
    },

    /**
     * A node of a kind that may not appear in a bit-slice operand chain
     * was found in one.
     */
    #[error(
        "node {node} appears in a bit-slice chain but is not an array index, \
         bit slice, shift, tuple index, or parameter"
    )]
    InvalidSliceChain {
        /**
         * The offending node's index.
         */
        node: usize,
    },

    /**
     * An entry of the parameter list is not a parameter node.
     */
    #[error("signature entry {node} is not a parameter node")]
    NonParameterInSignature {
        /**
         * The offending node's index.
         */
        node: usize,
    },

    /**
     * The designated return value is not a node of the graph.
     */
    #[error("the return value references a node outside the graph")]
    UnknownReturnNode,

    /**
     * A node's operand list disagrees with its declared type, e.g. an
     * array constructor with more operands than elements.
     */
    #[error("node {node} disagrees with its declared type")]
    TypeMismatch {
        /**
         * The offending node's index.
         */
        node: usize,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
/**
 * Represents an error that can occur in this crate.
 */
pub enum Error {
    /**
     * One or more issues were found while validating a
     * [`Circuit`](crate::Circuit).
     */
    #[error("circuit failed validation: {0:?}")]
    IRError(Vec<IRError>),
}

/**
 * Wrapper around [`Result`](std::result::Result) with this crate's error type.
 */
pub type Result<T> = std::result::Result<T, Error>;
