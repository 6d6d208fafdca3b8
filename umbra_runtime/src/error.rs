use thiserror::Error;

#[derive(Debug, Error)]
/**
 * Represents an error that can occur in this crate.
 */
pub enum Error {
    /**
     * A file constructor could not read one of its inputs.
     */
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /**
     * The circuit package could not be parsed or failed validation.
     */
    #[error("invalid circuit: {0}")]
    InvalidIR(String),

    /**
     * The call metadata disagrees with the circuit or with the supplied
     * arguments.
     */
    #[error("metadata mismatch: {0}")]
    MetadataMismatch(String),

    /**
     * An array index the runtime cannot evaluate: non-literal, or into a
     * multi-dimensional array.
     */
    #[error("unsupported array index: {0}")]
    UnsupportedIndex(String),

    /**
     * A result buffer was supplied for a void-returning function.
     */
    #[error("a result buffer was supplied for a void-returning function")]
    VoidWithResult,

    /**
     * No result buffer was supplied for a value-returning function.
     */
    #[error("no result buffer was supplied for a value-returning function")]
    MissingResult,

    /**
     * The return value carries more back-writes than there are writable
     * reference parameters to receive them.
     */
    #[error("no matching output parameter: {0}")]
    OutputParamMismatch(String),

    /**
     * A structural invariant did not hold during evaluation. This means a
     * bug in the runtime or a circuit that bypassed validation.
     */
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
}

impl From<umbra_circuit::Error> for Error {
    fn from(err: umbra_circuit::Error) -> Self {
        Self::InvalidIR(err.to_string())
    }
}

/**
 * Wrapper around [`Result`](std::result::Result) with this crate's error type.
 */
pub type Result<T> = std::result::Result<T, Error>;
