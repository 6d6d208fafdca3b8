use serde::{Deserialize, Serialize};
use umbra_circuit::Type;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/**
 * The call signature of a package's entry function: its name, how it
 * returns, and its parameters in declaration order.
 *
 * The order of [`params`](Self::params) must match the order of the entry
 * circuit's parameter nodes; the runtime rejects the pair otherwise.
 */
pub struct CircuitMetadata {
    /**
     * The name of the entry function inside the package.
     */
    pub entry: String,

    /**
     * How the function returns its primary value.
     */
    pub return_type: ReturnMetadata,

    /**
     * The function's parameters in signature order.
     */
    pub params: Vec<ParameterMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/**
 * Describes the return convention of the entry function.
 */
pub struct ReturnMetadata {
    /**
     * Whether the function returns no primary value. A void function's
     * return node carries only the tuple of values written back into
     * reference parameters.
     */
    pub is_void: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/**
 * Describes one parameter of the entry function.
 */
pub struct ParameterMetadata {
    /**
     * The parameter's name. Arguments are keyed by it.
     */
    pub name: String,

    /**
     * The parameter's declared type. The caller's buffer must hold exactly
     * [`flat_bit_count`](Type::flat_bit_count) ciphertexts.
     */
    #[serde(rename = "type")]
    pub ty: Type,

    /**
     * Whether the parameter was declared const.
     */
    pub is_const: bool,

    /**
     * Whether the parameter is passed by reference.
     */
    pub is_reference: bool,
}

impl ParameterMetadata {
    /**
     * Whether the parameter receives back-writes after the call: true iff
     * it is a non-const reference.
     */
    pub fn is_output_binding(&self) -> bool {
        !self.is_const && self.is_reference
    }
}
