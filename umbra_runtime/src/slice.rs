use umbra_circuit::{Circuit, NodeIndex, Type};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
/**
 * Where a bit slice reads from, resolved against the caller's argument
 * buffers.
 */
pub(crate) enum SliceTarget {
    /**
     * Flat bit `index` of the argument buffer named `param`.
     */
    Bit {
        /**
         * The parameter the slice's chain is rooted at.
         */
        param: String,

        /**
         * The flat bit offset inside that parameter's buffer.
         */
        index: usize,
    },

    /**
     * The slice shifted one past the source width. There is no bit to
     * read; the slice's value stays structural.
     */
    OverflowShift,
}

/**
 * Reduces a bit-slice node to the parameter name and flat bit offset its
 * single bit lives at.
 *
 * The slice's operand chain is walked toward its parameter root. An array
 * index contributes `element_bits x literal_index`; every other chain step
 * stands for a one-bit logical shift and contributes one. Only array
 * indices, other bit slices, shifts, tuple indices, and parameters may
 * appear along the way.
 */
pub(crate) fn resolve_bit_slice(circuit: &Circuit, slice: NodeIndex) -> Result<SliceTarget> {
    let (start, _width) = circuit
        .node(slice)
        .as_bit_slice()
        .ok_or_else(|| internal("resolve_bit_slice called on a non-slice node"))?;

    let mut node = operand0(circuit, slice)?;
    let mut slice_idx;

    if circuit.node(node).operation.is_array_index() {
        // The slice lands at the indexed element's bit offset inside the
        // flattened array, plus the slice's own start.
        let array = operand0(circuit, node)?;
        let element_bits = match circuit.output_type(array) {
            Type::Array { element, .. } => element.flat_bit_count(),
            _ => return Err(internal("array index into a non-array value")),
        };

        let operands = circuit.operands(node);
        let indices = &operands[1..];
        if indices.len() != 1 {
            return Err(Error::UnsupportedIndex(
                "only single-dimensional arrays/array indices are supported".to_owned(),
            ));
        }
        let literal = circuit.node(indices[0]).as_literal().ok_or_else(|| {
            Error::UnsupportedIndex("only literal indexes into arrays are supported".to_owned())
        })?;

        slice_idx = element_bits * literal.as_u64() as usize + start;

        while !circuit.node(node).operation.is_parameter() {
            node = operand0(circuit, node)?;
            check_chain_link(circuit, node)?;
        }
    } else if is_chain_terminal(circuit, node) {
        slice_idx = start;
    } else {
        // A shift chain: every step toward the root moves the read one bit
        // up.
        slice_idx = 0;
        while !is_chain_terminal(circuit, node) {
            slice_idx += 1;
            node = operand0(circuit, node)?;
            check_chain_link(circuit, node)?;
        }
    }

    // A shift one past the source width reads nothing.
    if circuit.output_type(node).flat_bit_count() == slice_idx {
        return Ok(SliceTarget::OverflowShift);
    }

    let info = circuit.node(node);
    let param = if info.operation.is_tuple_index() || info.operation.is_array_index() {
        let root = operand0(circuit, node)?;
        circuit.node(root).name().map(str::to_owned)
    } else {
        info.name().map(str::to_owned)
    };

    match param {
        Some(param) => Ok(SliceTarget::Bit {
            param,
            index: slice_idx,
        }),
        None => Err(internal("bit-slice chain did not end at a named parameter")),
    }
}

fn is_chain_terminal(circuit: &Circuit, node: NodeIndex) -> bool {
    let operation = &circuit.node(node).operation;

    operation.is_parameter() || operation.is_tuple_index()
}

fn check_chain_link(circuit: &Circuit, node: NodeIndex) -> Result<()> {
    let operation = &circuit.node(node).operation;

    if operation.is_array_index()
        || operation.is_bit_slice()
        || operation.is_parameter()
        || operation.is_tuple_index()
    {
        Ok(())
    } else {
        Err(internal(format!(
            "node {} may not appear in a bit-slice chain",
            node.index()
        )))
    }
}

fn operand0(circuit: &Circuit, node: NodeIndex) -> Result<NodeIndex> {
    circuit
        .operand(node, 0)
        .ok_or_else(|| internal(format!("node {} has no operand to chain through", node.index())))
}

fn internal(msg: impl Into<String>) -> Error {
    Error::InternalInconsistency(msg.into())
}
