use petgraph::{algo::toposort, stable_graph::NodeIndex, visit::EdgeRef, Direction};

use crate::{Circuit, IRError, Operation, Type};

/**
 * Checks the structural invariants the runtime relies on and returns every
 * violation found.
 */
pub fn validate_ir(ir: &Circuit) -> Vec<IRError> {
    let mut errors = vec![];

    if toposort(&ir.graph, None).is_err() {
        // The remaining checks walk operand chains and assume they terminate.
        errors.push(IRError::CyclicGraph);
        return errors;
    }

    for id in ir.graph.node_indices() {
        validate_operands(ir, id, &mut errors);
    }

    for &param in ir.params() {
        match ir.graph.node_weight(param) {
            Some(info) if info.operation.is_parameter() => {}
            _ => errors.push(IRError::NonParameterInSignature {
                node: param.index(),
            }),
        }
    }

    if let Some(return_value) = ir.return_value() {
        if ir.graph.node_weight(return_value).is_none() {
            errors.push(IRError::UnknownReturnNode);
        }
    }

    for id in ir.graph.node_indices() {
        if ir.node(id).operation.is_bit_slice() {
            validate_slice_chain(ir, id, &mut errors);
        }
    }

    errors
}

fn validate_operands(ir: &Circuit, id: NodeIndex, errors: &mut Vec<IRError>) {
    let mut positions: Vec<usize> = ir
        .graph
        .edges_directed(id, Direction::Incoming)
        .map(|edge| edge.weight().position())
        .collect();
    positions.sort_unstable();

    for (expected, position) in positions.iter().enumerate() {
        if *position != expected {
            errors.push(IRError::MissingOperand {
                node: id.index(),
                position: expected,
            });
            return;
        }
    }

    let actual = positions.len();
    let info = ir.node(id);

    let expected = match &info.operation {
        Operation::Parameter(_) | Operation::Literal(_) => Some(0),
        Operation::BitSlice { .. } | Operation::TupleIndex(_) | Operation::Not => Some(1),
        Operation::And | Operation::Or | Operation::ShiftRightLogical => Some(2),
        Operation::ArrayIndex => None,
        Operation::Concat => None,
        Operation::Array => match &info.output_type {
            Type::Array { size, .. } => Some(*size),
            _ => {
                errors.push(IRError::TypeMismatch { node: id.index() });
                return;
            }
        },
        Operation::Tuple => match &info.output_type {
            Type::Tuple(fields) => Some(fields.len()),
            _ => {
                errors.push(IRError::TypeMismatch { node: id.index() });
                return;
            }
        },
    };

    match expected {
        Some(expected) if actual != expected => errors.push(IRError::WrongOperandCount {
            node: id.index(),
            expected,
            actual,
        }),
        None => {
            // Array indices need the array plus at least one index; concats
            // need at least one operand.
            let minimum = if info.operation.is_array_index() { 2 } else { 1 };
            if actual < minimum {
                errors.push(IRError::WrongOperandCount {
                    node: id.index(),
                    expected: minimum,
                    actual,
                });
            }
        }
        _ => {}
    }

    if info.operation.is_gate() {
        if info.output_type != Type::Bits(1) {
            errors.push(IRError::NonBitGate { node: id.index() });
        } else if ir
            .operands(id)
            .iter()
            .any(|operand| *ir.output_type(*operand) != Type::Bits(1))
        {
            errors.push(IRError::NonBitGate { node: id.index() });
        }
    }
}

/**
 * Walks a bit slice's operand-0 chain toward its parameter root. Only array
 * indices, other bit slices, shifts, tuple indices, and parameters may
 * appear along the way.
 */
fn validate_slice_chain(ir: &Circuit, slice: NodeIndex, errors: &mut Vec<IRError>) {
    let Some(mut node) = ir.operand(slice, 0) else {
        // Reported as a missing operand above.
        return;
    };

    loop {
        let operation = &ir.node(node).operation;
        if operation.is_parameter() || operation.is_tuple_index() {
            return;
        }

        let whitelisted =
            operation.is_array_index() || operation.is_bit_slice() || operation.is_shift_right();
        if !whitelisted {
            errors.push(IRError::InvalidSliceChain { node: node.index() });
            return;
        }

        match ir.operand(node, 0) {
            Some(next) => node = next,
            None => return,
        }
    }
}
