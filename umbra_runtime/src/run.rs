use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crossbeam::channel;
use scoped_threadpool::Pool;
use umbra_circuit::{Circuit, NodeIndex, Operation, Type};

use crate::slice::{resolve_bit_slice, SliceTarget};
use crate::{BooleanEvaluator, CircuitMetadata, Error, Result};

/**
 * The node-id to ciphertext table a run accumulates. Structural nodes hold
 * `None`; gate-producing nodes hold exactly one ciphertext each.
 */
pub(crate) type ValueTable<C> = HashMap<NodeIndex, Option<Arc<C>>>;

/// A node whose operands are all available, ready for a worker.
struct ReadyNode<C> {
    node: NodeIndex,
    operands: Vec<Option<Arc<C>>>,
}

/// One worker's verdict on one node.
struct EvaluatedNode<C> {
    node: NodeIndex,
    value: Result<Option<C>>,
}

/**
 * Evaluates a single node, producing a fresh ciphertext for gates and
 * copied input bits, or `None` for structural nodes.
 */
pub(crate) fn evaluate_node<E: BooleanEvaluator>(
    circuit: &Circuit,
    node: NodeIndex,
    operands: &[Option<Arc<E::Ciphertext>>],
    args: &HashMap<&str, &[E::Ciphertext]>,
    evaluator: &E,
) -> Result<Option<E::Ciphertext>> {
    let info = circuit.node(node);

    match &info.operation {
        // Structural nodes carry no bits of their own; slices read through
        // them toward the argument buffers.
        Operation::Array
        | Operation::ArrayIndex
        | Operation::Concat
        | Operation::Parameter(_)
        | Operation::ShiftRightLogical
        | Operation::Tuple
        | Operation::TupleIndex(_) => Ok(None),

        Operation::BitSlice { .. } => match resolve_bit_slice(circuit, node)? {
            SliceTarget::OverflowShift => Ok(None),
            SliceTarget::Bit { param, index } => {
                let buffer = args.get(param.as_str()).ok_or_else(|| {
                    Error::InternalInconsistency(format!("no argument buffer named `{param}`"))
                })?;
                let src = buffer.get(index).ok_or_else(|| {
                    Error::InternalInconsistency(format!(
                        "bit {index} is out of range for argument `{param}`"
                    ))
                })?;

                let mut out = evaluator.new_ciphertext();
                evaluator.copy(&mut out, src);
                Ok(Some(out))
            }
        },

        Operation::Literal(literal) => match info.output_type {
            Type::Bits(1) => {
                let mut out = evaluator.new_ciphertext();
                evaluator.constant(&mut out, !literal.is_zero());
                Ok(Some(out))
            }
            _ => {
                // Wider literals exist only to index into arrays.
                for user in circuit.users(node) {
                    if !circuit.node(user).operation.is_array_index() {
                        return Err(Error::InvalidIR(format!(
                            "literal node {} is wider than one bit and feeds a non-index node",
                            node.index()
                        )));
                    }
                }
                Ok(None)
            }
        },

        Operation::And => {
            let (a, b) = ready_pair(node, operands)?;
            let mut out = evaluator.new_ciphertext();
            evaluator.and(&mut out, a, b);
            Ok(Some(out))
        }
        Operation::Or => {
            let (a, b) = ready_pair(node, operands)?;
            let mut out = evaluator.new_ciphertext();
            evaluator.or(&mut out, a, b);
            Ok(Some(out))
        }
        Operation::Not => {
            let a = ready_single(node, operands)?;
            let mut out = evaluator.new_ciphertext();
            evaluator.not(&mut out, a);
            Ok(Some(out))
        }
    }
}

fn ready_pair<'a, C>(node: NodeIndex, operands: &'a [Option<Arc<C>>]) -> Result<(&'a C, &'a C)> {
    match operands {
        [Some(a), Some(b)] => Ok((a.as_ref(), b.as_ref())),
        _ => Err(Error::InternalInconsistency(format!(
            "gate node {} expects two evaluated operands",
            node.index()
        ))),
    }
}

fn ready_single<'a, C>(node: NodeIndex, operands: &'a [Option<Arc<C>>]) -> Result<&'a C> {
    match operands {
        [Some(a)] => Ok(a.as_ref()),
        _ => Err(Error::InternalInconsistency(format!(
            "gate node {} expects one evaluated operand",
            node.index()
        ))),
    }
}

/**
 * Runs the circuit to completion over the given argument buffers and
 * returns the filled value table along with the number of scheduler rounds
 * it took.
 *
 * Each round gathers every unevaluated node whose operands are present in
 * the value table, feeds them to the worker pool, then waits for exactly
 * that many completions before harvesting. The coordinator is the only
 * writer of the value table, so a node's value is visible before any
 * dependent is scheduled.
 */
pub(crate) fn run_circuit<E: BooleanEvaluator>(
    pool: &mut Pool,
    circuit: &Circuit,
    args: &HashMap<&str, &[E::Ciphertext]>,
    evaluator: &E,
) -> Result<(ValueTable<E::Ciphertext>, usize)> {
    let operand_lists: HashMap<NodeIndex, Vec<NodeIndex>> = circuit
        .node_indices()
        .map(|id| (id, circuit.operands(id)))
        .collect();

    let mut unevaluated: HashSet<NodeIndex> = circuit.node_indices().collect();
    let mut values: ValueTable<E::Ciphertext> = HashMap::with_capacity(unevaluated.len());

    let workers = pool.thread_count() as usize;

    pool.scoped(|scope| {
        // Both channels live inside the scope so every exit path closes
        // them and lets the workers drain and join.
        let (ready_tx, ready_rx) = channel::unbounded::<ReadyNode<E::Ciphertext>>();
        let (done_tx, done_rx) = channel::unbounded::<EvaluatedNode<E::Ciphertext>>();

        for _ in 0..workers {
            let ready_rx = ready_rx.clone();
            let done_tx = done_tx.clone();

            scope.execute(move || {
                // Workers run until the coordinator closes the ready channel.
                while let Ok(work) = ready_rx.recv() {
                    let value = evaluate_node(circuit, work.node, &work.operands, args, evaluator);

                    if done_tx
                        .send(EvaluatedNode {
                            node: work.node,
                            value,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }
        drop(done_tx);

        let mut rounds = 0;

        while !unevaluated.is_empty() {
            debug_assert!(ready_rx.is_empty() && done_rx.is_empty());

            let mut scheduled = 0;
            for &node in &unevaluated {
                let operand_ids = &operand_lists[&node];
                if !operand_ids.iter().all(|id| values.contains_key(id)) {
                    continue;
                }

                let operands = operand_ids.iter().map(|id| values[id].clone()).collect();
                ready_tx
                    .send(ReadyNode { node, operands })
                    .map_err(|_| worker_pool_gone())?;
                scheduled += 1;
            }

            if scheduled == 0 {
                return Err(Error::InternalInconsistency(
                    "no node became ready; the circuit is cyclic or references values that \
                     were never produced"
                        .to_owned(),
                ));
            }

            // The round's barrier: exactly one completion per scheduled
            // node.
            let mut first_error = None;
            for _ in 0..scheduled {
                let done = done_rx.recv().map_err(|_| worker_pool_gone())?;

                match done.value {
                    Ok(value) => {
                        if values.insert(done.node, value.map(Arc::new)).is_some() {
                            first_error.get_or_insert(Error::InternalInconsistency(format!(
                                "node {} was evaluated twice",
                                done.node.index()
                            )));
                        }
                        unevaluated.remove(&done.node);
                    }
                    Err(err) => {
                        first_error.get_or_insert(err);
                    }
                }
            }

            if let Some(err) = first_error {
                return Err(err);
            }

            rounds += 1;
            log::trace!(
                "round {rounds}: evaluated {scheduled} nodes, {} remaining",
                unevaluated.len()
            );
        }

        Ok(rounds)
    })
    .map(|rounds| (values, rounds))
}

fn worker_pool_gone() -> Error {
    Error::InternalInconsistency("the worker pool disconnected mid-run".to_owned())
}

/**
 * Copies the encrypted bits of `node`'s value tree into `output`, starting
 * at `offset`.
 *
 * Bit vectors are stored big-endian in the graph but little-endian in host
 * buffers, so multi-bit values place operand `i` at
 * `offset + width - i - 1`. Arrays and tuples lay their members out in
 * order.
 */
pub(crate) fn collect_node_value<E: BooleanEvaluator>(
    circuit: &Circuit,
    node: NodeIndex,
    output: &mut [E::Ciphertext],
    offset: usize,
    values: &ValueTable<E::Ciphertext>,
    evaluator: &E,
) -> Result<()> {
    match circuit.output_type(node) {
        Type::Bits(width) => {
            if *width == 1 {
                // Concats contribute no bits of their own; the value lives
                // below them.
                let mut node = node;
                while circuit.node(node).operation.is_concat() {
                    node = collect_operand(circuit, node, 0)?;
                }

                let value = values.get(&node).ok_or_else(|| {
                    Error::InternalInconsistency(format!(
                        "no value was recorded for node {}",
                        node.index()
                    ))
                })?;
                let src = value.as_deref().ok_or_else(|| {
                    Error::InternalInconsistency(format!(
                        "output node {} holds no ciphertext",
                        node.index()
                    ))
                })?;
                let dst = output.get_mut(offset).ok_or_else(|| {
                    Error::InternalInconsistency(format!(
                        "output bit {offset} is out of range"
                    ))
                })?;

                evaluator.copy(dst, src);
            } else {
                for i in 0..*width {
                    let operand = collect_operand(circuit, node, i)?;
                    collect_node_value(
                        circuit,
                        operand,
                        output,
                        offset + (*width - i - 1),
                        values,
                        evaluator,
                    )?;
                }
            }
        }
        Type::Array { element, size } => {
            let stride = element.flat_bit_count();
            for i in 0..*size {
                let operand = collect_operand(circuit, node, i)?;
                collect_node_value(circuit, operand, output, offset + i * stride, values, evaluator)?;
            }
        }
        Type::Tuple(fields) => {
            let mut sub_offset = 0;
            for i in 0..fields.len() {
                let operand = collect_operand(circuit, node, i)?;
                collect_node_value(circuit, operand, output, offset + sub_offset, values, evaluator)?;
                sub_offset += circuit.output_type(operand).flat_bit_count();
            }
        }
    }

    Ok(())
}

fn collect_operand(circuit: &Circuit, node: NodeIndex, position: usize) -> Result<NodeIndex> {
    circuit.operand(node, position).ok_or_else(|| {
        Error::InternalInconsistency(format!(
            "output node {} has no operand {position}",
            node.index()
        ))
    })
}

/**
 * Places the return value into the caller's buffers: the primary return
 * (if any) into `result`, then each trailing element of the return tuple
 * into the next output-binding parameter's argument buffer.
 */
pub(crate) fn collect_outputs<E: BooleanEvaluator>(
    circuit: &Circuit,
    metadata: &CircuitMetadata,
    result: Option<&mut [E::Ciphertext]>,
    args: &mut HashMap<&str, &mut [E::Ciphertext]>,
    values: &ValueTable<E::Ciphertext>,
    evaluator: &E,
) -> Result<()> {
    let return_value = circuit
        .return_value()
        .ok_or_else(|| Error::InvalidIR("the entry function has no return value".to_owned()))?;

    let elements: Vec<NodeIndex> = match circuit.output_type(return_value) {
        Type::Tuple(_) => circuit.operands(return_value),
        _ => vec![return_value],
    };

    if elements.is_empty() {
        return Ok(());
    }

    let mut output_idx = 0;
    if metadata.return_type.is_void {
        if result.is_some() {
            return Err(Error::VoidWithResult);
        }
    } else {
        let result = result.ok_or(Error::MissingResult)?;
        collect_node_value(circuit, elements[output_idx], result, 0, values, evaluator)?;
        output_idx += 1;
    }

    let mut param_idx = 0;
    while output_idx < elements.len() {
        let param = loop {
            let Some(param) = metadata.params.get(param_idx) else {
                return Err(Error::OutputParamMismatch(format!(
                    "return element {output_idx} has no writable reference parameter left \
                     to land in"
                )));
            };
            param_idx += 1;

            if param.is_output_binding() {
                break param;
            }
        };

        let buffer = args.get_mut(param.name.as_str()).ok_or_else(|| {
            Error::InternalInconsistency(format!("no argument buffer named `{}`", param.name))
        })?;
        collect_node_value(circuit, elements[output_idx], buffer, 0, values, evaluator)?;
        output_idx += 1;
    }

    Ok(())
}
