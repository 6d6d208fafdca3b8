#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate contains the types for building and inspecting the boolean
//! gate-circuit intermediate representation that Umbra's runtime evaluates
//! over encrypted bits.
//!
//! A [`Circuit`] is the dependency graph of one compiled function: nodes are
//! primitive boolean operations or structural/address computations, edges
//! carry operand ordering. A [`Package`] bundles one or more named circuits;
//! the runtime picks its entry circuit by the name recorded in the call
//! metadata. Circuits are immutable once loaded — construction happens
//! through the `append_*` methods or through deserialization, after which
//! [`Circuit::validate`] checks the invariants the runtime relies on.

mod error;
mod literal;
mod operation;
mod types;
mod validation;

use std::collections::BTreeMap;

use petgraph::{
    algo::is_isomorphic_matching, graph::Graph, stable_graph::StableGraph, visit::EdgeRef,
    Direction,
};
use serde::{Deserialize, Serialize};

pub use error::*;
pub use literal::*;
pub use operation::*;
pub use types::*;

pub use petgraph::stable_graph::NodeIndex;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/**
 * Contains information about a node in the circuit graph.
 */
pub struct NodeInfo {
    /**
     * The operation this node represents.
     */
    pub operation: Operation,

    /**
     * The type of the value this node produces.
     */
    pub output_type: Type,
}

impl NodeInfo {
    fn new(operation: Operation, output_type: Type) -> Self {
        Self {
            operation,
            output_type,
        }
    }

    /**
     * The slice payload `(start, width)`, if this node is a
     * [`Operation::BitSlice`].
     */
    pub fn as_bit_slice(&self) -> Option<(usize, usize)> {
        match self.operation {
            Operation::BitSlice { start, width } => Some((start, width)),
            _ => None,
        }
    }

    /**
     * The literal payload, if this node is a [`Operation::Literal`].
     */
    pub fn as_literal(&self) -> Option<Literal> {
        match self.operation {
            Operation::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /**
     * The parameter name, if this node is a [`Operation::Parameter`].
     */
    pub fn name(&self) -> Option<&str> {
        match &self.operation {
            Operation::Parameter(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/**
 * Contains information about an edge between nodes in the circuit graph.
 */
pub enum EdgeInfo {
    /**
     * The source node is operand `n` of the destination node.
     */
    Operand(usize),
}

impl EdgeInfo {
    /**
     * The operand position this edge feeds.
     */
    pub fn position(&self) -> usize {
        match self {
            EdgeInfo::Operand(position) => *position,
        }
    }
}

type CircuitGraph = StableGraph<NodeInfo, EdgeInfo>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/**
 * The dependency graph of one compiled function.
 *
 * The graph construction methods `append_*` take [`NodeIndex`] types as
 * arguments. These indices must refer to other nodes in the graph. Each
 * `append_*` method derives the new node's [`Type`] from its operands.
 */
pub struct Circuit {
    /**
     * The underlying dependency graph.
     */
    pub graph: CircuitGraph,

    params: Vec<NodeIndex>,
    return_value: Option<NodeIndex>,
}

impl PartialEq for Circuit {
    fn eq(&self, b: &Self) -> bool {
        self.params.len() == b.params.len()
            && self.return_value.is_some() == b.return_value.is_some()
            && is_isomorphic_matching(
                &Graph::from(self.graph.clone()),
                &Graph::from(b.graph.clone()),
                |n1, n2| n1 == n2,
                |e1, e2| e1 == e2,
            )
    }
}

impl Circuit {
    /**
     * Creates a new empty circuit.
     */
    pub fn new() -> Self {
        Self::default()
    }

    fn append_node(
        &mut self,
        operation: Operation,
        output_type: Type,
        operands: &[NodeIndex],
    ) -> NodeIndex {
        let new_node = self.graph.add_node(NodeInfo::new(operation, output_type));

        for (position, operand) in operands.iter().enumerate() {
            self.graph
                .add_edge(*operand, new_node, EdgeInfo::Operand(position));
        }

        new_node
    }

    /**
     * Appends a parameter with the given name and type and records it in
     * the function signature.
     */
    pub fn append_parameter(&mut self, name: &str, ty: Type) -> NodeIndex {
        let id = self.append_node(Operation::Parameter(name.to_owned()), ty, &[]);
        self.params.push(id);

        id
    }

    /**
     * Appends a literal of the given type.
     */
    pub fn append_literal(&mut self, value: Literal, ty: Type) -> NodeIndex {
        self.append_node(Operation::Literal(value), ty, &[])
    }

    /**
     * Appends a slice of `width` bits of `source` starting at bit `start`.
     */
    pub fn append_bit_slice(&mut self, source: NodeIndex, start: usize, width: usize) -> NodeIndex {
        self.append_node(
            Operation::BitSlice { start, width },
            Type::Bits(width),
            &[source],
        )
    }

    /**
     * Appends a logical shift right of `value` by `amount` places.
     */
    pub fn append_shift_right(&mut self, value: NodeIndex, amount: NodeIndex) -> NodeIndex {
        let ty = self.output_type(value).clone();

        self.append_node(Operation::ShiftRightLogical, ty, &[value, amount])
    }

    /**
     * Appends a big-endian concatenation of the given operands.
     */
    pub fn append_concat(&mut self, operands: &[NodeIndex]) -> NodeIndex {
        let width = operands
            .iter()
            .map(|operand| self.output_type(*operand).flat_bit_count())
            .sum();

        self.append_node(Operation::Concat, Type::Bits(width), operands)
    }

    /**
     * Appends an element read of `array` at the given index nodes, one per
     * dimension.
     */
    pub fn append_array_index(&mut self, array: NodeIndex, indices: &[NodeIndex]) -> NodeIndex {
        let mut element_type = self.output_type(array).clone();
        for _ in indices {
            element_type = match element_type {
                Type::Array { element, .. } => *element,
                _ => panic!("Fatal error: array index into a non-array node"),
            };
        }

        let mut operands = vec![array];
        operands.extend_from_slice(indices);

        self.append_node(Operation::ArrayIndex, element_type, &operands)
    }

    /**
     * Appends a read of field `index` of the tuple node `tuple`.
     */
    pub fn append_tuple_index(&mut self, tuple: NodeIndex, index: usize) -> NodeIndex {
        let field_type = match self.output_type(tuple) {
            Type::Tuple(fields) => fields
                .get(index)
                .expect("Fatal error: tuple index out of range")
                .clone(),
            _ => panic!("Fatal error: tuple index into a non-tuple node"),
        };

        self.append_node(Operation::TupleIndex(index), field_type, &[tuple])
    }

    /**
     * Appends an array built from the given element nodes. The element type
     * is taken from the first element.
     */
    pub fn append_array(&mut self, elements: &[NodeIndex]) -> NodeIndex {
        let element_type = elements
            .first()
            .map(|first| self.output_type(*first).clone())
            .expect("Fatal error: arrays must have at least one element");

        self.append_node(
            Operation::Array,
            Type::Array {
                element: Box::new(element_type),
                size: elements.len(),
            },
            elements,
        )
    }

    /**
     * Appends a tuple built from the given field nodes.
     */
    pub fn append_tuple(&mut self, fields: &[NodeIndex]) -> NodeIndex {
        let field_types = fields
            .iter()
            .map(|field| self.output_type(*field).clone())
            .collect();

        self.append_node(Operation::Tuple, Type::Tuple(field_types), fields)
    }

    /**
     * Appends an AND gate over the operands `x` and `y`.
     */
    pub fn append_and(&mut self, x: NodeIndex, y: NodeIndex) -> NodeIndex {
        self.append_node(Operation::And, Type::Bits(1), &[x, y])
    }

    /**
     * Appends an OR gate over the operands `x` and `y`.
     */
    pub fn append_or(&mut self, x: NodeIndex, y: NodeIndex) -> NodeIndex {
        self.append_node(Operation::Or, Type::Bits(1), &[x, y])
    }

    /**
     * Appends a NOT gate over the operand `x`.
     */
    pub fn append_not(&mut self, x: NodeIndex) -> NodeIndex {
        self.append_node(Operation::Not, Type::Bits(1), &[x])
    }

    /**
     * Designates `node` as the function's return value.
     */
    pub fn set_return_value(&mut self, node: NodeIndex) {
        self.return_value = Some(node);
    }

    /**
     * Returns the [`NodeInfo`] for the graph node with the given index.
     */
    pub fn node(&self, id: NodeIndex) -> &NodeInfo {
        &self.graph[id]
    }

    /**
     * Returns the type of the value the node with the given index produces.
     */
    pub fn output_type(&self, id: NodeIndex) -> &Type {
        &self.graph[id].output_type
    }

    /**
     * Returns the node's operands in position order.
     */
    pub fn operands(&self, id: NodeIndex) -> Vec<NodeIndex> {
        let mut operands: Vec<(usize, NodeIndex)> = self
            .graph
            .edges_directed(id, Direction::Incoming)
            .map(|edge| (edge.weight().position(), edge.source()))
            .collect();
        operands.sort_unstable_by_key(|(position, _)| *position);

        operands.into_iter().map(|(_, source)| source).collect()
    }

    /**
     * Returns the node's operand at the given position, if present.
     */
    pub fn operand(&self, id: NodeIndex, position: usize) -> Option<NodeIndex> {
        self.graph
            .edges_directed(id, Direction::Incoming)
            .find(|edge| edge.weight().position() == position)
            .map(|edge| edge.source())
    }

    /**
     * Returns the nodes that consume the given node's value.
     */
    pub fn users(&self, id: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(id, Direction::Outgoing)
    }

    /**
     * The function's parameter nodes in signature order.
     */
    pub fn params(&self) -> &[NodeIndex] {
        &self.params
    }

    /**
     * The function's designated return node, if one was set.
     */
    pub fn return_value(&self) -> Option<NodeIndex> {
        self.return_value
    }

    /**
     * The number of nodes in the graph.
     */
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /**
     * Iterates over every node index in the graph.
     */
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /**
     * Validates this [`Circuit`] for correctness.
     */
    pub fn validate(&self) -> Result<()> {
        let errors = validation::validate_ir(self);

        if !errors.is_empty() {
            return Err(Error::IRError(errors));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
/**
 * A named collection of compiled functions. The runtime selects its entry
 * function by the name carried in the call metadata.
 */
pub struct Package {
    functions: BTreeMap<String, Circuit>,
}

impl Package {
    /**
     * Creates an empty package.
     */
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * Adds `circuit` to the package under the given function name,
     * replacing any previous circuit of that name.
     */
    pub fn insert_function(&mut self, name: &str, circuit: Circuit) {
        self.functions.insert(name.to_owned(), circuit);
    }

    /**
     * Looks up a function by name.
     */
    pub fn function(&self, name: &str) -> Option<&Circuit> {
        self.functions.get(name)
    }

    /**
     * Iterates over the package's functions in name order.
     */
    pub fn functions(&self) -> impl Iterator<Item = (&str, &Circuit)> {
        self.functions
            .iter()
            .map(|(name, circuit)| (name.as_str(), circuit))
    }

    /**
     * Validates every function in the package.
     */
    pub fn validate(&self) -> Result<()> {
        for (_, circuit) in self.functions.iter() {
            circuit.validate()?;
        }

        Ok(())
    }
}
