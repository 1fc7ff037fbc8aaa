//! Append-only storage for the computation graph.
//!
//! Every node lives in a single `Vec` owned by the [`Graph`] and is addressed by
//! its [`NodeId`], which is simply its index in that `Vec`. Nodes and edges are
//! never removed or reordered, so an id handed out once stays valid for as long
//! as the graph exists.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;

use log::trace;

/// Identifier of a node inside its owning [`Graph`].
///
/// Ids are dense and assigned in creation order starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Position of the node in the graph's node list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The operation that produced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Created directly from a scalar; has no operands.
    Leaf,
    /// `lhs + rhs`
    Sum,
    /// `lhs * rhs`
    Product,
}

impl Operation {
    /// Short symbol used in graph dumps.
    pub fn symbol(self) -> &'static str {
        match self {
            Operation::Leaf => "?",
            Operation::Sum => "+",
            Operation::Product => "*",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Leaf => "leaf",
            Operation::Sum => "sum",
            Operation::Product => "product",
        };
        f.pad(name)
    }
}

/// Gradient-distribution rule bound to a node when it is created.
///
/// The rule only carries operand ids; the arithmetic lives in
/// [`crate::ops`] and is selected by the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradFn {
    /// Nothing to distribute.
    Leaf,
    /// Passes the node's gradient through unchanged to both operands.
    Sum { lhs: NodeId, rhs: NodeId },
    /// Scales the node's gradient by the other operand's value.
    Product { lhs: NodeId, rhs: NodeId },
}

impl GradFn {
    /// The operation tag this rule belongs to.
    pub fn operation(&self) -> Operation {
        match self {
            GradFn::Leaf => Operation::Leaf,
            GradFn::Sum { .. } => Operation::Sum,
            GradFn::Product { .. } => Operation::Product,
        }
    }

    /// `(lhs, rhs)` for binary rules, `None` for leaves.
    pub fn operands(&self) -> Option<(NodeId, NodeId)> {
        match *self {
            GradFn::Leaf => None,
            GradFn::Sum { lhs, rhs } | GradFn::Product { lhs, rhs } => Some((lhs, rhs)),
        }
    }
}

/// One scalar quantity in the computation.
///
/// `value` and `grad_fn` are fixed at creation. `grad` is the only field that
/// changes afterwards, and only during [`Graph::zero_grad`] and
/// [`Graph::backward`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) value: f64,
    pub(crate) grad_fn: GradFn,
    pub(crate) grad: f64,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn grad(&self) -> f64 {
        self.grad
    }

    pub fn operation(&self) -> Operation {
        self.grad_fn.operation()
    }

    pub fn grad_fn(&self) -> GradFn {
        self.grad_fn
    }
}

/// Directed producer -> consumer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

/// Owner of every node and edge of one computation.
///
/// The graph is single-threaded: it hands out ids and [`crate::Value`] handles
/// through `&self` and keeps its storage behind `RefCell`s. Views returned by
/// [`Graph::nodes`] and [`Graph::edges`] must be dropped before the graph is
/// extended or a gradient pass is run; [`Graph::node_snapshot`] and
/// [`Graph::edge_snapshot`] have no such restriction.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: RefCell<Vec<Node>>,
    edges: RefCell<Vec<Edge>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a leaf holding `value`. Records no edges.
    pub fn create_leaf(&self, value: f64) -> NodeId {
        self.push(value, GradFn::Leaf)
    }

    /// Append the result of a binary operation.
    ///
    /// Records `lhs -> new` and `rhs -> new` and binds `grad_fn` as the node's
    /// rule.
    ///
    /// # Panics
    ///
    /// If `grad_fn` is [`GradFn::Leaf`] or refers to an id this graph never
    /// created.
    pub fn create_binary(&self, value: f64, grad_fn: GradFn) -> NodeId {
        let Some((lhs, rhs)) = grad_fn.operands() else {
            panic!("create_binary needs a binary rule, got {grad_fn:?}");
        };
        self.assert_contains(lhs);
        self.assert_contains(rhs);

        let id = self.push(value, grad_fn);
        let mut edges = self.edges.borrow_mut();
        edges.push(Edge { from: lhs, to: id });
        edges.push(Edge { from: rhs, to: id });
        id
    }

    fn push(&self, value: f64, grad_fn: GradFn) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        assert!(nodes.len() < u32::MAX as usize, "graph node limit reached");
        let id = NodeId(nodes.len() as u32);
        nodes.push(Node {
            id,
            value,
            grad_fn,
            grad: 0.0,
        });
        trace!("node {id}: {} = {value}", grad_fn.operation());
        id
    }

    /// Number of nodes created so far.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Read-only view of all nodes, indexed by id.
    ///
    /// # Panics
    ///
    /// Creating a node or running [`Graph::zero_grad`] / [`Graph::backward`]
    /// while the returned view is alive panics. Use [`Graph::node_snapshot`]
    /// to iterate while extending the graph.
    pub fn nodes(&self) -> Ref<'_, [Node]> {
        Ref::map(self.nodes.borrow(), Vec::as_slice)
    }

    /// Read-only view of all edges in insertion order.
    ///
    /// # Panics
    ///
    /// Creating a binary node while the returned view is alive panics. Use
    /// [`Graph::edge_snapshot`] to iterate while extending the graph.
    pub fn edges(&self) -> Ref<'_, [Edge]> {
        Ref::map(self.edges.borrow(), Vec::as_slice)
    }

    /// Owned copy of all nodes as they are now.
    pub fn node_snapshot(&self) -> Vec<Node> {
        self.nodes.borrow().clone()
    }

    /// Owned copy of all edges as they are now.
    pub fn edge_snapshot(&self) -> Vec<Edge> {
        self.edges.borrow().clone()
    }

    /// Snapshot of a node.
    ///
    /// # Panics
    ///
    /// If `id` was not created by this graph.
    pub fn node(&self, id: NodeId) -> Node {
        self.assert_contains(id);
        self.nodes.borrow()[id.index()]
    }

    /// Snapshot of a node, or `None` if the id is out of range.
    pub fn get(&self, id: NodeId) -> Option<Node> {
        self.nodes.borrow().get(id.index()).copied()
    }

    pub(crate) fn nodes_mut(&self) -> RefMut<'_, Vec<Node>> {
        self.nodes.borrow_mut()
    }

    pub(crate) fn assert_contains(&self, id: NodeId) {
        let len = self.len();
        assert!(
            id.index() < len,
            "node {id} does not belong to this graph ({len} nodes)"
        );
    }
}
