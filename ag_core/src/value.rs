//! Handles to graph nodes.

use std::fmt;

use crate::graph::{Graph, NodeId, Operation};

/// A node of a [`Graph`], seen from the outside.
///
/// `Value` is a copyable pair of graph reference and [`NodeId`]. It borrows the
/// graph, so it can never outlive it. Combining values with `+` and `*`
/// appends new nodes to the same graph.
#[derive(Clone, Copy)]
pub struct Value<'g> {
    pub(crate) graph: &'g Graph,
    pub(crate) id: NodeId,
}

impl Graph {
    /// Create a leaf and return a handle to it.
    pub fn value(&self, value: f64) -> Value<'_> {
        let id = self.create_leaf(value);
        Value { graph: self, id }
    }

    /// Handle to an existing node.
    ///
    /// # Panics
    ///
    /// If `id` was not created by this graph.
    pub fn handle(&self, id: NodeId) -> Value<'_> {
        self.assert_contains(id);
        Value { graph: self, id }
    }
}

impl<'g> Value<'g> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The graph this value belongs to.
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// The scalar computed when the node was created.
    pub fn value(&self) -> f64 {
        self.graph.node(self.id).value()
    }

    /// The gradient accumulated by the last backward pass.
    pub fn grad(&self) -> f64 {
        self.graph.node(self.id).grad()
    }

    pub fn operation(&self) -> Operation {
        self.graph.node(self.id).operation()
    }

    /// Reset the gradient of every node connected to this one.
    pub fn zero_grad(&self) {
        self.graph.zero_grad(self.id);
    }

    /// Seed this node's gradient with 1 and propagate it to every node it was
    /// computed from.
    pub fn backward(&self) {
        self.graph.backward(self.id);
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.graph.node(self.id);
        f.debug_struct("Value")
            .field("id", &node.id())
            .field("op", &node.operation())
            .field("value", &node.value())
            .field("grad", &node.grad())
            .finish()
    }
}
