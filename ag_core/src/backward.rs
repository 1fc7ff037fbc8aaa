//! Gradient passes over the graph.
//!
//! Both passes start from adjacency lists rebuilt from the edge list:
//!
//! - [`Graph::zero_grad`] walks the root's whole dependency component (edges
//!   followed both ways), visiting consumers before the node itself and the
//!   node before its operands.
//! - [`Graph::backward`] only walks the root's ancestors. A postorder DFS over
//!   operand edges yields every producer before its consumers; running the
//!   rules in reverse of that order means a node's gradient is complete before
//!   it is distributed, whether or not the root has consumers of its own.
//!
//! Both walks keep an explicit stack so deep chains do not exhaust the call
//! stack.

use log::debug;

use crate::graph::{Edge, Graph, NodeId};
use crate::ops::contributions;

/// Forward (producer -> consumers) and backward (consumer -> producers)
/// neighbour lists, in edge insertion order.
#[derive(Debug)]
pub(crate) struct Adjacency {
    forward: Vec<Vec<NodeId>>,
    backward: Vec<Vec<NodeId>>,
}

impl Adjacency {
    pub(crate) fn build(node_count: usize, edges: &[Edge]) -> Self {
        let mut forward = vec![Vec::new(); node_count];
        let mut backward = vec![Vec::new(); node_count];
        for edge in edges {
            forward[edge.from.index()].push(edge.to);
            backward[edge.to.index()].push(edge.from);
        }
        Adjacency { forward, backward }
    }

    fn len(&self) -> usize {
        self.forward.len()
    }
}

/// Visit every node weakly connected to `root` exactly once.
///
/// For each node: mark it, descend into unvisited consumers, call `on_visit`,
/// then descend into unvisited operands.
fn walk_component(adj: &Adjacency, root: NodeId, mut on_visit: impl FnMut(NodeId)) {
    // `next` counts through the consumers, then one step for the callback,
    // then the operands.
    struct Frame {
        id: NodeId,
        next: usize,
    }

    let mut visited = vec![false; adj.len()];
    visited[root.index()] = true;
    let mut stack = vec![Frame { id: root, next: 0 }];

    while let Some(frame) = stack.last_mut() {
        let id = frame.id;
        let consumers = &adj.forward[id.index()];
        let operands = &adj.backward[id.index()];

        let child = if frame.next < consumers.len() {
            Some(consumers[frame.next])
        } else if frame.next == consumers.len() {
            on_visit(id);
            None
        } else {
            operands.get(frame.next - consumers.len() - 1).copied()
        };

        match child {
            Some(child) => {
                frame.next += 1;
                if !visited[child.index()] {
                    visited[child.index()] = true;
                    stack.push(Frame { id: child, next: 0 });
                }
            }
            None if frame.next == consumers.len() => frame.next += 1,
            None => {
                stack.pop();
            }
        }
    }
}

/// Ancestors of `root` (including `root`) with every operand ahead of the
/// nodes that consume it.
fn ancestors_postorder(adj: &Adjacency, root: NodeId) -> Vec<NodeId> {
    let mut visited = vec![false; adj.len()];
    visited[root.index()] = true;
    let mut order = Vec::new();
    let mut stack = vec![(root, 0usize)];

    while let Some((id, next)) = stack.last_mut() {
        let operands = &adj.backward[id.index()];
        if let Some(&child) = operands.get(*next) {
            *next += 1;
            if !visited[child.index()] {
                visited[child.index()] = true;
                stack.push((child, 0));
            }
        } else {
            order.push(*id);
            stack.pop();
        }
    }

    order
}

impl Graph {
    fn adjacency(&self) -> Adjacency {
        Adjacency::build(self.len(), &self.edges())
    }

    /// Call `on_visit` once for every node in `root`'s dependency component.
    ///
    /// Order: consumers are exhausted before a node is visited, and the node
    /// is visited before its operands. Siblings follow edge insertion order.
    /// The graph is not borrowed while `on_visit` runs.
    pub fn visit_component(&self, root: NodeId, on_visit: impl FnMut(NodeId)) {
        self.assert_contains(root);
        let adj = self.adjacency();
        walk_component(&adj, root, on_visit);
    }

    /// Ids of `root` and everything it was computed from, operands first.
    pub fn topological_order(&self, root: NodeId) -> Vec<NodeId> {
        self.assert_contains(root);
        ancestors_postorder(&self.adjacency(), root)
    }

    /// Set `grad` to 0 on every node of `root`'s dependency component.
    pub fn zero_grad(&self, root: NodeId) {
        self.assert_contains(root);
        let adj = self.adjacency();
        let mut nodes = self.nodes_mut();
        let mut visited = 0usize;
        walk_component(&adj, root, |id| {
            nodes[id.index()].grad = 0.0;
            visited += 1;
        });
        debug!("zero_grad from node {root}: reset {visited} nodes");
    }

    /// Seed `root.grad = 1` and run each ancestor's rule exactly once,
    /// consumers before producers.
    ///
    /// Gradients of other nodes are accumulated into, not overwritten: call
    /// [`Graph::zero_grad`] first for a fresh pass.
    pub fn backward(&self, root: NodeId) {
        let order = self.topological_order(root);
        let mut nodes = self.nodes_mut();
        nodes[root.index()].grad = 1.0;

        for &id in order.iter().rev() {
            let Some(contribs) = contributions(nodes[id.index()], &nodes) else {
                continue;
            };
            for (operand, delta) in contribs {
                nodes[operand.index()].grad += delta;
            }
        }
        debug!("backward from node {root}: visited {} nodes", order.len());
    }
}
