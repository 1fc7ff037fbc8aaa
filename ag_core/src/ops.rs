//! Sum and product: forward values, local gradient rules, operator overloads.

use crate::graph::{GradFn, Graph, Node, NodeId};
use crate::value::Value;

impl Graph {
    /// Append `lhs + rhs`.
    pub fn sum(&self, lhs: NodeId, rhs: NodeId) -> NodeId {
        let (a, b) = self.operand_values(lhs, rhs);
        self.create_binary(a + b, GradFn::Sum { lhs, rhs })
    }

    /// Append `lhs * rhs`.
    pub fn product(&self, lhs: NodeId, rhs: NodeId) -> NodeId {
        let (a, b) = self.operand_values(lhs, rhs);
        self.create_binary(a * b, GradFn::Product { lhs, rhs })
    }

    fn operand_values(&self, lhs: NodeId, rhs: NodeId) -> (f64, f64) {
        (self.node(lhs).value(), self.node(rhs).value())
    }
}

/// What `node`'s rule adds to each operand's gradient, given the node's
/// current `grad`.
///
/// Returns `None` for leaves. Reads operand values from `nodes`, never their
/// gradients.
pub(crate) fn contributions(node: Node, nodes: &[Node]) -> Option<[(NodeId, f64); 2]> {
    match node.grad_fn {
        GradFn::Leaf => None,

        // d(a + b)/da = 1, d(a + b)/db = 1
        GradFn::Sum { lhs, rhs } => Some([(lhs, node.grad), (rhs, node.grad)]),

        // d(a * b)/da = b, d(a * b)/db = a
        GradFn::Product { lhs, rhs } => {
            let a = nodes[lhs.index()].value;
            let b = nodes[rhs.index()].value;
            Some([(lhs, node.grad * b), (rhs, node.grad * a)])
        }
    }
}

impl<'g> Value<'g> {
    fn combine(self, rhs: Value<'g>, op: fn(&Graph, NodeId, NodeId) -> NodeId) -> Value<'g> {
        assert!(
            std::ptr::eq(self.graph, rhs.graph),
            "cannot combine values from different graphs"
        );
        Value {
            graph: self.graph,
            id: op(self.graph, self.id, rhs.id),
        }
    }
}

// Owned and borrowed operand combinations.
macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $graph_fn:ident) => {
        impl<'g> std::ops::$trait for Value<'g> {
            type Output = Value<'g>;

            fn $method(self, rhs: Value<'g>) -> Value<'g> {
                self.combine(rhs, Graph::$graph_fn)
            }
        }

        impl<'g> std::ops::$trait<&Value<'g>> for Value<'g> {
            type Output = Value<'g>;

            fn $method(self, rhs: &Value<'g>) -> Value<'g> {
                self.combine(*rhs, Graph::$graph_fn)
            }
        }

        impl<'g> std::ops::$trait<Value<'g>> for &Value<'g> {
            type Output = Value<'g>;

            fn $method(self, rhs: Value<'g>) -> Value<'g> {
                (*self).combine(rhs, Graph::$graph_fn)
            }
        }

        impl<'g> std::ops::$trait<&Value<'g>> for &Value<'g> {
            type Output = Value<'g>;

            fn $method(self, rhs: &Value<'g>) -> Value<'g> {
                (*self).combine(*rhs, Graph::$graph_fn)
            }
        }
    };
}

impl_binary_op!(Add, add, sum);
impl_binary_op!(Mul, mul, product);
