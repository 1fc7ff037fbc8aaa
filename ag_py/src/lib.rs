//! Python bindings for the scalar autodiff graph.
//!
//! Provides a `Graph` class that creates leaf values and a `Value` class with
//! `+`/`*` overloads, `zero_grad()` and `backward()`.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use ag_core::{Graph as CoreGraph, NodeId};

/// Owner of a computation graph.
///
/// Example:
///     >>> g = Graph()
///     >>> a = g.value(2.0)
///     >>> b = g.value(3.0)
///     >>> f = a * b + a
///     >>> f.backward()
///     >>> a.grad, b.grad
///     (4.0, 2.0)
#[pyclass(name = "Graph", unsendable)]
#[derive(Default)]
struct PyGraph {
    inner: CoreGraph,
}

#[pymethods]
impl PyGraph {
    #[new]
    fn new() -> Self {
        PyGraph::default()
    }

    /// Create a leaf value in this graph.
    fn value(slf: &Bound<'_, Self>, data: f64) -> PyValue {
        let id = slf.borrow().inner.create_leaf(data);
        PyValue {
            graph: slf.clone().unbind(),
            id,
        }
    }

    /// Render the graph in Graphviz DOT format.
    fn to_dot(&self) -> String {
        ag_core::to_dot(&self.inner)
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "Graph(nodes={}, edges={})",
            self.inner.len(),
            self.inner.edges().len()
        )
    }
}

/// A node of a `Graph`.
///
/// Values combine with other values of the same graph, or with plain floats,
/// which are added to the graph as new leaves.
#[pyclass(name = "Value", unsendable)]
struct PyValue {
    graph: Py<PyGraph>,
    id: NodeId,
}

/// Right-hand side of `+` and `*`.
#[derive(FromPyObject)]
enum Operand<'py> {
    Value(PyRef<'py, PyValue>),
    Scalar(f64),
}

impl PyValue {
    fn node(&self, py: Python<'_>) -> ag_core::Node {
        self.graph.borrow(py).inner.node(self.id)
    }

    fn combine(
        &self,
        py: Python<'_>,
        other: Operand<'_>,
        op: fn(&CoreGraph, NodeId, NodeId) -> NodeId,
        reflected: bool,
    ) -> PyResult<PyValue> {
        let graph = self.graph.borrow(py);
        let other_id = match other {
            Operand::Value(value) => {
                if !value.graph.is(&self.graph) {
                    return Err(PyValueError::new_err(
                        "cannot combine values from different graphs",
                    ));
                }
                value.id
            }
            Operand::Scalar(data) => graph.inner.create_leaf(data),
        };

        let (lhs, rhs) = if reflected {
            (other_id, self.id)
        } else {
            (self.id, other_id)
        };
        Ok(PyValue {
            graph: self.graph.clone_ref(py),
            id: op(&graph.inner, lhs, rhs),
        })
    }
}

#[pymethods]
impl PyValue {
    /// Position of this node in its graph.
    #[getter]
    fn id(&self) -> usize {
        self.id.index()
    }

    /// The scalar computed when the node was created.
    #[getter]
    fn data(&self, py: Python<'_>) -> f64 {
        self.node(py).value()
    }

    /// Gradient accumulated by the last backward pass.
    #[getter]
    fn grad(&self, py: Python<'_>) -> f64 {
        self.node(py).grad()
    }

    /// "leaf", "sum" or "product".
    #[getter]
    fn op(&self, py: Python<'_>) -> String {
        self.node(py).operation().to_string()
    }

    /// Reset the gradient of every node connected to this one.
    fn zero_grad(&self, py: Python<'_>) {
        self.graph.borrow(py).inner.zero_grad(self.id);
    }

    /// Seed this node's gradient with 1 and propagate to its ancestors.
    fn backward(&self, py: Python<'_>) {
        self.graph.borrow(py).inner.backward(self.id);
    }

    // === Operator overloads ===

    fn __add__(&self, py: Python<'_>, other: Operand<'_>) -> PyResult<PyValue> {
        self.combine(py, other, CoreGraph::sum, false)
    }

    fn __radd__(&self, py: Python<'_>, other: Operand<'_>) -> PyResult<PyValue> {
        self.combine(py, other, CoreGraph::sum, true)
    }

    fn __mul__(&self, py: Python<'_>, other: Operand<'_>) -> PyResult<PyValue> {
        self.combine(py, other, CoreGraph::product, false)
    }

    fn __rmul__(&self, py: Python<'_>, other: Operand<'_>) -> PyResult<PyValue> {
        self.combine(py, other, CoreGraph::product, true)
    }

    fn __repr__(&self, py: Python<'_>) -> String {
        let node = self.node(py);
        format!(
            "Value(id={}, op={}, data={}, grad={})",
            node.id(),
            node.operation(),
            node.value(),
            node.grad()
        )
    }
}

/// Python module for scalar reverse-mode automatic differentiation.
#[pymodule]
fn ag_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyGraph>()?;
    m.add_class::<PyValue>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ag_core::{Edge, GradFn, Operation};
    use pyo3::types::PyDict;

    fn with_gil<R>(f: impl FnOnce(Python<'_>) -> R) -> R {
        pyo3::prepare_freethreaded_python();
        Python::with_gil(f)
    }

    #[test]
    fn test_reflected_scalar_becomes_lhs_leaf() {
        with_gil(|py| {
            let g = Bound::new(py, PyGraph::new()).unwrap();
            let v = PyGraph::value(&g, 3.0);
            let w = v.__rmul__(py, Operand::Scalar(2.0)).unwrap();

            let graph = g.borrow();
            let graph = &graph.inner;
            let leaf = graph.node_snapshot()[1];
            assert_eq!(leaf.operation(), Operation::Leaf);
            assert_eq!(leaf.value(), 2.0);
            assert_eq!(
                graph.node(w.id).grad_fn(),
                GradFn::Product { lhs: leaf.id(), rhs: v.id }
            );
            assert_eq!(
                graph.edge_snapshot(),
                vec![
                    Edge { from: leaf.id(), to: w.id },
                    Edge { from: v.id, to: w.id },
                ]
            );
            assert_eq!(w.data(py), 6.0);
        });
    }

    #[test]
    fn test_scalar_rhs_becomes_rhs_leaf() {
        with_gil(|py| {
            let g = Bound::new(py, PyGraph::new()).unwrap();
            let v = PyGraph::value(&g, 3.0);
            let w = v.__add__(py, Operand::Scalar(0.5)).unwrap();

            let graph = g.borrow();
            let graph = &graph.inner;
            let leaf = graph.node_snapshot()[1].id();
            assert_eq!(graph.node(w.id).grad_fn(), GradFn::Sum { lhs: v.id, rhs: leaf });
            assert_eq!(w.data(py), 3.5);
            assert_eq!(w.op(py), "sum");
        });
    }

    #[test]
    fn test_mixing_graphs_raises_value_error() {
        with_gil(|py| {
            let g1 = Bound::new(py, PyGraph::new()).unwrap();
            let g2 = Bound::new(py, PyGraph::new()).unwrap();
            let a = PyGraph::value(&g1, 1.0);
            let b = Bound::new(py, PyGraph::value(&g2, 2.0)).unwrap();

            let err = a.__add__(py, Operand::Value(b.borrow())).err().unwrap();
            assert!(err.is_instance_of::<PyValueError>(py));
            assert_eq!(g1.borrow().inner.len(), 1);
            assert_eq!(g2.borrow().inner.len(), 1);
        });
    }

    #[test]
    fn test_python_operators_dispatch() {
        with_gil(|py| {
            let locals = PyDict::new(py);
            locals.set_item("g", Bound::new(py, PyGraph::new()).unwrap()).unwrap();
            locals.set_item("h", Bound::new(py, PyGraph::new()).unwrap()).unwrap();
            py.run(
                c"
v = g.value(3.0)
w = 2.0 * v + v
assert w.data == 9.0, w
w.zero_grad()
w.backward()
assert v.grad == 3.0, v
assert len(g) == 4
try:
    v * h.value(1.0)
except ValueError:
    pass
else:
    raise AssertionError('mixed graphs were combined')
",
                None,
                Some(&locals),
            )
            .unwrap();
        });
    }
}
