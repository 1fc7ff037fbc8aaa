//! # ag_core - scalar reverse-mode autodiff on an append-only graph
//!
//! Every arithmetic operation on a [`Value`] appends one node and two edges to
//! the [`Graph`] that owns it. A backward pass from any node then fills in the
//! gradient of that node with respect to everything it was computed from.
//!
//! ## Quick Start
//!
//! ```
//! use ag_core::Graph;
//!
//! let g = Graph::new();
//! let x = g.value(2.0);
//! let y = g.value(3.0);
//!
//! // z = x * y + x
//! let z = x * y + x;
//! assert_eq!(z.value(), 8.0);
//!
//! z.zero_grad();
//! z.backward();
//!
//! // dz/dx = y + 1, dz/dy = x
//! assert_eq!(x.grad(), 4.0);
//! assert_eq!(y.grad(), 2.0);
//! ```
//!
//! ## Architecture
//!
//! - **[`Graph`]**: owns all nodes and edges. Nodes are addressed by dense
//!   [`NodeId`]s and never move or disappear.
//! - **[`Value`]**: `Copy` handle borrowing its graph; supports `+` and `*`.
//! - **[`GradFn`]**: the per-node gradient rule, a tag plus operand ids.
//! - **[`dot`]**: Graphviz rendering of a graph snapshot.
//! - **[`gradcheck`]**: finite-difference validation of backward results.
//!
//! Working directly with ids is also possible:
//!
//! ```
//! use ag_core::{Graph, Operation};
//!
//! let g = Graph::new();
//! let a = g.create_leaf(1.5);
//! let b = g.create_leaf(-2.0);
//! let p = g.product(a, b);
//!
//! g.backward(p);
//! assert_eq!(g.node(p).operation(), Operation::Product);
//! assert_eq!(g.node(a).grad(), -2.0);
//! assert_eq!(g.node(b).grad(), 1.5);
//! assert_eq!(g.edges().len(), 2);
//! ```

mod backward;
pub mod dot;
mod error;
pub mod gradcheck;
mod graph;
mod ops;
mod value;

pub use dot::{to_dot, write_dot, write_dot_file};
pub use error::{Error, Result};
pub use gradcheck::{check_gradient, GradCheck};
pub use graph::{Edge, GradFn, Graph, Node, NodeId, Operation};
pub use value::Value;
