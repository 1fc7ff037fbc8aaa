//! Graphviz DOT rendering of a graph.
//!
//! Each node becomes a record `op|i<id>|{{value|v}|{grad|g}}`, each edge a
//! `from -> to` line in insertion order. Render with e.g.
//! `dot graph.dot -Tpng -o graph.png`.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::info;

use crate::error::{Error, Result};
use crate::graph::Graph;

const HEADER: &str = r#"
digraph g {
node [shape=Mrecord]
fontname="Helvetica,Arial,sans-serif"
node [fontname="Helvetica,Arial,sans-serif"]
rankdir = "LR"
edge [fontname="Helvetica,Arial,sans-serif"]
"#;

/// `Display` adapter producing the DOT text of a graph snapshot.
pub struct Dot<'g>(pub &'g Graph);

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(HEADER)?;
        for node in self.0.nodes().iter() {
            writeln!(
                f,
                "{id} [style=bold, label=\"{op}|i{id}|{{{{value|{value}}}|{{grad|{grad}}}}}\"]",
                id = node.id(),
                op = node.operation().symbol(),
                value = node.value(),
                grad = node.grad(),
            )?;
        }
        writeln!(f)?;

        for edge in self.0.edges().iter() {
            writeln!(f, "{} -> {}", edge.from, edge.to)?;
        }
        writeln!(f, "}}")
    }
}

/// DOT text of the graph as it is right now.
pub fn to_dot(graph: &Graph) -> String {
    Dot(graph).to_string()
}

pub fn write_dot<W: Write>(graph: &Graph, mut out: W) -> io::Result<()> {
    write!(out, "{}", Dot(graph))?;
    out.flush()
}

/// Write the DOT text to `path`, replacing any existing file.
pub fn write_dot_file(graph: &Graph, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    info!("Writing graph to {}", path.display());

    let io_err = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    write_dot(graph, BufWriter::new(file)).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_leaf_record() {
        let g = Graph::new();
        g.create_leaf(1.5);

        let dot = to_dot(&g);
        assert!(dot.starts_with("\ndigraph g {\n"));
        assert!(dot.contains("rankdir = \"LR\""));
        assert!(dot.contains("0 [style=bold, label=\"?|i0|{{value|1.5}|{grad|0}}\"]"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_dot_edges_in_insertion_order() {
        let g = Graph::new();
        let a = g.value(2.0);
        let b = g.value(3.0);
        let p = a * b;
        let _ = p + a;

        let dot = to_dot(&g);
        assert!(dot.contains("2 [style=bold, label=\"*|i2|{{value|6}|{grad|0}}\"]"));
        assert!(dot.contains("3 [style=bold, label=\"+|i3|{{value|8}|{grad|0}}\"]"));

        let edges: Vec<&str> = dot.lines().filter(|l| l.contains(" -> ")).collect();
        assert_eq!(edges, vec!["0 -> 2", "1 -> 2", "2 -> 3", "0 -> 3"]);
    }

    #[test]
    fn test_dot_reflects_grads() {
        let g = Graph::new();
        let a = g.value(2.0);
        let b = g.value(3.0);
        let s = a + b;
        s.backward();

        let dot = to_dot(&g);
        assert!(dot.contains("label=\"+|i2|{{value|5}|{grad|1}}\""));
        assert!(dot.contains("label=\"?|i0|{{value|2}|{grad|1}}\""));
    }

    #[test]
    fn test_write_dot_matches_to_dot() {
        let g = Graph::new();
        let a = g.value(1.0);
        let _ = a * a;

        let mut buf = Vec::new();
        write_dot(&g, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), to_dot(&g));
    }

    #[test]
    fn test_write_dot_file_reports_path() {
        let g = Graph::new();
        g.create_leaf(1.0);

        let path = std::env::temp_dir()
            .join("ag_core_missing_dir")
            .join("nested")
            .join("graph.dot");
        let err = write_dot_file(&g, &path).unwrap_err();
        assert!(err.to_string().contains("graph.dot"));
    }
}
