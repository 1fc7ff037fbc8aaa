//! CLI demo for the scalar autodiff graph.
//!
//! Builds `f = c * (a * b) + (a * b)` with the two products as separate nodes,
//! backpropagates from `f`, prints every gradient, and writes the graph in
//! Graphviz DOT form.
//!
//! Usage:
//!   ag-cli graph.dot && dot graph.dot -Tpng -o graph.png
//!   ag-cli --a 0.5 --check          # DOT to stdout, verify gradients

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, info};

use ag_core::{check_gradient, write_dot, write_dot_file, Graph, Value};

/// Scalar autodiff demo
///
/// Backpropagates through a fixed expression and dumps the computation graph.
#[derive(Parser, Debug)]
#[command(name = "ag-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output file for the DOT graph (use "-" or omit for stdout)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Value of leaf a
    #[arg(long, default_value_t = -2.1, allow_hyphen_values = true)]
    a: f64,

    /// Value of leaf b
    #[arg(long, default_value_t = 2.2, allow_hyphen_values = true)]
    b: f64,

    /// Value of leaf c
    #[arg(long, default_value_t = 1.1, allow_hyphen_values = true)]
    c: f64,

    /// Compare gradients against central finite differences
    #[arg(long)]
    check: bool,

    /// Step size for --check (finite and > 0)
    #[arg(long, default_value_t = 1e-6, value_parser = parse_step)]
    eps: f64,

    /// Maximum absolute error accepted by --check
    #[arg(long, default_value_t = 1e-5)]
    tolerance: f64,

    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(short, long)]
    verbose: bool,
}

fn parse_step(s: &str) -> Result<f64, String> {
    let eps = s.parse::<f64>().map_err(|err| err.to_string())?;
    if eps.is_finite() && eps > 0.0 {
        Ok(eps)
    } else {
        Err(format!("step must be a finite number > 0, got {eps}"))
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Graph(#[from] ag_core::Error),

    #[error("failed to write graph to stdout: {0}")]
    Stdout(#[from] io::Error),

    #[error("gradient check failed: max error {max_error:.2e} >= tolerance {tolerance:.2e}")]
    GradientMismatch { max_error: f64, tolerance: f64 },
}

/// `f = c * d + e` with `d = a * b` and `e = a * b` built as distinct nodes.
fn demo<'g>(leaves: &[Value<'g>]) -> Value<'g> {
    let (a, b, c) = (leaves[0], leaves[1], leaves[2]);
    let d = a * b;
    let e = a * b;
    c * d + e
}

fn run(args: &Args) -> Result<(), CliError> {
    let g = Graph::new();
    let leaves = [g.value(args.a), g.value(args.b), g.value(args.c)];
    let f = demo(&leaves);
    debug!("built graph with {} nodes, {} edges", g.len(), g.edges().len());

    f.zero_grad();
    f.backward();

    // Summary goes to stderr so stdout stays clean DOT when no OUTPUT is given.
    eprintln!("f = c * (a * b) + (a * b)");
    eprintln!("At a = {}, b = {}, c = {}:", args.a, args.b, args.c);
    eprintln!("  f = {:.6}", f.value());
    for node in g.nodes().iter() {
        eprintln!(
            "  i{:<2} {:<7} value = {:>10.6}  grad = {:>10.6}",
            node.id(),
            node.operation(),
            node.value(),
            node.grad()
        );
    }

    if args.check {
        let point = [args.a, args.b, args.c];
        let check = check_gradient(demo, &point, args.eps);
        for (name, (analytic, numeric)) in ["a", "b", "c"]
            .iter()
            .zip(check.analytic.iter().zip(&check.numeric))
        {
            eprintln!("  df/d{name}: autodiff = {analytic:.10}, fd = {numeric:.10}");
        }
        if !check.passes(args.tolerance) {
            return Err(CliError::GradientMismatch {
                max_error: check.max_error,
                tolerance: args.tolerance,
            });
        }
        info!("gradient check passed (max error {:.2e})", check.max_error);
    }

    match &args.output {
        Some(path) if path.as_os_str() != "-" => write_dot_file(&g, path)?,
        _ => write_dot(&g, io::stdout().lock())?,
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
