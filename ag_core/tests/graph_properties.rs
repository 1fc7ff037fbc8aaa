//! Property-style checks over randomly generated sum/product expressions.

use ag_core::{check_gradient, to_dot, Graph, Operation, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// Test Utilities
// ============================================================================

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Add(usize, usize),
    Mul(usize, usize),
}

/// A random straight-line program over `inputs` leaves. Step `k` may refer to
/// any input or any earlier step's result.
fn random_program(rng: &mut StdRng, inputs: usize, steps: usize) -> Vec<Step> {
    (0..steps)
        .map(|k| {
            let pool = inputs + k;
            let i = rng.gen_range(0..pool);
            let j = rng.gen_range(0..pool);
            if rng.gen_bool(0.5) {
                Step::Add(i, j)
            } else {
                Step::Mul(i, j)
            }
        })
        .collect()
}

fn run<'g>(program: &[Step], inputs: &[Value<'g>]) -> Value<'g> {
    let mut pool = inputs.to_vec();
    for step in program {
        let next = match *step {
            Step::Add(i, j) => pool[i] + pool[j],
            Step::Mul(i, j) => pool[i] * pool[j],
        };
        pool.push(next);
    }
    pool[pool.len() - 1]
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_random_programs_match_finite_differences() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..50 {
        let inputs = rng.gen_range(1..5);
        let steps = rng.gen_range(1..10);
        let program = random_program(&mut rng, inputs, steps);
        let point: Vec<f64> = (0..inputs).map(|_| rng.gen_range(-1.5..1.5)).collect();

        let check = check_gradient(|v| run(&program, v), &point, 1e-6);
        for (a, n) in check.analytic.iter().zip(&check.numeric) {
            let scale = a.abs().max(1.0);
            assert!(
                (a - n).abs() < 1e-5 * scale,
                "program {:?} at {:?}: autodiff={}, fd={}",
                program,
                point,
                a,
                n
            );
        }
    }
}

#[test]
fn test_ids_are_dense_across_leaves_and_results() {
    let mut rng = StdRng::seed_from_u64(7);
    let g = Graph::new();
    let mut pool = vec![g.value(1.0)];

    for n in 1..200 {
        let v = if rng.gen_bool(0.3) {
            g.value(rng.gen_range(-1.0..1.0))
        } else {
            let i = rng.gen_range(0..pool.len());
            let j = rng.gen_range(0..pool.len());
            pool[i] + pool[j]
        };
        assert_eq!(v.id().index(), n);
        pool.push(v);
    }

    assert_eq!(g.len(), 200);
    for edge in g.edges().iter() {
        assert!(edge.from.index() < edge.to.index());
        assert!(edge.to.index() < g.len());
    }
}

#[test]
fn test_edge_count_matches_binary_nodes() {
    let g = Graph::new();
    let a = g.value(1.0);
    let b = g.value(2.0);
    let c = g.value(3.0);
    let _ = (a + b) * c + a * a;

    let binary = g
        .nodes()
        .iter()
        .filter(|n| n.operation() != Operation::Leaf)
        .count();
    assert_eq!(binary, 4);
    assert_eq!(g.edges().len(), 2 * binary);
}

#[test]
fn test_zero_grad_covers_component_after_random_passes() {
    let mut rng = StdRng::seed_from_u64(11);
    let g = Graph::new();
    let leaves: Vec<Value<'_>> = (0..4).map(|_| g.value(rng.gen_range(-2.0..2.0))).collect();
    let program = random_program(&mut rng, leaves.len(), 12);
    let out = run(&program, &leaves);

    out.backward();
    out.backward();

    // The output may not use every leaf, so reset from every leaf too.
    out.zero_grad();
    for leaf in &leaves {
        leaf.zero_grad();
    }
    assert!(g.nodes().iter().all(|n| n.grad() == 0.0));
}

#[test]
fn test_backward_on_intermediate_matches_isolated_graph() {
    // u = a * b is consumed by w = u + c; backward from u must give the same
    // partials as a graph where u is the sink.
    let g = Graph::new();
    let a = g.value(0.75);
    let b = g.value(-1.25);
    let c = g.value(4.0);
    let u = a * b;
    let w = u + c;

    w.zero_grad();
    u.backward();
    assert_eq!(a.grad(), b.value());
    assert_eq!(b.grad(), a.value());
    assert_eq!(w.grad(), 0.0);
    assert_eq!(c.grad(), 0.0);
}

#[test]
fn test_demo_graph_dot() {
    let g = Graph::new();
    let a = g.value(-2.1);
    let b = g.value(2.2);
    let c = g.value(1.1);
    let d = a * b;
    let e = a * b;
    let f = c * d + e;

    f.zero_grad();
    f.backward();

    let dot = to_dot(&g);
    let records = dot.lines().filter(|l| l.contains("[style=bold")).count();
    let edges: Vec<&str> = dot.lines().filter(|l| l.contains(" -> ")).collect();
    assert_eq!(records, 7);
    assert_eq!(
        edges,
        vec!["0 -> 3", "1 -> 3", "0 -> 4", "1 -> 4", "2 -> 5", "3 -> 5", "5 -> 6", "4 -> 6"]
    );
    assert!(dot.contains("6 [style=bold, label=\"+|i6|{{value|"));
    assert!(dot.contains("|{grad|1}}\"]"));
}
