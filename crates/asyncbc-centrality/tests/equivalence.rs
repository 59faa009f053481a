//! Asynchronous engine vs sequential Brandes on random graphs.
//!
//! # Test Strategy
//!
//! 1. Generate random directed graphs (cycles, parallel edges and self-loops
//!    allowed).
//! 2. Run the engine over every source with 1, 2 and 8 workers in both pop
//!    orders.
//! 3. Assert each result matches `reference::brandes` within tolerance.
//!
//! Scores are sums of floating-point terms accumulated in an
//! interleaving-dependent order, so agreement is checked with a relative
//! tolerance rather than bit equality.

use asyncbc_centrality::reference::{brandes, shortest_path_counts};
use asyncbc_centrality::{BetweennessEngine, CentralityScores, EngineOptions, SourceRange};
use asyncbc_core::graph::{CsrGraph, NodeId, generate};
use asyncbc_core::worklist::WorklistOrder;
use proptest::prelude::*;

const TOLERANCE: f64 = 1e-6;

fn run(graph: &CsrGraph, threads: usize, order: WorklistOrder) -> CentralityScores {
    let options = EngineOptions {
        threads,
        order,
        count_actions: false,
        check_consistency: true,
    };
    let mut engine = BetweennessEngine::new(graph, options).expect("engine");
    engine.run(SourceRange::all()).expect("run");
    engine.scores()
}

fn arb_graph() -> impl Strategy<Value = CsrGraph> {
    (1_u32..24).prop_flat_map(|n| {
        prop::collection::vec((0..n, 0..n), 0..96).prop_map(move |edges| {
            CsrGraph::from_edges(n as usize, &edges).expect("generated edges are in range")
        })
    })
}

#[test]
fn worker_counts_agree_on_generated_graphs() {
    let graphs = [
        generate::grid(6, 6),
        generate::cycle(25, true),
        generate::complete(9),
        generate::erdos_renyi(60, 0.08, 3),
        generate::erdos_renyi(60, 0.08, 4).symmetrized(),
    ];

    for graph in &graphs {
        let expected = brandes(graph, graph.nodes());
        for threads in [1, 2, 8] {
            for order in [WorklistOrder::Fifo, WorklistOrder::Lifo] {
                let actual = run(graph, threads, order);
                let diff = actual.max_relative_difference(&expected);
                assert!(
                    diff < TOLERANCE,
                    "threads={threads} order={order} fingerprint={} diff={diff}",
                    graph.fingerprint()
                );
            }
        }
    }
}

#[test]
fn repeated_runs_are_identical_after_clear() {
    let graph = generate::erdos_renyi(80, 0.05, 21);
    let options = EngineOptions {
        threads: 4,
        order: WorklistOrder::Fifo,
        count_actions: true,
        check_consistency: true,
    };
    let mut engine = BetweennessEngine::new(&graph, options).expect("engine");

    let first_summary = engine.run(SourceRange::all()).expect("first run");
    let first = engine.scores();

    engine.clear_scores();
    assert!(engine.scores().as_slice().iter().all(|&bc| bc == 0.0));

    let second_summary = engine.run(SourceRange::all()).expect("second run");
    let second = engine.scores();

    assert!(first.max_relative_difference(&second) < TOLERANCE);
    assert_eq!(first_summary.sources_processed, second_summary.sources_processed);
    assert_eq!(first_summary.reached, second_summary.reached);
    assert_eq!(first_summary.leaves, second_summary.leaves);
}

#[test]
fn split_ranges_sum_to_full_run() {
    let graph = generate::erdos_renyi(50, 0.1, 8);
    let options = EngineOptions::with_threads(3);

    let mut engine = BetweennessEngine::new(&graph, options).expect("engine");
    engine.run(SourceRange { start: 0, count: 20 }).expect("head");
    engine.run(SourceRange { start: 20, count: 0 }).expect("tail");

    let full = run(&graph, 3, WorklistOrder::Fifo);
    assert!(engine.scores().max_relative_difference(&full) < TOLERANCE);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn matches_reference_on_random_graphs(
        graph in arb_graph(),
        threads in prop::sample::select(vec![1_usize, 2, 8]),
        lifo in any::<bool>(),
    ) {
        let order = if lifo { WorklistOrder::Lifo } else { WorklistOrder::Fifo };
        let expected = brandes(&graph, graph.nodes());
        let actual = run(&graph, threads, order);
        let diff = actual.max_relative_difference(&expected);
        prop_assert!(diff < TOLERANCE, "diff={} edges={:?}", diff, graph.edges().collect::<Vec<_>>());
    }

    #[test]
    fn forward_sigma_matches_bfs(graph in arb_graph(), source_pick in any::<u32>()) {
        let source: NodeId = source_pick % graph.node_count() as NodeId;
        let engine = BetweennessEngine::new(&graph, EngineOptions::with_threads(4)).expect("engine");
        engine.seed_source(source).expect("seed");
        engine.forward(source);

        let expected = shortest_path_counts(&graph, source);
        for v in graph.nodes() {
            let node = engine.node_snapshot(v);
            prop_assert_eq!(node.distance, expected.distance[v as usize]);
            prop_assert_eq!(node.sigma, expected.sigma[v as usize]);
        }
    }
}
