//! File-level graph loading and worklist behaviour under real threads.

use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use asyncbc_core::error::{ErrorCode, GraphError};
use asyncbc_core::graph::{CsrGraph, GraphFormat, GraphStats, load_graph, write_gr};
use asyncbc_core::worklist::{WorkerPool, WorklistOrder};
use proptest::prelude::*;

fn write_temp(name: &str, bytes: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create");
    file.write_all(bytes).expect("write");
    (dir, path)
}

#[test]
fn edge_list_file_loads_and_symmetrizes() {
    let (_dir, path) = write_temp("tiny.txt", b"# directed path\n0 1\n1 2\n");

    let directed = load_graph(&path, GraphFormat::Auto, false).expect("load");
    assert_eq!(directed.edge_count(), 2);

    let undirected = load_graph(&path, GraphFormat::Auto, true).expect("load");
    assert_eq!(undirected.edge_count(), 4);
    assert_eq!(undirected.successors(1).collect::<Vec<_>>(), vec![2, 0]);

    let stats = GraphStats::from_graph(&directed);
    assert_eq!(stats.sinks, 1);
    assert_eq!(stats.fingerprint, directed.fingerprint());
}

#[test]
fn gr_file_is_detected_by_extension() {
    let graph = CsrGraph::from_edges(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]).expect("valid");
    let mut image = Vec::new();
    write_gr(&graph, &mut image).expect("encode");
    let (_dir, path) = write_temp("ring.gr", &image);

    let loaded = load_graph(&path, GraphFormat::Auto, false).expect("load");
    assert_eq!(loaded.fingerprint(), graph.fingerprint());

    // Forcing the text reader on binary input fails as a format error.
    let err = load_graph(&path, GraphFormat::EdgeList, false).expect_err("binary is not text");
    assert!(matches!(
        err.code(),
        ErrorCode::GraphFormatError | ErrorCode::GraphIoError
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = load_graph(&dir.path().join("absent.gr"), GraphFormat::Auto, false)
        .expect_err("missing");
    assert!(matches!(err, GraphError::Io { .. }));
    assert_eq!(err.code(), ErrorCode::GraphIoError);
}

#[test]
fn worklist_processes_each_pushed_item_once() {
    // Items fan out to their multiples below 2000; a shared flag set keeps
    // each value to a single push, as the engine's queued flag does.
    for order in [WorklistOrder::Fifo, WorklistOrder::Lifo] {
        let pool = WorkerPool::new(6, order).expect("pool");
        let seen = parking_lot::Mutex::new(HashSet::from([1_u32]));
        let processed = AtomicUsize::new(0);

        pool.run_to_quiescence([1_u32], |n, pusher| {
            processed.fetch_add(1, Ordering::Relaxed);
            for k in [2, 3, 5] {
                let next = n * k;
                if next < 2000 && seen.lock().insert(next) {
                    pusher.push(next);
                }
            }
        });

        assert_eq!(processed.load(Ordering::Relaxed), seen.lock().len());
    }
}

proptest! {
    #[test]
    fn symmetrized_graph_contains_every_reverse(
        edges in prop::collection::vec((0_u32..12, 0_u32..12), 0..40)
    ) {
        let graph = CsrGraph::from_edges(12, &edges).expect("valid");
        let sym = graph.symmetrized();
        let present: HashSet<(u32, u32)> = sym.edges().collect();
        for (a, b) in graph.edges() {
            prop_assert!(present.contains(&(b, a)));
        }
        prop_assert!(sym.edge_count() >= graph.edge_count());
        prop_assert!(sym.symmetrized().edge_count() == sym.edge_count());
    }
}
