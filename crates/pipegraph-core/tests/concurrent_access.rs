use pipegraph_core::{Draft, PropertyGraph};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const VERTICES: usize = 16;

fn ring() -> PropertyGraph {
    let graph = PropertyGraph::new();
    for i in 0..VERTICES {
        graph.add_vertex(Draft::new().with_id(format!("v{i}"))).unwrap();
    }
    graph
}

/// Every adjacency entry a reader sees must agree with the edge it names,
/// even while a writer keeps adding and removing edges.
fn check_symmetry(graph: &PropertyGraph) {
    for vertex in graph.vertices() {
        for edge_id in vertex.out_edges() {
            if let Some(edge) = graph.edge_by_id(edge_id).unwrap() {
                assert_eq!(edge.out_vertex(), Some(vertex.id()));
            }
        }
    }

    for edge in graph.edges() {
        let Some(out_vertex) = edge.out_vertex() else {
            panic!("edge without out-vertex");
        };
        let Some(vertex) = graph.vertex_by_id(out_vertex).unwrap() else {
            continue;
        };
        if !vertex.out_edges().any(|id| id == edge.id()) {
            // Only acceptable when the edge was removed in between
            assert!(graph.edge_by_id(edge.id()).unwrap().is_none());
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_half_linked_edges() {
    let graph = ring();
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let graph = graph.clone();
        let done = done.clone();
        tokio::task::spawn_blocking(move || {
            for round in 0..200 {
                let from = format!("v{}", round % VERTICES);
                let to = format!("v{}", (round + 1) % VERTICES);
                let edge = graph.add_edge(&from, "next", &to).unwrap();
                if round % 3 == 0 {
                    graph.remove_edges(std::iter::once(&edge)).unwrap();
                }
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut readers = Vec::new();
    for _ in 0..3 {
        let graph = graph.clone();
        let done = done.clone();
        readers.push(tokio::task::spawn_blocking(move || {
            while !done.load(Ordering::SeqCst) {
                check_symmetry(&graph);
            }
            check_symmetry(&graph);
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }

    let expected = (0..200).filter(|round| round % 3 != 0).count();
    assert_eq!(graph.number_of_edges().unwrap(), expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_keep_ids_unique() {
    let graph = PropertyGraph::new();
    let mut tasks = Vec::new();
    for _ in 0..4 {
        let graph = graph.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let mut rejected = 0;
            for i in 0..50 {
                // Every worker races for the same ids
                let id = format!("shared-{i}");
                if graph.add_vertex(Draft::new().with_id(id)).is_err() {
                    rejected += 1;
                }
            }
            rejected
        }));
    }

    let mut rejected = 0;
    for task in tasks {
        rejected += task.await.unwrap();
    }
    assert_eq!(graph.number_of_vertices().unwrap(), 50);
    assert_eq!(rejected, 150);
}
