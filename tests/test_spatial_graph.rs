use shared::*;

use spatial_graph::columns::Buffer;
use spatial_graph::spatial_graph::{SpatialDiGraph, SpatialGraph};
use tracing::info;

#[test]
fn test_construction() {
    for edge_attrs in [
        &[][..],
        &[("score", "float64")][..],
        &[("score", "float64"), ("color", "uint8")][..],
    ] {
        let graph: SpatialGraph<u16, f64, 4> =
            SpatialGraph::new(&[("position", "double[4]")], edge_attrs, "position").unwrap();
        assert!(graph.is_empty());

        let graph: SpatialDiGraph<u16, i64, 4> =
            SpatialDiGraph::new(&[("position", "int[4]")], edge_attrs, "position").unwrap();
        assert!(graph.is_empty());
    }
}

fn roi_graph() -> SpatialGraph<u64, f64, 3> {
    let mut graph: SpatialGraph<u64, f64, 3> = SpatialGraph::new(
        &[("position", "double[3]")],
        &[("score", "float32")],
        "position",
    )
    .unwrap();

    graph
        .add_nodes(
            &[1, 2, 3, 4, 5],
            &[(
                "position",
                &Buffer::from(vec![
                    0.1f64, 0.1, 0.1, //
                    0.2, 0.2, 0.2, //
                    0.3, 0.3, 0.3, //
                    0.4, 0.4, 0.4, //
                    0.5, 0.5, 0.5,
                ]),
            )],
        )
        .unwrap();

    graph
        .add_edges(
            &[(1, 2), (3, 4), (5, 1)],
            &[("score", &Buffer::from(vec![0.2f32, 0.3, 0.4]))],
        )
        .unwrap();

    graph
}

#[test]
fn test_roi_query() {
    let graph = roi_graph();

    let mut nodes = graph.query_nodes_in_roi([0.0, 0.0, 0.0], [0.25, 0.25, 0.25]);
    nodes.sort_unstable();
    assert_eq!(nodes, vec![1, 2]);

    let edges = graph.query_edges_in_roi([0.0, 0.0, 0.0], [0.25, 0.25, 0.25]);
    assert_eq!(canonical_pairs(&edges), vec![(1, 2), (1, 5)]);

    // A region containing no nodes or edges.
    let nodes = graph.query_nodes_in_roi([1.0, 1.0, 1.0], [1.25, 1.25, 1.25]);
    let edges = graph.query_edges_in_roi([1.0, 1.0, 1.0], [1.25, 1.25, 1.25]);
    assert!(nodes.is_empty());
    assert!(edges.is_empty());
}

#[test]
fn test_roi_covers_all_positions() {
    let graph = roi_graph();
    let roi = graph.roi().unwrap();
    assert_eq!(roi.min, [0.1, 0.1, 0.1]);
    assert_eq!(roi.max, [0.5, 0.5, 0.5]);

    let mut nodes = graph.query_nodes_in_roi(roi.min, roi.max);
    nodes.sort_unstable();
    assert_eq!(nodes, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_nearest_queries() {
    let graph = roi_graph();

    assert_eq!(graph.query_nearest_nodes(&[0.0, 0.0, 0.0], 2), vec![1, 2]);

    let (nodes, dists) = graph.query_nearest_nodes_with_distances(&[0.1, 0.1, 0.1], 1);
    assert_eq!(nodes, vec![1]);
    assert!(dists[0].abs() < 1e-12);

    let (edges, dists) = graph.query_nearest_edges_with_distances(&[0.15, 0.15, 0.15], 1);
    assert_eq!(edges, vec![(1, 2)]);
    assert!(dists[0].abs() < 1e-12);
}

#[test]
fn test_add_node_requires_position() {
    let mut graph: SpatialGraph<u64, f64, 2> =
        SpatialGraph::new(&[("position", "double[2]")], &[], "position").unwrap();
    let result = graph.add_node(1, &[]);
    assert!(result.is_err());
    assert!(graph.is_empty());
    assert!(graph.roi().is_none());
}

#[test]
fn test_duplicate_nodes_are_not_double_indexed() {
    let mut graph: SpatialGraph<u64, f64, 2> =
        SpatialGraph::new(&[("position", "double[2]")], &[], "position").unwrap();
    graph
        .add_node(1, &[("position", &Buffer::from(vec![0.5f64, 0.5]))])
        .unwrap();
    // A second add of the same id is a no-op for both graph and index.
    let added = graph
        .add_node(1, &[("position", &Buffer::from(vec![0.7f64, 0.7]))])
        .unwrap();
    assert_eq!(added, 0);
    assert_eq!(graph.len(), 1);
    assert_eq!(
        graph.query_nodes_in_roi([0.0, 0.0], [1.0, 1.0]),
        vec![1]
    );
    assert_eq!(graph.position(&1).unwrap(), [0.5, 0.5]);
}

#[test]
fn test_remove_cascade() {
    let node_count = 100_000usize;
    let edge_count = 10_000usize;

    let mut graph: SpatialGraph<u64, f64, 3> = SpatialGraph::new(
        &[("position", "double[3]")],
        &[("score", "float32")],
        "position",
    )
    .unwrap();

    let ids: Vec<u64> = (0..node_count as u64).collect();
    let positions = random_positions_3d(node_count, SEED);
    let flat: Vec<f64> = positions.iter().flatten().copied().collect();
    graph
        .add_nodes(&ids, &[("position", &Buffer::from(flat))])
        .unwrap();

    let pairs = random_pairs(edge_count, node_count as u64, SEED + 1);
    let scores: Vec<f32> = (0..edge_count).map(|i| i as f32).collect();
    let added = graph
        .add_edges(&pairs, &[("score", &Buffer::from(scores))])
        .unwrap();
    info!("inserted {added} edges out of {edge_count} random pairs");

    graph.remove_nodes(&ids[..1000]).unwrap();

    assert_eq!(graph.len(), 99_000);

    // No surviving edge touches a removed vertex.
    for &(u, v) in &graph.edges() {
        assert!(u >= 1000 && v >= 1000);
    }

    // The indices agree with the graph exactly.
    let mut indexed_nodes = graph.query_nodes_in_roi([-1.0, -1.0, -1.0], [2.0, 2.0, 2.0]);
    indexed_nodes.sort_unstable();
    let mut graph_nodes = graph.nodes();
    graph_nodes.sort_unstable();
    assert_eq!(indexed_nodes, graph_nodes);

    let indexed_edges = graph.query_edges_in_roi([-1.0, -1.0, -1.0], [2.0, 2.0, 2.0]);
    assert_eq!(
        canonical_pairs(&indexed_edges),
        canonical_pairs(&graph.edges())
    );
    assert_eq!(indexed_edges.len(), graph.num_edges());
}

#[test]
fn test_directed_remove_cascade_covers_both_directions() {
    let mut graph: SpatialDiGraph<u64, f64, 2> = SpatialDiGraph::new(
        &[("position", "double[2]")],
        &[],
        "position",
    )
    .unwrap();

    graph
        .add_nodes(
            &[1, 2, 3],
            &[(
                "position",
                &Buffer::from(vec![0.0f64, 0.0, 1.0, 0.0, 0.0, 1.0]),
            )],
        )
        .unwrap();
    // Node 2 has an outgoing and an incoming edge, plus both orientations
    // against node 3.
    graph
        .add_edges(&[(2, 1), (1, 2), (2, 3), (3, 2)], &[])
        .unwrap();
    assert_eq!(graph.num_edges(), 4);

    graph.remove_node(2).unwrap();

    assert_eq!(graph.len(), 2);
    assert_eq!(graph.num_edges(), 0);
    assert!(graph
        .query_edges_in_roi([-1.0, -1.0], [2.0, 2.0])
        .is_empty());
}

#[test]
fn test_index_tracks_graph_through_mixed_mutations() {
    let mut graph: SpatialGraph<u64, f64, 2> = SpatialGraph::new(
        &[("position", "double[2]")],
        &[("w", "float64")],
        "position",
    )
    .unwrap();

    let positions = random_positions_2d(200, SEED);
    let ids: Vec<u64> = (0..200).collect();
    let flat: Vec<f64> = positions.iter().flatten().copied().collect();
    graph
        .add_nodes(&ids, &[("position", &Buffer::from(flat))])
        .unwrap();

    let pairs = random_pairs(300, 200, SEED + 7);
    let weights: Vec<f64> = (0..300).map(|i| i as f64).collect();
    graph
        .add_edges(&pairs, &[("w", &Buffer::from(weights))])
        .unwrap();

    // Interleave removals and additions, checking consistency throughout.
    for step in 0..10u64 {
        graph.remove_nodes(&[step * 3, step * 3 + 1]).unwrap();

        let new_id = 1000 + step;
        graph
            .add_node(
                new_id,
                &[("position", &Buffer::from(vec![0.5f64, 0.5 + step as f64]))],
            )
            .unwrap();
        graph
            .add_edge(new_id, 199, &[("w", &Buffer::from(vec![step as f64]))])
            .unwrap();

        let mut indexed = graph.query_nodes_in_roi([-1e6, -1e6], [1e6, 1e6]);
        indexed.sort_unstable();
        let mut expected = graph.nodes();
        expected.sort_unstable();
        assert_eq!(indexed, expected);

        let indexed_edges = graph.query_edges_in_roi([-1e6, -1e6], [1e6, 1e6]);
        assert_eq!(
            canonical_pairs(&indexed_edges),
            canonical_pairs(&graph.edges())
        );
    }
}
