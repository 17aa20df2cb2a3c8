//! Bincode round-trip tests for the trees and graphs (the `serde` feature
//! is enabled for tests via the dev-dependency on this crate).

use shared::*;

use anyhow::Result;
use spatial_graph::columns::Buffer;
use spatial_graph::dtypes::DType;
use spatial_graph::line_rtree::LineRTree;
use spatial_graph::point_rtree::PointRTree;
use spatial_graph::spatial_graph::SpatialGraph;

#[test]
fn test_dtype_serialization() -> Result<()> {
    let dtype: DType = "double[3]".parse()?;
    let encoded = bincode::serialize(&dtype)?;
    let decoded: DType = bincode::deserialize(&encoded)?;
    assert_eq!(decoded, dtype);
    Ok(())
}

#[test]
fn test_point_tree_serialization() -> Result<()> {
    let tree = grid_point_tree(200);

    let encoded = bincode::serialize(&tree)?;
    let decoded: PointRTree<u64, f64, 2> = bincode::deserialize(&encoded)?;

    assert_eq!(decoded.len(), tree.len());
    assert_eq!(decoded.bounding_box(), tree.bounding_box());
    assert_eq!(
        decoded.nearest(&[50.2, 50.2], 5),
        tree.nearest(&[50.2, 50.2], 5)
    );
    assert_eq!(
        decoded.count([10.0, 10.0], [20.0, 20.0]),
        tree.count([10.0, 10.0], [20.0, 20.0])
    );
    Ok(())
}

#[test]
fn test_line_tree_serialization() -> Result<()> {
    let mut tree: LineRTree<u64, f64, 2> = LineRTree::new();
    tree.insert_line(0, 1, [0.0, 0.0], [1.0, 1.0])?;
    tree.insert_line(2, 3, [0.0, 1.0], [1.0, 0.0])?;

    let encoded = bincode::serialize(&tree)?;
    let decoded: LineRTree<u64, f64, 2> = bincode::deserialize(&encoded)?;

    // The corner masks survive, so segment distances still disambiguate.
    assert_eq!(decoded.nearest(&[0.6, 0.6], 1), tree.nearest(&[0.6, 0.6], 1));
    assert_eq!(decoded.nearest(&[0.4, 0.6], 1), tree.nearest(&[0.4, 0.6], 1));
    Ok(())
}

#[test]
fn test_spatial_graph_serialization() -> Result<()> {
    let mut graph: SpatialGraph<u64, f64, 2> = SpatialGraph::new(
        &[("position", "double[2]")],
        &[("score", "float32")],
        "position",
    )?;
    graph.add_nodes(
        &[1, 2, 3],
        &[(
            "position",
            &Buffer::from(vec![0.0f64, 0.0, 1.0, 1.0, 2.0, 0.0]),
        )],
    )?;
    graph.add_edges(
        &[(1, 2), (2, 3)],
        &[("score", &Buffer::from(vec![0.5f32, 0.7]))],
    )?;

    let encoded = bincode::serialize(&graph)?;
    let mut decoded: SpatialGraph<u64, f64, 2> = bincode::deserialize(&encoded)?;

    assert_eq!(decoded.nodes(), graph.nodes());
    assert_eq!(decoded.edges(), graph.edges());
    assert_eq!(
        decoded.get_edge_attr("score", None)?,
        graph.get_edge_attr("score", None)?
    );
    assert_eq!(
        decoded.query_nearest_nodes(&[0.1, 0.1], 2),
        graph.query_nearest_nodes(&[0.1, 0.1], 2)
    );

    // The decoded graph is fully mutable: the cascade still works.
    decoded.remove_node(2)?;
    assert_eq!(decoded.num_edges(), 0);
    assert_eq!(
        canonical_pairs(&decoded.query_edges_in_roi([-10.0, -10.0], [10.0, 10.0])),
        Vec::<(u64, u64)>::new()
    );
    Ok(())
}
