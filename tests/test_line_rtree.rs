use shared::*;

use spatial_graph::line_rtree::LineRTree;
use tracing::info;

fn pairs_of(result: Vec<((u64, u64), f64)>) -> Vec<(u64, u64)> {
    result.into_iter().map(|(pair, _)| pair).collect()
}

#[test]
fn test_nearest_line() {
    let mut tree: LineRTree<u64, f64, 2> = LineRTree::new();
    tree.insert_lines(
        &[(0, 1), (10, 11)],
        &[[1.0, 1.0], [10.0, 10.0]],
        &[[0.0, 0.0], [11.0, 11.0]],
    )
    .unwrap();

    let lines = pairs_of(tree.nearest(&[0.5, 0.5], 1));
    assert_eq!(lines, vec![(0, 1)]);
}

#[test]
fn test_nearest_disambiguates_lines_sharing_a_bounding_box() {
    let mut tree: LineRTree<u64, f64, 2> = LineRTree::new();
    // Both segments have the bounding box [(0,0), (1,1)]: one runs along
    // the main diagonal, the other along the anti-diagonal.
    tree.insert_lines(
        &[(0, 1), (2, 3)],
        &[[0.0, 0.0], [0.0, 1.0]],
        &[[1.0, 1.0], [1.0, 0.0]],
    )
    .unwrap();

    info!("querying near the main diagonal");
    assert_eq!(pairs_of(tree.nearest(&[0.6, 0.6], 1)), vec![(0, 1)]);

    info!("querying near the anti-diagonal");
    assert_eq!(pairs_of(tree.nearest(&[0.4, 0.6], 1)), vec![(2, 3)]);
}

#[test]
fn test_nearest_uses_exact_segment_distance() {
    let mut tree: LineRTree<u64, f64, 2> = LineRTree::new();
    // The long segment's bounding box is much closer to some queries than
    // the segment itself.
    tree.insert_lines(
        &[(0, 1), (2, 3)],
        &[[0.0, 0.0], [0.0, 100.0]],
        &[[1.0, 1.0], [100.0, 0.0]],
    )
    .unwrap();

    let result = tree.nearest(&[2.0, 2.0], 1);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].0, (0, 1));
    assert!((result[0].1 - 2.0).abs() < 1e-9);

    let result = tree.nearest(&[0.5, 0.5], 1);
    assert!(result[0].1.abs() < 1e-9);

    let result = tree.nearest(&[2.0, 0.0], 1);
    assert!((result[0].1 - 2.0).abs() < 1e-9);

    let result = tree.nearest(&[1.0, 0.0], 1);
    assert!((result[0].1 - 0.5).abs() < 1e-9);
}

#[test]
fn test_search_uses_the_bounding_box() {
    let mut tree: LineRTree<u64, f64, 2> = LineRTree::new();
    tree.insert_line(1, 2, [0.0, 0.0], [10.0, 10.0]).unwrap();

    // The box intersects the query even where the segment itself does not;
    // the range query is defined as the bounding-box test.
    assert_eq!(tree.search([8.0, 0.0], [9.0, 1.0]), vec![(1, 2)]);
    assert_eq!(tree.count([8.0, 0.0], [9.0, 1.0]), 1);
    assert!(tree.search([11.0, 11.0], [12.0, 12.0]).is_empty());
}

#[test]
fn test_delete_single() {
    let mut tree: LineRTree<u64, f64, 2> = LineRTree::new();
    tree.insert_lines(
        &[(0, 1), (2, 3)],
        &[[0.0, 0.0], [0.0, 100.0]],
        &[[1.0, 1.0], [100.0, 0.0]],
    )
    .unwrap();

    assert!(tree.delete_line(0, 1, [0.0, 0.0], [1.0, 1.0]));
    let remaining = pairs_of(tree.nearest(&[0.5, 0.5], 1));
    assert_eq!(remaining, vec![(2, 3)]);
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_delete_bulk() {
    let mut tree: LineRTree<u64, f64, 2> = LineRTree::new();
    let pairs = random_pairs(10_000, 10_000_000_000, SEED);
    let starts = random_positions_2d(10_000, SEED + 1);
    let ends = random_positions_2d(10_000, SEED + 2);

    tree.insert_lines(&pairs, &starts, &ends).unwrap();
    assert_eq!(tree.count([0.0, 0.0], [1.0, 1.0]), 10_000);

    let deleted = tree
        .delete_lines(&pairs[..1000], &starts[..1000], &ends[..1000])
        .unwrap();
    assert_eq!(deleted, 1000);
    assert_eq!(tree.count([0.0, 0.0], [1.0, 1.0]), 9_000);
    assert_eq!(tree.len(), 9_000);
}

#[test]
fn test_three_dimensional_lines() {
    let mut tree: LineRTree<u64, f64, 3> = LineRTree::new();
    tree.insert_line(1, 2, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0])
        .unwrap();
    tree.insert_line(3, 4, [5.0, 5.0, 5.0], [6.0, 4.0, 7.0])
        .unwrap();

    let result = tree.nearest(&[2.0, 2.0, 2.0], 1);
    assert_eq!(result[0].0, (1, 2));
    assert!((result[0].1 - 3.0).abs() < 1e-9);

    assert_eq!(
        tree.search([4.5, 3.5, 4.5], [6.5, 5.5, 7.5]),
        vec![(3, 4)]
    );
}
