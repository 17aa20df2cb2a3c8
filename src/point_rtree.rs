//! ## Point R-Tree
//!
//! A thin specialisation of the generic [`RTree`](crate::rtree::RTree) for
//! point items: the stored box is degenerate (`min == max == position`) and
//! the default box-to-point distance is exact, so no custom distance
//! predicate is needed.
//!
//! Items are node ids: integer scalars or fixed-length arrays of integer
//! scalars.
//!
//! # Examples
//!
//! ```
//! use spatial_graph::point_rtree::PointRTree;
//!
//! let mut tree: PointRTree<u64, f64, 2> = PointRTree::new();
//! tree.insert_point(1, [0.0, 0.0]).unwrap();
//! tree.insert_point(2, [3.0, 4.0]).unwrap();
//!
//! let nearest = tree.nearest(&[0.1, 0.1], 1);
//! assert_eq!(nearest[0].0, 1);
//! assert_eq!(tree.count([-1.0, -1.0], [1.0, 1.0]), 1);
//! ```

use crate::errors::GraphError;
use crate::geometry::{Coord, Rect};
use crate::rtree::{RTree, TreeItem};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! impl_id_item {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<C: Coord, const D: usize> TreeItem<C, D> for $ty {
                fn matches(&self, other: &Self) -> bool {
                    self == other
                }
            }

            impl<C: Coord, const D: usize, const K: usize> TreeItem<C, D> for [$ty; K] {
                fn matches(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_id_item!(u8, u16, u32, u64, i8, i16, i32, i64);

/// An R-tree over point items.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointRTree<N: TreeItem<C, D>, C: Coord, const D: usize> {
    tree: RTree<N, C, D>,
}

impl<N: TreeItem<C, D>, C: Coord, const D: usize> Default for PointRTree<N, C, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: TreeItem<C, D>, C: Coord, const D: usize> PointRTree<N, C, D> {
    /// Creates an empty point tree.
    pub fn new() -> Self {
        PointRTree { tree: RTree::new() }
    }

    /// Inserts a single point item.
    ///
    /// To insert multiple points, use [`PointRTree::insert_points`].
    pub fn insert_point(&mut self, item: N, position: [C; D]) -> Result<(), GraphError> {
        self.tree.insert(item, Rect::point(position))
    }

    /// Inserts a batch of point items with their positions.
    pub fn insert_points(&mut self, items: &[N], positions: &[[C; D]]) -> Result<(), GraphError> {
        if items.len() != positions.len() {
            return Err(GraphError::LengthMismatch {
                expected: items.len(),
                found: positions.len(),
            });
        }
        for (item, position) in items.iter().zip(positions) {
            self.tree.insert(*item, Rect::point(*position))?;
        }
        Ok(())
    }

    /// Removes a point item stored at exactly `position`. Returns true if
    /// an entry was removed.
    pub fn delete_point(&mut self, item: &N, position: [C; D]) -> bool {
        self.tree.delete(item, &Rect::point(position))
    }

    /// Removes a batch of point items and returns how many were removed.
    pub fn delete_points(
        &mut self,
        items: &[N],
        positions: &[[C; D]],
    ) -> Result<usize, GraphError> {
        if items.len() != positions.len() {
            return Err(GraphError::LengthMismatch {
                expected: items.len(),
                found: positions.len(),
            });
        }
        let mut removed = 0;
        for (item, position) in items.iter().zip(positions) {
            if self.delete_point(item, *position) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Returns every item whose position lies inside the query box.
    pub fn search(&self, min: [C; D], max: [C; D]) -> Vec<N> {
        self.tree.search(min, max)
    }

    /// Returns the number of items inside the query box.
    pub fn count(&self, min: [C; D], max: [C; D]) -> usize {
        self.tree.count(min, max)
    }

    /// Returns up to `k` items by increasing squared Euclidean distance
    /// from `point`, with their squared distances.
    pub fn nearest(&self, point: &[C; D], k: usize) -> Vec<(N, C)> {
        self.tree.nearest(point, k)
    }

    /// Returns the bounding box of all stored points, or `None` when the
    /// tree is empty.
    pub fn bounding_box(&self) -> Option<Rect<C, D>> {
        self.tree.bounding_box()
    }

    /// Returns the number of stored points.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns true if the tree holds no points.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
