//! ## Line R-Tree
//!
//! A specialisation of the generic [`RTree`](crate::rtree::RTree) for line
//! segments, used to index graph edges. A stored item keeps the two
//! endpoint ids and a per-axis corner mask recording which corner of the
//! bounding box the start point occupies; the original endpoints are
//! reconstructed from the box and the mask, so the tree can rank items by
//! the exact point-to-segment distance instead of the box distance.
//!
//! # Examples
//!
//! ```
//! use spatial_graph::line_rtree::LineRTree;
//!
//! let mut tree: LineRTree<u64, f64, 2> = LineRTree::new();
//! // Two segments sharing the same bounding box.
//! tree.insert_line(0, 1, [0.0, 0.0], [1.0, 1.0]).unwrap();
//! tree.insert_line(2, 3, [0.0, 1.0], [1.0, 0.0]).unwrap();
//!
//! assert_eq!(tree.nearest(&[0.6, 0.6], 1)[0].0, (0, 1));
//! assert_eq!(tree.nearest(&[0.4, 0.6], 1)[0].0, (2, 3));
//! ```

use crate::errors::GraphError;
use crate::geometry::{point_segment_dist_sq, Coord, Rect};
use crate::rtree::{RTree, TreeItem};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A line segment stored in a [`LineRTree`]: the endpoint pair plus the
/// corner mask. `corner_mask[axis]` is true iff the start endpoint has the
/// smaller coordinate on that axis, i.e. occupies the `min` corner.
///
/// The mask is computed once at insert time and never recomputed; without
/// it the bounding box alone could not tell the two box diagonals apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineItem<N, const D: usize> {
    pub u: N,
    pub v: N,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_util::array"))]
    pub corner_mask: [bool; D],
}

impl<N, const D: usize> LineItem<N, D> {
    /// Creates a line item for the segment from `start` to `end`, together
    /// with its bounding box.
    pub fn new<C: Coord>(u: N, v: N, start: [C; D], end: [C; D]) -> (Self, Rect<C, D>) {
        let mut corner_mask = [false; D];
        for axis in 0..D {
            corner_mask[axis] = start[axis] < end[axis];
        }
        let rect = Rect::from_corners(start, end);
        (LineItem { u, v, corner_mask }, rect)
    }

    /// Reconstructs the `(start, end)` endpoints from the stored box.
    pub fn endpoints<C: Coord>(&self, rect: &Rect<C, D>) -> ([C; D], [C; D]) {
        let mut start = rect.max;
        let mut end = rect.min;
        for axis in 0..D {
            if self.corner_mask[axis] {
                start[axis] = rect.min[axis];
                end[axis] = rect.max[axis];
            }
        }
        (start, end)
    }
}

impl<N, C, const D: usize> TreeItem<C, D> for LineItem<N, D>
where
    N: Copy + Eq + fmt::Debug + 'static,
    C: Coord,
{
    /// Two line items are equal when they connect the same unordered
    /// endpoint pair.
    fn matches(&self, other: &Self) -> bool {
        (self.u == other.u && self.v == other.v) || (self.u == other.v && self.v == other.u)
    }

    /// The exact squared distance from `point` to the stored segment.
    fn distance_sq(&self, point: &[C; D], rect: &Rect<C, D>) -> C {
        let (start, end) = self.endpoints(rect);
        point_segment_dist_sq(point, &start, &end)
    }
}

/// An R-tree over line segments identified by endpoint id pairs.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineRTree<N, C: Coord, const D: usize>
where
    N: Copy + Eq + fmt::Debug + 'static,
{
    tree: RTree<LineItem<N, D>, C, D>,
}

impl<N, C, const D: usize> Default for LineRTree<N, C, D>
where
    N: Copy + Eq + fmt::Debug + 'static,
    C: Coord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N, C, const D: usize> LineRTree<N, C, D>
where
    N: Copy + Eq + fmt::Debug + 'static,
    C: Coord,
{
    /// Creates an empty line tree.
    pub fn new() -> Self {
        LineRTree { tree: RTree::new() }
    }

    /// Inserts a single line from `start` to `end`.
    ///
    /// To insert multiple lines, use [`LineRTree::insert_lines`].
    pub fn insert_line(
        &mut self,
        u: N,
        v: N,
        start: [C; D],
        end: [C; D],
    ) -> Result<(), GraphError> {
        let (item, rect) = LineItem::new(u, v, start, end);
        self.tree.insert(item, rect)
    }

    /// Inserts a batch of lines given as endpoint id pairs and endpoint
    /// coordinates.
    pub fn insert_lines(
        &mut self,
        pairs: &[(N, N)],
        starts: &[[C; D]],
        ends: &[[C; D]],
    ) -> Result<(), GraphError> {
        if pairs.len() != starts.len() || pairs.len() != ends.len() {
            return Err(GraphError::LengthMismatch {
                expected: pairs.len(),
                found: starts.len().min(ends.len()),
            });
        }
        for ((&(u, v), start), end) in pairs.iter().zip(starts).zip(ends) {
            self.insert_line(u, v, *start, *end)?;
        }
        Ok(())
    }

    /// Removes the line with the given unordered endpoint pair and exact
    /// endpoint coordinates. Returns true if an entry was removed.
    pub fn delete_line(&mut self, u: N, v: N, start: [C; D], end: [C; D]) -> bool {
        let (item, rect) = LineItem::new(u, v, start, end);
        self.tree.delete(&item, &rect)
    }

    /// Removes a batch of lines and returns how many were removed.
    pub fn delete_lines(
        &mut self,
        pairs: &[(N, N)],
        starts: &[[C; D]],
        ends: &[[C; D]],
    ) -> Result<usize, GraphError> {
        if pairs.len() != starts.len() || pairs.len() != ends.len() {
            return Err(GraphError::LengthMismatch {
                expected: pairs.len(),
                found: starts.len().min(ends.len()),
            });
        }
        let mut removed = 0;
        for ((&(u, v), start), end) in pairs.iter().zip(starts).zip(ends) {
            if self.delete_line(u, v, *start, *end) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Returns the endpoint pairs of every line whose bounding box
    /// intersects the query box. This is the box test, not segment-box
    /// intersection.
    pub fn search(&self, min: [C; D], max: [C; D]) -> Vec<(N, N)> {
        self.tree
            .search(min, max)
            .into_iter()
            .map(|item| (item.u, item.v))
            .collect()
    }

    /// Returns the number of lines whose bounding box intersects the query
    /// box.
    pub fn count(&self, min: [C; D], max: [C; D]) -> usize {
        self.tree.count(min, max)
    }

    /// Returns up to `k` lines by increasing squared point-to-segment
    /// distance from `point`, with their squared distances.
    pub fn nearest(&self, point: &[C; D], k: usize) -> Vec<((N, N), C)> {
        self.tree
            .nearest(point, k)
            .into_iter()
            .map(|(item, dist)| ((item.u, item.v), dist))
            .collect()
    }

    /// Returns the bounding box of all stored lines, or `None` when the
    /// tree is empty.
    pub fn bounding_box(&self) -> Option<Rect<C, D>> {
        self.tree.bounding_box()
    }

    /// Returns the number of stored lines.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns true if the tree holds no lines.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
