//! ## Generic R-Tree
//!
//! This module implements the R-tree core shared by the point and line
//! trees: insertion with R*-style node splits, deletion by item and exact
//! bounding box with tree condensing, box range search, and best-first
//! k-nearest-neighbor search with a per-item distance predicate.
//!
//! Items are stored by value together with their bounding box and an
//! insertion ordinal; the ordinal breaks distance ties in k-NN results so
//! query output is deterministic.
//!
//! # Examples
//!
//! ```
//! use spatial_graph::geometry::Rect;
//! use spatial_graph::rtree::RTree;
//!
//! let mut tree: RTree<u64, f64, 2> = RTree::new();
//! for i in 0..10u64 {
//!     let p = i as f64;
//!     tree.insert(i, Rect::point([p, p])).unwrap();
//! }
//!
//! assert_eq!(tree.count([0.5, 0.5], [5.0, 5.0]), 5);
//! let nearest = tree.nearest(&[0.0, 0.0], 3);
//! assert_eq!(nearest[0].0, 0);
//! assert_eq!(nearest.len(), 3);
//! ```

use crate::errors::GraphError;
use crate::geometry::{Coord, Rect};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The maximum number of entries a node can hold.
pub const MAX_ITEMS: usize = 32;

/// The minimum number of entries a non-root node must hold.
pub const MIN_ITEMS: usize = 8;

/// Trait for items stored in an R-tree.
///
/// `matches` is the equality predicate used by deletion. `distance_sq` is
/// the distance predicate used for leaf entries during k-NN search; the
/// default returns the box-to-point squared distance, which is exact for
/// degenerate (point) boxes. The line tree overrides it to return the true
/// point-to-segment distance.
pub trait TreeItem<C: Coord, const D: usize>: Copy + fmt::Debug {
    /// Returns true if `other` denotes the same item.
    fn matches(&self, other: &Self) -> bool;

    /// Returns the squared distance from `point` to this item, given the
    /// item's stored bounding box.
    fn distance_sq(&self, point: &[C; D], rect: &Rect<C, D>) -> C {
        rect.min_dist_sq(point)
    }
}

/// An entry in an R-tree node: a stored item or a child node.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
enum Entry<T, C: Coord, const D: usize> {
    Item {
        rect: Rect<C, D>,
        item: T,
        ord: u64,
    },
    Child {
        rect: Rect<C, D>,
        node: Box<Node<T, C, D>>,
    },
}

impl<T, C: Coord, const D: usize> Entry<T, C, D> {
    fn rect(&self) -> &Rect<C, D> {
        match self {
            Entry::Item { rect, .. } => rect,
            Entry::Child { rect, .. } => rect,
        }
    }
}

/// A node in an R-tree.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct Node<T, C: Coord, const D: usize> {
    entries: Vec<Entry<T, C, D>>,
    is_leaf: bool,
}

/// An R-tree over items of type `T` with `D`-dimensional coordinates of
/// type `C`.
///
/// Non-root nodes hold between [`MIN_ITEMS`] and [`MAX_ITEMS`] entries,
/// every internal entry's box is the exact minimum bounding rectangle of
/// its subtree, and the tree height is uniform across branches.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RTree<T: TreeItem<C, D>, C: Coord, const D: usize> {
    root: Node<T, C, D>,
    // Height of the root above the leaf level; 0 while the root is a leaf.
    height: usize,
    len: usize,
    next_ord: u64,
}

impl<T: TreeItem<C, D>, C: Coord, const D: usize> Default for RTree<T, C, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TreeItem<C, D>, C: Coord, const D: usize> RTree<T, C, D> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        RTree {
            root: Node {
                entries: Vec::new(),
                is_leaf: true,
            },
            height: 0,
            len: 0,
            next_ord: 0,
        }
    }

    /// Returns the number of stored items.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree holds no items.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts an item with its bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidRect`] when the box has `min > max` or a
    /// non-finite coordinate on some axis; the tree is left unchanged.
    pub fn insert(&mut self, item: T, rect: Rect<C, D>) -> Result<(), GraphError> {
        rect.validate()?;
        let ord = self.next_ord;
        self.next_ord += 1;
        self.insert_entry(Entry::Item { rect, item, ord }, 0);
        self.len += 1;
        Ok(())
    }

    /// Inserts a batch of items with their bounding boxes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::LengthMismatch`] (before any insertion) when
    /// the slices have different lengths, and [`GraphError::InvalidRect`]
    /// for the first invalid box; items before the invalid index remain
    /// inserted.
    pub fn insert_many(&mut self, items: &[T], rects: &[Rect<C, D>]) -> Result<(), GraphError> {
        if items.len() != rects.len() {
            return Err(GraphError::LengthMismatch {
                expected: items.len(),
                found: rects.len(),
            });
        }
        debug!("inserting {} items", items.len());
        for (item, rect) in items.iter().zip(rects) {
            self.insert(*item, *rect)?;
        }
        Ok(())
    }

    /// Removes one entry matching `item` (via the equality predicate) whose
    /// stored box equals `rect` exactly. Returns true if an entry was
    /// removed; a non-matching pair is not an error.
    pub fn delete(&mut self, item: &T, rect: &Rect<C, D>) -> bool {
        let height = self.height;
        let mut orphans = Vec::new();
        let removed = delete_rec(&mut self.root, item, rect, height, &mut orphans);
        if removed {
            self.len -= 1;
            // An internal root with a single child shrinks by one level.
            while !self.root.is_leaf && self.root.entries.len() == 1 {
                if let Some(Entry::Child { node, .. }) = self.root.entries.pop() {
                    self.root = *node;
                    self.height -= 1;
                }
            }
            for (entry, target_height) in orphans {
                self.insert_entry(entry, target_height);
            }
        }
        removed
    }

    /// Removes a batch of `(item, rect)` pairs and returns how many entries
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::LengthMismatch`] when the slices have different
    /// lengths; no entry is removed in that case.
    pub fn delete_many(&mut self, items: &[T], rects: &[Rect<C, D>]) -> Result<usize, GraphError> {
        if items.len() != rects.len() {
            return Err(GraphError::LengthMismatch {
                expected: items.len(),
                found: rects.len(),
            });
        }
        debug!("deleting {} items", items.len());
        let mut removed = 0;
        for (item, rect) in items.iter().zip(rects) {
            if self.delete(item, rect) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Returns every item whose stored box intersects the query box. The
    /// result order is unspecified.
    pub fn search(&self, min: [C; D], max: [C; D]) -> Vec<T> {
        let query = Rect::new(min, max);
        let mut result = Vec::new();
        search_rec(&self.root, &query, &mut result);
        result
    }

    /// Returns the number of items whose stored box intersects the query
    /// box, without materialising them.
    pub fn count(&self, min: [C; D], max: [C; D]) -> usize {
        let query = Rect::new(min, max);
        count_rec(&self.root, &query)
    }

    /// Returns up to `k` items in non-decreasing squared-distance order
    /// from `point`, together with their squared distances. Distance ties
    /// are broken by insertion order. An empty tree or `k == 0` yields an
    /// empty result.
    ///
    /// Child nodes are expanded by the box-to-point lower bound; items are
    /// ranked by the item distance predicate, which is never below the
    /// bound of any enclosing box.
    pub fn nearest(&self, point: &[C; D], k: usize) -> Vec<(T, C)> {
        let mut result = Vec::new();
        if k == 0 || self.len == 0 {
            return result;
        }

        let mut heap: BinaryHeap<Candidate<'_, T, C, D>> = BinaryHeap::new();
        push_candidates(&mut heap, &self.root, point);

        while let Some(candidate) = heap.pop() {
            match candidate.target {
                Target::Node(node) => push_candidates(&mut heap, node, point),
                Target::Item(item) => {
                    result.push((*item, candidate.dist));
                    if result.len() == k {
                        break;
                    }
                }
            }
        }
        result
    }

    /// Returns the bounding box of all stored items, or `None` when the
    /// tree is empty.
    pub fn bounding_box(&self) -> Option<Rect<C, D>> {
        mbr_of(&self.root.entries)
    }

    #[doc(hidden)]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Inserts an entry into a node at `target_height`, splitting and
    /// growing the root as needed. Entries reinserted by tree condensing
    /// carry the height of the node they were removed from.
    fn insert_entry(&mut self, entry: Entry<T, C, D>, target_height: usize) {
        let height = self.height;
        let split = if target_height >= height {
            push_and_split(&mut self.root, entry)
        } else {
            insert_rec(&mut self.root, entry, height, target_height)
        };

        if let Some(sibling) = split {
            let old_root = std::mem::replace(
                &mut self.root,
                Node {
                    entries: Vec::new(),
                    is_leaf: false,
                },
            );
            if let Some(rect) = mbr_of(&old_root.entries) {
                self.root.entries.push(Entry::Child {
                    rect,
                    node: Box::new(old_root),
                });
            }
            if let Some(rect) = mbr_of(&sibling.entries) {
                self.root.entries.push(Entry::Child {
                    rect,
                    node: Box::new(sibling),
                });
            }
            self.height += 1;
        }
    }
}

/// Pushes an entry into `node` and splits on overflow, returning the new
/// sibling.
fn push_and_split<T: TreeItem<C, D>, C: Coord, const D: usize>(
    node: &mut Node<T, C, D>,
    entry: Entry<T, C, D>,
) -> Option<Node<T, C, D>> {
    node.entries.push(entry);
    if node.entries.len() > MAX_ITEMS {
        Some(split_node(node))
    } else {
        None
    }
}

fn insert_rec<T: TreeItem<C, D>, C: Coord, const D: usize>(
    node: &mut Node<T, C, D>,
    entry: Entry<T, C, D>,
    node_height: usize,
    target_height: usize,
) -> Option<Node<T, C, D>> {
    let index = choose_child(&node.entries, entry.rect());
    let split_child = match &mut node.entries[index] {
        Entry::Child { rect, node: child } => {
            let split = if node_height - 1 == target_height {
                push_and_split(child, entry)
            } else {
                insert_rec(child, entry, node_height - 1, target_height)
            };
            if let Some(new_rect) = mbr_of(&child.entries) {
                *rect = new_rect;
            }
            split
        }
        Entry::Item { .. } => unreachable!("internal node holds an item entry"),
    };

    let sibling = split_child?;
    if let Some(rect) = mbr_of(&sibling.entries) {
        node.entries.push(Entry::Child {
            rect,
            node: Box::new(sibling),
        });
    }
    if node.entries.len() > MAX_ITEMS {
        Some(split_node(node))
    } else {
        None
    }
}

/// Picks the child needing the least enlargement to cover `rect`; ties go
/// to the smaller resulting area, then the smaller current area.
fn choose_child<T: TreeItem<C, D>, C: Coord, const D: usize>(
    entries: &[Entry<T, C, D>],
    rect: &Rect<C, D>,
) -> usize {
    entries
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let (enl_a, new_a, cur_a) = fit_cost(a.rect(), rect);
            let (enl_b, new_b, cur_b) = fit_cost(b.rect(), rect);
            cmp_c(enl_a, enl_b)
                .then_with(|| cmp_c(new_a, new_b))
                .then_with(|| cmp_c(cur_a, cur_b))
        })
        .map(|(index, _)| index)
        .unwrap_or(0)
}

fn fit_cost<C: Coord, const D: usize>(child: &Rect<C, D>, rect: &Rect<C, D>) -> (C, C, C) {
    let current_area = child.area();
    let new_area = child.union(rect).area();
    (new_area - current_area, new_area, current_area)
}

/// Splits an overflowed node, keeping the first group and returning the
/// second.
///
/// Axis selection follows the R*-tree heuristic: entries are sorted by
/// lower then upper bound per axis, and the axis with the minimum summed
/// margin over all legal partitions wins. Along that axis the partition
/// with minimum overlap area is chosen, ties broken by total area.
fn split_node<T: TreeItem<C, D>, C: Coord, const D: usize>(
    node: &mut Node<T, C, D>,
) -> Node<T, C, D> {
    let count = node.entries.len();

    let mut best_axis = 0;
    let mut best_goodness: Option<C> = None;
    for axis in 0..D {
        sort_by_axis(&mut node.entries, axis);
        let mut goodness = C::zero();
        for k in MIN_ITEMS..=count - MIN_ITEMS {
            if let (Some(left), Some(right)) =
                (mbr_of(&node.entries[..k]), mbr_of(&node.entries[k..]))
            {
                goodness = goodness + left.margin() + right.margin();
            }
        }
        let better = match best_goodness {
            None => true,
            Some(best) => cmp_c(goodness, best) == Ordering::Less,
        };
        if better {
            best_goodness = Some(goodness);
            best_axis = axis;
        }
    }

    sort_by_axis(&mut node.entries, best_axis);
    let mut best_index = MIN_ITEMS;
    let mut best_cost: Option<(C, C)> = None;
    for k in MIN_ITEMS..=count - MIN_ITEMS {
        if let (Some(left), Some(right)) = (mbr_of(&node.entries[..k]), mbr_of(&node.entries[k..]))
        {
            let overlap = left.overlap_area(&right);
            let total_area = left.area() + right.area();
            let better = match best_cost {
                None => true,
                Some((best_overlap, best_area)) => match cmp_c(overlap, best_overlap) {
                    Ordering::Less => true,
                    Ordering::Equal => cmp_c(total_area, best_area) == Ordering::Less,
                    Ordering::Greater => false,
                },
            };
            if better {
                best_cost = Some((overlap, total_area));
                best_index = k;
            }
        }
    }

    let sibling_entries = node.entries.split_off(best_index);
    Node {
        entries: sibling_entries,
        is_leaf: node.is_leaf,
    }
}

fn sort_by_axis<T, C: Coord, const D: usize>(entries: &mut [Entry<T, C, D>], axis: usize) {
    entries.sort_by(|a, b| {
        cmp_c(a.rect().min[axis], b.rect().min[axis])
            .then_with(|| cmp_c(a.rect().max[axis], b.rect().max[axis]))
    });
}

fn mbr_of<T, C: Coord, const D: usize>(entries: &[Entry<T, C, D>]) -> Option<Rect<C, D>> {
    let mut iter = entries.iter();
    let first = *iter.next()?.rect();
    Some(iter.fold(first, |acc, entry| acc.union(entry.rect())))
}

fn cmp_c<C: PartialOrd>(a: C, b: C) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn search_rec<T: TreeItem<C, D>, C: Coord, const D: usize>(
    node: &Node<T, C, D>,
    query: &Rect<C, D>,
    result: &mut Vec<T>,
) {
    for entry in &node.entries {
        match entry {
            Entry::Item { rect, item, .. } => {
                if rect.intersects(query) {
                    result.push(*item);
                }
            }
            Entry::Child { rect, node } => {
                if rect.intersects(query) {
                    search_rec(node, query, result);
                }
            }
        }
    }
}

fn count_rec<T: TreeItem<C, D>, C: Coord, const D: usize>(
    node: &Node<T, C, D>,
    query: &Rect<C, D>,
) -> usize {
    let mut total = 0;
    for entry in &node.entries {
        match entry {
            Entry::Item { rect, .. } => {
                if rect.intersects(query) {
                    total += 1;
                }
            }
            Entry::Child { rect, node } => {
                if rect.intersects(query) {
                    total += count_rec(node, query);
                }
            }
        }
    }
    total
}

fn delete_rec<T: TreeItem<C, D>, C: Coord, const D: usize>(
    node: &mut Node<T, C, D>,
    item: &T,
    rect: &Rect<C, D>,
    node_height: usize,
    orphans: &mut Vec<(Entry<T, C, D>, usize)>,
) -> bool {
    if node.is_leaf {
        let position = node.entries.iter().position(|entry| {
            matches!(entry, Entry::Item { rect: stored, item: it, .. }
                if stored == rect && it.matches(item))
        });
        return match position {
            Some(index) => {
                node.entries.remove(index);
                true
            }
            None => false,
        };
    }

    // A stored box lies entirely inside every ancestor MBR, so only
    // containing children can hold it.
    let mut hit = None;
    for (index, entry) in node.entries.iter_mut().enumerate() {
        if let Entry::Child {
            rect: child_rect,
            node: child,
        } = entry
        {
            if !child_rect.contains_rect(rect) {
                continue;
            }
            if delete_rec(child, item, rect, node_height - 1, orphans) {
                if child.entries.len() < MIN_ITEMS {
                    hit = Some((index, true));
                } else {
                    if let Some(new_rect) = mbr_of(&child.entries) {
                        *child_rect = new_rect;
                    }
                    hit = Some((index, false));
                }
                break;
            }
        }
    }

    match hit {
        Some((index, true)) => {
            // Condense: orphan the underflowed child's entries for
            // reinsertion at their original level.
            if let Entry::Child { node: child, .. } = node.entries.remove(index) {
                let child_height = node_height - 1;
                for entry in child.entries {
                    let target_height = match entry {
                        Entry::Item { .. } => 0,
                        Entry::Child { .. } => child_height,
                    };
                    orphans.push((entry, target_height));
                }
            }
            true
        }
        Some((_, false)) => true,
        None => false,
    }
}

enum Target<'a, T, C: Coord, const D: usize> {
    Node(&'a Node<T, C, D>),
    Item(&'a T),
}

/// A prioritised tree region or item during k-NN search. Orders a max-heap
/// into a min-heap by distance; at equal distance nodes come before items
/// (so every tied item is known before any is emitted) and items pop in
/// insertion order.
struct Candidate<'a, T, C: Coord, const D: usize> {
    dist: C,
    ord: u64,
    target: Target<'a, T, C, D>,
}

impl<T, C: Coord, const D: usize> Candidate<'_, T, C, D> {
    fn rank(&self) -> (u8, u64) {
        match self.target {
            Target::Node(_) => (0, 0),
            Target::Item(_) => (1, self.ord),
        }
    }
}

impl<T, C: Coord, const D: usize> PartialEq for Candidate<'_, T, C, D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T, C: Coord, const D: usize> Eq for Candidate<'_, T, C, D> {}

impl<T, C: Coord, const D: usize> PartialOrd for Candidate<'_, T, C, D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, C: Coord, const D: usize> Ord for Candidate<'_, T, C, D> {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_c(other.dist, self.dist).then_with(|| other.rank().cmp(&self.rank()))
    }
}

fn push_candidates<'a, T: TreeItem<C, D>, C: Coord, const D: usize>(
    heap: &mut BinaryHeap<Candidate<'a, T, C, D>>,
    node: &'a Node<T, C, D>,
    point: &[C; D],
) {
    for entry in &node.entries {
        match entry {
            Entry::Item { rect, item, ord } => heap.push(Candidate {
                dist: item.distance_sq(point, rect),
                ord: *ord,
                target: Target::Item(item),
            }),
            Entry::Child { rect, node } => heap.push(Candidate {
                dist: rect.min_dist_sq(point),
                ord: 0,
                target: Target::Node(node),
            }),
        }
    }
}

#[cfg(test)]
impl<T: TreeItem<C, D>, C: Coord, const D: usize> RTree<T, C, D> {
    /// Checks the structural invariants: node fill bounds, exact MBRs, and
    /// uniform height.
    pub(crate) fn check_invariants(&self) {
        fn check_node<T, C: Coord, const D: usize>(
            node: &Node<T, C, D>,
            is_root: bool,
            expected_height: usize,
        ) {
            assert!(node.entries.len() <= MAX_ITEMS, "node overflow");
            if !is_root {
                assert!(node.entries.len() >= MIN_ITEMS, "node underflow");
            }
            if node.is_leaf {
                assert_eq!(expected_height, 0, "leaf above leaf level");
                for entry in &node.entries {
                    assert!(matches!(entry, Entry::Item { .. }), "child in leaf");
                }
                return;
            }
            assert!(expected_height > 0, "internal node at leaf level");
            for entry in &node.entries {
                match entry {
                    Entry::Child { rect, node: child } => {
                        let child_mbr = mbr_of(&child.entries);
                        assert_eq!(child_mbr.as_ref(), Some(rect), "stale child MBR");
                        check_node(child, false, expected_height - 1);
                    }
                    Entry::Item { .. } => panic!("item in internal node"),
                }
            }
        }

        fn count_items<T, C: Coord, const D: usize>(node: &Node<T, C, D>) -> usize {
            node.entries
                .iter()
                .map(|entry| match entry {
                    Entry::Item { .. } => 1,
                    Entry::Child { node, .. } => count_items(node),
                })
                .sum()
        }

        check_node(&self.root, true, self.height);
        assert_eq!(count_items(&self.root), self.len, "stale item count");
    }
}
