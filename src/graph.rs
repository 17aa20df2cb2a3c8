//! ## Typed Property Graph
//!
//! This module implements the typed graph underneath the spatial graph: an
//! adjacency store over typed node ids with insertion-ordered vertices,
//! directed and undirected variants, and densely packed typed attribute
//! columns for nodes and edges.
//!
//! The attribute schemas are frozen at construction. Bulk operations
//! validate their whole input first and only then mutate, so a failed call
//! never leaves the graph partially updated.
//!
//! # Examples
//!
//! ```
//! use spatial_graph::columns::Buffer;
//! use spatial_graph::graph::Graph;
//!
//! let mut graph: Graph<u64> = Graph::new(&[("score", "float32")], &[]).unwrap();
//! graph
//!     .add_nodes(
//!         &[1, 2, 3],
//!         &[("score", &Buffer::from(vec![0.1f32, 0.2, 0.3]))],
//!     )
//!     .unwrap();
//! graph.add_edge(1, 2, &[]).unwrap();
//!
//! assert_eq!(graph.nodes(), vec![1, 2, 3]);
//! assert_eq!(graph.num_edges(), 1);
//! ```

use crate::columns::{AttrSchema, Buffer, Column, Element};
use crate::errors::GraphError;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Trait for node id types: integer scalars or fixed-length arrays of
/// integer scalars.
pub trait NodeId: Copy + Eq + Ord + Hash + fmt::Debug + 'static {}

macro_rules! impl_node_id {
    ($($ty:ty),* $(,)?) => {
        $(
            impl NodeId for $ty {}
            impl<const K: usize> NodeId for [$ty; K] {}
        )*
    };
}

impl_node_id!(u8, u16, u32, u64, i8, i16, i32, i64);

/// Marker trait selecting the directed or undirected graph variant.
pub trait EdgeType {
    fn is_directed() -> bool;
}

/// Marker type for undirected graphs.
#[derive(Debug, Clone, Copy)]
pub enum Undirected {}

/// Marker type for directed graphs.
#[derive(Debug, Clone, Copy)]
pub enum Directed {}

impl EdgeType for Undirected {
    fn is_directed() -> bool {
        false
    }
}

impl EdgeType for Directed {
    fn is_directed() -> bool {
        true
    }
}

/// A directed graph.
pub type DiGraph<N> = Graph<N, Directed>;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct VertexRecord {
    // Insertion ordinal; stable for the vertex's lifetime and defines
    // iteration order.
    ord: u64,
    // Row index into the node attribute columns.
    row: usize,
}

/// Per-vertex adjacency. Undirected graphs mirror each edge into the `out`
/// map of both endpoints; directed graphs keep the edge slot on the `out`
/// side of the source and reference it from the `inc` side of the target.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(serialize = "N: Serialize", deserialize = "N: Deserialize<'de>"))
)]
struct Neighbors<N: NodeId> {
    out: HashMap<N, usize>,
    inc: HashMap<N, usize>,
}

impl<N: NodeId> Default for Neighbors<N> {
    fn default() -> Self {
        Neighbors {
            out: HashMap::new(),
            inc: HashMap::new(),
        }
    }
}

/// A typed property graph over node ids of type `N`.
///
/// Vertices carry an insertion ordinal defining the order of
/// [`Graph::nodes`]; node and edge attributes live in dense typed columns
/// declared at construction time and addressed by name.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(serialize = "N: Serialize", deserialize = "N: Deserialize<'de>"))
)]
pub struct Graph<N: NodeId, Ty: EdgeType = Undirected> {
    node_schema: AttrSchema,
    edge_schema: AttrSchema,
    verts: HashMap<N, VertexRecord>,
    order: BTreeMap<u64, N>,
    next_ord: u64,
    node_cols: Vec<Column>,
    // Which vertex owns each attribute row; kept in sync by swap-remove.
    row_owner: Vec<N>,
    adj: HashMap<N, Neighbors<N>>,
    edge_cols: Vec<Column>,
    // Which edge (stored key) owns each edge attribute slot.
    slot_owner: Vec<(N, N)>,
    _ty: PhantomData<Ty>,
}

impl<N: NodeId, Ty: EdgeType> Graph<N, Ty> {
    /// Creates a graph with the given node and edge attribute declarations,
    /// each a list of `(name, dtype string)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidAttrName`] for names that are not valid
    /// identifiers and [`GraphError::MalformedDType`] for dtype strings
    /// that do not parse.
    pub fn new(
        node_attrs: &[(&str, &str)],
        edge_attrs: &[(&str, &str)],
    ) -> Result<Self, GraphError> {
        Ok(Self::with_schemas(
            AttrSchema::new(node_attrs)?,
            AttrSchema::new(edge_attrs)?,
        ))
    }

    /// Creates a graph from already-built schemas.
    pub fn with_schemas(node_schema: AttrSchema, edge_schema: AttrSchema) -> Self {
        let node_cols = node_schema.iter().map(|(_, d)| Column::new(*d)).collect();
        let edge_cols = edge_schema.iter().map(|(_, d)| Column::new(*d)).collect();
        Graph {
            node_schema,
            edge_schema,
            verts: HashMap::new(),
            order: BTreeMap::new(),
            next_ord: 0,
            node_cols,
            row_owner: Vec::new(),
            adj: HashMap::new(),
            edge_cols,
            slot_owner: Vec::new(),
            _ty: PhantomData,
        }
    }

    /// Returns true for the directed variant.
    pub fn is_directed(&self) -> bool {
        Ty::is_directed()
    }

    /// Returns the node attribute schema.
    pub fn node_schema(&self) -> &AttrSchema {
        &self.node_schema
    }

    /// Returns the edge attribute schema.
    pub fn edge_schema(&self) -> &AttrSchema {
        &self.edge_schema
    }

    /// Returns the number of vertices.
    pub fn len(&self) -> usize {
        self.verts.len()
    }

    /// Returns true if the graph has no vertices.
    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    /// Returns the number of edges.
    pub fn num_edges(&self) -> usize {
        self.slot_owner.len()
    }

    /// Returns true if the vertex exists.
    pub fn contains_node(&self, id: &N) -> bool {
        self.verts.contains_key(id)
    }

    /// Returns the insertion ordinal of a vertex.
    pub fn node_ordinal(&self, id: &N) -> Option<u64> {
        self.verts.get(id).map(|record| record.ord)
    }

    /// Returns all vertex ids in insertion order.
    pub fn nodes(&self) -> Vec<N> {
        self.order.values().copied().collect()
    }

    /// Adds a single vertex with its attributes, supplied as
    /// `(name, buffer)` pairs holding one row each.
    ///
    /// Returns 1 when the vertex was inserted and 0 when the id already
    /// exists (the attributes are ignored in that case).
    pub fn add_node(&mut self, id: N, attrs: &[(&str, &Buffer)]) -> Result<usize, GraphError> {
        self.add_nodes(&[id], attrs)
    }

    /// Adds a batch of vertices. Each attribute buffer holds one row per
    /// id. Ids that already exist are skipped; the return value is the
    /// number of vertices actually inserted.
    ///
    /// # Errors
    ///
    /// [`GraphError::AttrMismatch`] when the supplied attribute set differs
    /// from the declared one by name, count, or element kind, and
    /// [`GraphError::LengthMismatch`] when a buffer does not hold one row
    /// per id. Validation happens before any mutation.
    pub fn add_nodes(
        &mut self,
        ids: &[N],
        attrs: &[(&str, &Buffer)],
    ) -> Result<usize, GraphError> {
        let (mapping, fresh) = self.validate_add_nodes(ids, attrs)?;
        Ok(self.apply_add_nodes(ids, attrs, &mapping, &fresh))
    }

    /// Adds a single edge between existing vertices.
    ///
    /// Returns 1 when the edge was inserted and 0 when the pair (canonical
    /// for undirected graphs) is already present.
    pub fn add_edge(&mut self, u: N, v: N, attrs: &[(&str, &Buffer)]) -> Result<usize, GraphError> {
        self.add_edges(&[(u, v)], attrs)
    }

    /// Adds a batch of edges. Duplicate pairs are skipped; the return value
    /// is the number of edges actually inserted.
    ///
    /// # Errors
    ///
    /// [`GraphError::MissingNode`] when an endpoint does not exist,
    /// [`GraphError::SelfLoop`] for a `(u, u)` pair, plus the attribute
    /// errors of [`Graph::add_nodes`]. Validation happens before any
    /// mutation.
    pub fn add_edges(
        &mut self,
        pairs: &[(N, N)],
        attrs: &[(&str, &Buffer)],
    ) -> Result<usize, GraphError> {
        let (mapping, fresh) = self.validate_add_edges(pairs, attrs)?;
        Ok(self.apply_add_edges(pairs, attrs, &mapping, &fresh))
    }

    /// Removes a vertex and all its incident edges.
    ///
    /// # Errors
    ///
    /// [`GraphError::MissingNode`] when the vertex does not exist.
    pub fn remove_node(&mut self, id: N) -> Result<(), GraphError> {
        self.remove_nodes(&[id])
    }

    /// Removes a batch of vertices and all their incident edges.
    ///
    /// # Errors
    ///
    /// [`GraphError::MissingNode`] when any vertex does not exist; nothing
    /// is removed in that case.
    pub fn remove_nodes(&mut self, ids: &[N]) -> Result<(), GraphError> {
        self.check_nodes_exist(ids)?;
        debug!("removing {} nodes", ids.len());
        for &id in ids {
            // Ids may repeat within the batch.
            if !self.verts.contains_key(&id) {
                continue;
            }
            for (a, b) in self.incident_stored_pairs(&id) {
                self.remove_edge_internal(a, b);
            }
            self.remove_vertex_record(&id);
        }
        Ok(())
    }

    /// Returns true when the edge exists. The pair is directional for
    /// directed graphs and unordered for undirected graphs.
    pub fn has_edge(&self, u: N, v: N) -> bool {
        self.edge_slot(u, v).is_some()
    }

    /// Returns all edges.
    ///
    /// Undirected graphs yield each edge exactly once as its canonical
    /// pair (smaller id first), ordered by the smaller-id endpoint's
    /// insertion ordinal, then the other endpoint's. Directed graphs yield
    /// every edge in its inserted orientation, ordered the same way by
    /// source then target.
    pub fn edges(&self) -> Vec<(N, N)> {
        let mut result = Vec::with_capacity(self.slot_owner.len());
        for &u in self.order.values() {
            let Some(neighbors) = self.adj.get(&u) else {
                continue;
            };
            let mut targets: Vec<N> = if Ty::is_directed() {
                neighbors.out.keys().copied().collect()
            } else {
                neighbors.out.keys().copied().filter(|v| u < *v).collect()
            };
            targets.sort_by_key(|v| self.node_ordinal(v));
            for v in targets {
                result.push((u, v));
            }
        }
        result
    }

    /// Returns the edges incident to `node` as `(node, neighbor)` pairs,
    /// neighbors in insertion order. For directed graphs these are the
    /// outgoing edges; see [`Graph::in_edges`] for the incoming side.
    pub fn edges_of(&self, node: N) -> Result<Vec<(N, N)>, GraphError> {
        self.anchored_edges(node, false)
    }

    /// Returns the outgoing edges of `node` as `(node, target)` pairs.
    pub fn out_edges(&self, node: N) -> Result<Vec<(N, N)>, GraphError> {
        self.anchored_edges(node, false)
    }

    /// Returns the incoming edges of `node` as `(node, source)` pairs.
    pub fn in_edges(&self, node: N) -> Result<Vec<(N, N)>, GraphError> {
        self.anchored_edges(node, true)
    }

    /// Returns the outgoing edges of every node, `(node, target)` pairs in
    /// insertion order of the anchor node.
    pub fn all_out_edges(&self) -> Vec<(N, N)> {
        self.all_anchored_edges(false)
    }

    /// Returns the incoming edges of every node, `(node, source)` pairs in
    /// insertion order of the anchor node.
    pub fn all_in_edges(&self) -> Vec<(N, N)> {
        self.all_anchored_edges(true)
    }

    /// Returns all edges incident to any of the given vertices. An edge
    /// with both endpoints in the set appears once per endpoint.
    pub fn edges_by_nodes(&self, ids: &[N]) -> Result<Vec<(N, N)>, GraphError> {
        self.check_nodes_exist(ids)?;
        let mut result = Vec::new();
        for &id in ids {
            result.extend(self.anchored_edges(id, false)?);
        }
        Ok(result)
    }

    /// Returns the outgoing edges of each of the given vertices.
    pub fn out_edges_by_nodes(&self, ids: &[N]) -> Result<Vec<(N, N)>, GraphError> {
        self.edges_by_nodes(ids)
    }

    /// Returns the incoming edges of each of the given vertices.
    pub fn in_edges_by_nodes(&self, ids: &[N]) -> Result<Vec<(N, N)>, GraphError> {
        self.check_nodes_exist(ids)?;
        let mut result = Vec::new();
        for &id in ids {
            result.extend(self.anchored_edges(id, true)?);
        }
        Ok(result)
    }

    /// Returns the neighbor count of each given vertex. For directed
    /// graphs this is the sum of in- and out-degree.
    pub fn count_neighbors(&self, ids: &[N]) -> Result<Vec<usize>, GraphError> {
        self.degree_counts(ids, |n| n.out.len() + n.inc.len())
    }

    /// Returns the in-degree of each given vertex.
    pub fn count_in_neighbors(&self, ids: &[N]) -> Result<Vec<usize>, GraphError> {
        self.degree_counts(ids, |n| n.inc.len())
    }

    /// Returns the out-degree of each given vertex.
    pub fn count_out_neighbors(&self, ids: &[N]) -> Result<Vec<usize>, GraphError> {
        self.degree_counts(ids, |n| n.out.len())
    }

    /// Reads a node attribute for the given vertices, or for all vertices
    /// in insertion order when `ids` is `None`.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownAttr`] for an undeclared name and
    /// [`GraphError::MissingNode`] for an absent vertex.
    pub fn get_node_attr(&self, name: &str, ids: Option<&[N]>) -> Result<Buffer, GraphError> {
        let index = self.node_attr_index(name)?;
        let rows = self.node_rows(ids)?;
        Ok(self.node_cols[index].read_rows(&rows))
    }

    /// Writes a node attribute for the given vertices, or for all vertices
    /// in insertion order when `ids` is `None`. The buffer holds one row
    /// per addressed vertex.
    pub fn set_node_attr(
        &mut self,
        name: &str,
        ids: Option<&[N]>,
        values: &Buffer,
    ) -> Result<(), GraphError> {
        let index = self.node_attr_index(name)?;
        let rows = self.node_rows(ids)?;
        self.node_cols[index]
            .write_rows(&rows, values)
            .map_err(|e| name_attr_error(e, name))
    }

    /// Reads an edge attribute for the given pairs, or for all edges in
    /// [`Graph::edges`] order when `pairs` is `None`.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownAttr`] for an undeclared name and
    /// [`GraphError::MissingEdge`] for an absent edge.
    pub fn get_edge_attr(
        &self,
        name: &str,
        pairs: Option<&[(N, N)]>,
    ) -> Result<Buffer, GraphError> {
        let index = self.edge_attr_index(name)?;
        let rows = self.edge_rows(pairs)?;
        Ok(self.edge_cols[index].read_rows(&rows))
    }

    /// Writes an edge attribute for the given pairs, or for all edges in
    /// [`Graph::edges`] order when `pairs` is `None`.
    pub fn set_edge_attr(
        &mut self,
        name: &str,
        pairs: Option<&[(N, N)]>,
        values: &Buffer,
    ) -> Result<(), GraphError> {
        let index = self.edge_attr_index(name)?;
        let rows = self.edge_rows(pairs)?;
        self.edge_cols[index]
            .write_rows(&rows, values)
            .map_err(|e| name_attr_error(e, name))
    }

    //
    // Internals
    //

    /// The stored key of an endpoint pair: canonical (smaller id first) for
    /// undirected graphs, as given for directed ones.
    fn store_key(u: N, v: N) -> (N, N) {
        if Ty::is_directed() || u < v {
            (u, v)
        } else {
            (v, u)
        }
    }

    fn edge_slot(&self, u: N, v: N) -> Option<usize> {
        self.adj.get(&u)?.out.get(&v).copied()
    }

    fn node_attr_index(&self, name: &str) -> Result<usize, GraphError> {
        self.node_schema
            .index_of(name)
            .ok_or_else(|| GraphError::UnknownAttr {
                name: name.to_string(),
            })
    }

    fn edge_attr_index(&self, name: &str) -> Result<usize, GraphError> {
        self.edge_schema
            .index_of(name)
            .ok_or_else(|| GraphError::UnknownAttr {
                name: name.to_string(),
            })
    }

    fn node_rows(&self, ids: Option<&[N]>) -> Result<Vec<usize>, GraphError> {
        match ids {
            Some(ids) => ids
                .iter()
                .map(|id| {
                    self.verts
                        .get(id)
                        .map(|record| record.row)
                        .ok_or_else(|| missing_node(id))
                })
                .collect(),
            None => Ok(self
                .order
                .values()
                .filter_map(|id| self.verts.get(id))
                .map(|record| record.row)
                .collect()),
        }
    }

    fn edge_rows(&self, pairs: Option<&[(N, N)]>) -> Result<Vec<usize>, GraphError> {
        match pairs {
            Some(pairs) => pairs
                .iter()
                .map(|&(u, v)| {
                    self.edge_slot(u, v)
                        .ok_or_else(|| GraphError::MissingEdge {
                            edge: format!("({u:?}, {v:?})"),
                        })
                })
                .collect(),
            None => Ok(self
                .edges()
                .into_iter()
                .filter_map(|(u, v)| self.edge_slot(u, v))
                .collect()),
        }
    }

    fn anchored_edges(&self, node: N, incoming: bool) -> Result<Vec<(N, N)>, GraphError> {
        let neighbors = self.adj.get(&node).ok_or_else(|| missing_node(&node))?;
        let map = if incoming {
            &neighbors.inc
        } else {
            &neighbors.out
        };
        let mut others: Vec<N> = map.keys().copied().collect();
        others.sort_by_key(|other| self.node_ordinal(other));
        Ok(others.into_iter().map(|other| (node, other)).collect())
    }

    fn all_anchored_edges(&self, incoming: bool) -> Vec<(N, N)> {
        let mut result = Vec::new();
        for &node in self.order.values() {
            if let Ok(edges) = self.anchored_edges(node, incoming) {
                result.extend(edges);
            }
        }
        result
    }

    fn degree_counts(
        &self,
        ids: &[N],
        count: impl Fn(&Neighbors<N>) -> usize,
    ) -> Result<Vec<usize>, GraphError> {
        ids.iter()
            .map(|id| {
                self.adj
                    .get(id)
                    .map(&count)
                    .ok_or_else(|| missing_node(id))
            })
            .collect()
    }

    pub(crate) fn check_nodes_exist(&self, ids: &[N]) -> Result<(), GraphError> {
        for id in ids {
            if !self.verts.contains_key(id) {
                return Err(missing_node(id));
            }
        }
        Ok(())
    }

    /// Reads one row of a node attribute column as a typed slice; used by
    /// the spatial graph to fetch positions without going through buffers.
    pub(crate) fn node_attr_row_slice<S: Element>(&self, attr_index: usize, id: &N) -> Option<&[S]> {
        let record = self.verts.get(id)?;
        self.node_cols[attr_index].row_slice::<S>(record.row)
    }

    /// Validates a node batch: the attribute set against the schema, one
    /// row per id, and which ids are actually new. Returns the position of
    /// each schema attribute within `attrs` and the per-id freshness mask.
    pub(crate) fn validate_add_nodes(
        &self,
        ids: &[N],
        attrs: &[(&str, &Buffer)],
    ) -> Result<(Vec<usize>, Vec<bool>), GraphError> {
        let mapping = validate_attrs(&self.node_schema, attrs, ids.len())?;
        let mut seen = HashSet::with_capacity(ids.len());
        let fresh = ids
            .iter()
            .map(|id| !self.verts.contains_key(id) && seen.insert(*id))
            .collect();
        Ok((mapping, fresh))
    }

    fn apply_add_nodes(
        &mut self,
        ids: &[N],
        attrs: &[(&str, &Buffer)],
        mapping: &[usize],
        fresh: &[bool],
    ) -> usize {
        let mut added = 0;
        for (i, &id) in ids.iter().enumerate() {
            if !fresh[i] {
                continue;
            }
            let row = self.row_owner.len();
            for (schema_index, column) in self.node_cols.iter_mut().enumerate() {
                let (_, buffer) = attrs[mapping[schema_index]];
                // Kinds and lengths were validated up front.
                let _ = column.push_row(buffer, i);
            }
            self.row_owner.push(id);
            let ord = self.next_ord;
            self.next_ord += 1;
            self.verts.insert(id, VertexRecord { ord, row });
            self.order.insert(ord, id);
            self.adj.insert(id, Neighbors::default());
            added += 1;
        }
        debug!("added {added} nodes");
        added
    }

    /// Validates an edge batch: attributes, endpoint existence, self-loops,
    /// and which pairs are actually new (including duplicates within the
    /// batch).
    pub(crate) fn validate_add_edges(
        &self,
        pairs: &[(N, N)],
        attrs: &[(&str, &Buffer)],
    ) -> Result<(Vec<usize>, Vec<bool>), GraphError> {
        let mapping = validate_attrs(&self.edge_schema, attrs, pairs.len())?;
        for &(u, v) in pairs {
            if u == v {
                return Err(GraphError::SelfLoop {
                    node: format!("{u:?}"),
                });
            }
            if !self.verts.contains_key(&u) {
                return Err(missing_node(&u));
            }
            if !self.verts.contains_key(&v) {
                return Err(missing_node(&v));
            }
        }
        let mut seen = HashSet::with_capacity(pairs.len());
        let fresh = pairs
            .iter()
            .map(|&(u, v)| {
                let key = Self::store_key(u, v);
                self.edge_slot(key.0, key.1).is_none() && seen.insert(key)
            })
            .collect();
        Ok((mapping, fresh))
    }

    fn apply_add_edges(
        &mut self,
        pairs: &[(N, N)],
        attrs: &[(&str, &Buffer)],
        mapping: &[usize],
        fresh: &[bool],
    ) -> usize {
        let mut added = 0;
        for (i, &(u, v)) in pairs.iter().enumerate() {
            if !fresh[i] {
                continue;
            }
            let (a, b) = Self::store_key(u, v);
            let slot = self.slot_owner.len();
            for (schema_index, column) in self.edge_cols.iter_mut().enumerate() {
                let (_, buffer) = attrs[mapping[schema_index]];
                let _ = column.push_row(buffer, i);
            }
            self.slot_owner.push((a, b));
            self.wire_edge(a, b, slot);
            added += 1;
        }
        debug!("added {added} edges");
        added
    }

    fn wire_edge(&mut self, a: N, b: N, slot: usize) {
        if Ty::is_directed() {
            if let Some(n) = self.adj.get_mut(&a) {
                n.out.insert(b, slot);
            }
            if let Some(n) = self.adj.get_mut(&b) {
                n.inc.insert(a, slot);
            }
        } else {
            if let Some(n) = self.adj.get_mut(&a) {
                n.out.insert(b, slot);
            }
            if let Some(n) = self.adj.get_mut(&b) {
                n.out.insert(a, slot);
            }
        }
    }

    fn unwire_edge(&mut self, a: N, b: N) {
        if Ty::is_directed() {
            if let Some(n) = self.adj.get_mut(&a) {
                n.out.remove(&b);
            }
            if let Some(n) = self.adj.get_mut(&b) {
                n.inc.remove(&a);
            }
        } else {
            if let Some(n) = self.adj.get_mut(&a) {
                n.out.remove(&b);
            }
            if let Some(n) = self.adj.get_mut(&b) {
                n.out.remove(&a);
            }
        }
    }

    /// The stored pairs of all edges incident to `id`.
    fn incident_stored_pairs(&self, id: &N) -> Vec<(N, N)> {
        let Some(neighbors) = self.adj.get(id) else {
            return Vec::new();
        };
        let mut pairs = Vec::with_capacity(neighbors.out.len() + neighbors.inc.len());
        if Ty::is_directed() {
            for &target in neighbors.out.keys() {
                pairs.push((*id, target));
            }
            for &source in neighbors.inc.keys() {
                pairs.push((source, *id));
            }
        } else {
            for &other in neighbors.out.keys() {
                pairs.push(Self::store_key(*id, other));
            }
        }
        pairs
    }

    /// Removes an edge by its stored key, fixing up the slot of the edge
    /// moved by swap-remove.
    fn remove_edge_internal(&mut self, a: N, b: N) -> bool {
        let Some(slot) = self.edge_slot(a, b) else {
            return false;
        };
        self.unwire_edge(a, b);
        for column in &mut self.edge_cols {
            column.swap_remove_row(slot);
        }
        self.slot_owner.swap_remove(slot);
        if slot < self.slot_owner.len() {
            let (p, q) = self.slot_owner[slot];
            self.wire_edge(p, q, slot);
        }
        true
    }

    /// Removes the vertex itself: its record, ordinal, adjacency entry, and
    /// attribute row (swap-remove with owner fix-up). Incident edges must
    /// already be gone.
    fn remove_vertex_record(&mut self, id: &N) {
        let Some(record) = self.verts.remove(id) else {
            return;
        };
        self.order.remove(&record.ord);
        self.adj.remove(id);
        for column in &mut self.node_cols {
            column.swap_remove_row(record.row);
        }
        self.row_owner.swap_remove(record.row);
        if record.row < self.row_owner.len() {
            let moved = self.row_owner[record.row];
            if let Some(moved_record) = self.verts.get_mut(&moved) {
                moved_record.row = record.row;
            }
        }
    }
}

fn missing_node<N: fmt::Debug>(id: &N) -> GraphError {
    GraphError::MissingNode {
        node: format!("{id:?}"),
    }
}

fn name_attr_error(error: GraphError, name: &str) -> GraphError {
    match error {
        GraphError::AttrMismatch { detail, .. } => GraphError::AttrMismatch {
            name: name.to_string(),
            detail,
        },
        other => other,
    }
}

/// Checks a supplied attribute set against a schema: every declared
/// attribute present exactly once, nothing undeclared, matching element
/// kinds, and one row per input element. Returns, per schema index, the
/// position of that attribute within `attrs`.
fn validate_attrs(
    schema: &AttrSchema,
    attrs: &[(&str, &Buffer)],
    rows: usize,
) -> Result<Vec<usize>, GraphError> {
    let mut mapping = vec![usize::MAX; schema.len()];
    for (position, &(name, buffer)) in attrs.iter().enumerate() {
        let Some(schema_index) = schema.index_of(name) else {
            return Err(GraphError::AttrMismatch {
                name: name.to_string(),
                detail: "not declared in the schema".to_string(),
            });
        };
        if mapping[schema_index] != usize::MAX {
            return Err(GraphError::AttrMismatch {
                name: name.to_string(),
                detail: "supplied more than once".to_string(),
            });
        }
        let (_, dtype) = schema.entry(schema_index);
        if buffer.base_kind() != dtype.base() {
            return Err(GraphError::AttrMismatch {
                name: name.to_string(),
                detail: format!("expected {} data, found {}", dtype.base(), buffer.base_kind()),
            });
        }
        if buffer.len() != rows * dtype.size() {
            return Err(GraphError::LengthMismatch {
                expected: rows,
                found: buffer.rows(dtype),
            });
        }
        mapping[schema_index] = position;
    }
    for (schema_index, &position) in mapping.iter().enumerate() {
        if position == usize::MAX {
            let (name, _) = schema.entry(schema_index);
            return Err(GraphError::AttrMismatch {
                name: name.to_string(),
                detail: "missing".to_string(),
            });
        }
    }
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored_graph() -> Graph<u64> {
        let mut graph: Graph<u64> = Graph::new(&[("score", "float32")], &[]).unwrap();
        graph
            .add_nodes(
                &[10, 20, 30],
                &[("score", &Buffer::from(vec![1.0f32, 2.0, 3.0]))],
            )
            .unwrap();
        graph
    }

    #[test]
    fn test_row_fixup_after_removal() {
        let mut graph = scored_graph();
        graph.remove_node(10).unwrap();

        // The last row moved into the freed slot; attribute reads still
        // address the right vertices.
        assert_eq!(
            graph.get_node_attr("score", Some(&[20, 30])).unwrap(),
            Buffer::from(vec![2.0f32, 3.0])
        );
        assert_eq!(graph.nodes(), vec![20, 30]);
    }

    #[test]
    fn test_duplicate_ids_in_batch_are_skipped() {
        let mut graph: Graph<u64> = Graph::new(&[("score", "float32")], &[]).unwrap();
        let added = graph
            .add_nodes(
                &[1, 1, 2],
                &[("score", &Buffer::from(vec![0.1f32, 0.2, 0.3]))],
            )
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(
            graph.get_node_attr("score", Some(&[1])).unwrap(),
            Buffer::from(vec![0.1f32])
        );
    }

    #[test]
    fn test_edge_slot_fixup_after_removal() {
        let mut graph: Graph<u64> = Graph::new(&[], &[("weight", "float64")]).unwrap();
        graph.add_nodes(&[1, 2, 3, 4], &[]).unwrap();
        graph
            .add_edges(
                &[(1, 2), (2, 3), (3, 4)],
                &[("weight", &Buffer::from(vec![12.0f64, 23.0, 34.0]))],
            )
            .unwrap();

        graph.remove_node(1).unwrap();
        assert_eq!(graph.num_edges(), 2);
        assert_eq!(
            graph.get_edge_attr("weight", Some(&[(2, 3), (3, 4)])).unwrap(),
            Buffer::from(vec![23.0f64, 34.0])
        );
    }

    #[test]
    fn test_ordinals_survive_unrelated_removal() {
        let mut graph = scored_graph();
        let ord_30 = graph.node_ordinal(&30).unwrap();
        graph.remove_node(20).unwrap();
        assert_eq!(graph.node_ordinal(&30), Some(ord_30));
        assert_eq!(graph.nodes(), vec![10, 30]);
    }
}
