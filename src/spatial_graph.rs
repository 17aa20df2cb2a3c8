//! ## Spatial Graph
//!
//! This module composes the typed graph with two spatial indices: a point
//! tree over vertex positions and a line tree over edges. One node
//! attribute, named at construction, supplies the `D`-dimensional
//! coordinates; every mutation keeps the graph and both trees consistent,
//! rolling back on failure so they never diverge.
//!
//! # Examples
//!
//! ```
//! use spatial_graph::columns::Buffer;
//! use spatial_graph::spatial_graph::SpatialGraph;
//!
//! let mut graph: SpatialGraph<u64, f64, 2> = SpatialGraph::new(
//!     &[("position", "double[2]")],
//!     &[("score", "float32")],
//!     "position",
//! )
//! .unwrap();
//!
//! graph
//!     .add_nodes(
//!         &[1, 2],
//!         &[("position", &Buffer::from(vec![0.0f64, 0.0, 1.0, 1.0]))],
//!     )
//!     .unwrap();
//! graph
//!     .add_edge(1, 2, &[("score", &Buffer::from(vec![0.5f32]))])
//!     .unwrap();
//!
//! assert_eq!(graph.query_nodes_in_roi([-0.5, -0.5], [0.5, 0.5]), vec![1]);
//! assert_eq!(graph.query_nearest_edges(&[0.5, 0.5], 1), vec![(1, 2)]);
//! ```

use crate::columns::{AttrSchema, Buffer, Element};
use crate::errors::GraphError;
use crate::geometry::{Coord, Rect};
use crate::graph::{Directed, EdgeType, Graph, NodeId, Undirected};
use crate::line_rtree::LineRTree;
use crate::point_rtree::PointRTree;
use crate::rtree::TreeItem;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A directed spatial graph.
pub type SpatialDiGraph<N, C, const D: usize> = SpatialGraph<N, C, D, Directed>;

/// A typed graph whose vertices carry `D`-dimensional positions, indexed
/// for range and nearest-neighbor queries over vertices and edges.
///
/// The vertex-id set of the point tree always equals the graph's vertex
/// set, and the endpoint-pair set of the line tree always equals the
/// graph's edge set; removal cascades from vertices to incident edges in
/// both the graph and the indices.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "N: Serialize, C: Serialize",
        deserialize = "N: Deserialize<'de>, C: Deserialize<'de>"
    ))
)]
pub struct SpatialGraph<N, C, const D: usize, Ty = Undirected>
where
    N: NodeId + TreeItem<C, D>,
    C: Coord + Element,
    Ty: EdgeType,
{
    graph: Graph<N, Ty>,
    node_rtree: PointRTree<N, C, D>,
    edge_rtree: LineRTree<N, C, D>,
    position_attr: String,
    position_index: usize,
}

impl<N, C, const D: usize, Ty> SpatialGraph<N, C, D, Ty>
where
    N: NodeId + TreeItem<C, D>,
    C: Coord + Element,
    Ty: EdgeType,
{
    /// Creates a spatial graph. `position_attr` names the node attribute
    /// holding the coordinates; it must be declared with the coordinate
    /// base kind and array size `D`.
    ///
    /// # Errors
    ///
    /// [`GraphError::PositionAttr`] when the position attribute is missing
    /// from the node declarations or has the wrong dtype, plus the schema
    /// errors of [`Graph::new`].
    pub fn new(
        node_attrs: &[(&str, &str)],
        edge_attrs: &[(&str, &str)],
        position_attr: &str,
    ) -> Result<Self, GraphError> {
        let node_schema = AttrSchema::new(node_attrs)?;
        let edge_schema = AttrSchema::new(edge_attrs)?;

        let Some(position_index) = node_schema.index_of(position_attr) else {
            return Err(GraphError::PositionAttr {
                name: position_attr.to_string(),
                detail: "not defined in the node attributes".to_string(),
            });
        };
        let (_, dtype) = node_schema.entry(position_index);
        if dtype.base() != <C as Element>::KIND {
            return Err(GraphError::PositionAttr {
                name: position_attr.to_string(),
                detail: format!(
                    "declared as {} but the coordinate type is {}",
                    dtype.base(),
                    <C as Element>::KIND
                ),
            });
        }
        if dtype.size() != D {
            return Err(GraphError::PositionAttr {
                name: position_attr.to_string(),
                detail: format!("declared with size {} but the index is {D}-dimensional", dtype.size()),
            });
        }

        Ok(SpatialGraph {
            graph: Graph::with_schemas(node_schema, edge_schema),
            node_rtree: PointRTree::new(),
            edge_rtree: LineRTree::new(),
            position_attr: position_attr.to_string(),
            position_index,
        })
    }

    /// Returns the underlying graph for read-only access.
    pub fn graph(&self) -> &Graph<N, Ty> {
        &self.graph
    }

    /// Returns the name of the position attribute.
    pub fn position_attr(&self) -> &str {
        &self.position_attr
    }

    /// Returns the position of a vertex.
    pub fn position(&self, id: &N) -> Result<[C; D], GraphError> {
        let Some(slice) = self.graph.node_attr_row_slice::<C>(self.position_index, id) else {
            return Err(GraphError::MissingNode {
                node: format!("{id:?}"),
            });
        };
        let mut position = [C::zero(); D];
        position.copy_from_slice(slice);
        Ok(position)
    }

    /// Returns the number of vertices.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Returns true if the graph has no vertices.
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Returns the number of edges.
    pub fn num_edges(&self) -> usize {
        self.graph.num_edges()
    }

    /// Returns true if the vertex exists.
    pub fn contains_node(&self, id: &N) -> bool {
        self.graph.contains_node(id)
    }

    /// Returns all vertex ids in insertion order.
    pub fn nodes(&self) -> Vec<N> {
        self.graph.nodes()
    }

    /// Returns all edges; see [`Graph::edges`] for the ordering contract.
    pub fn edges(&self) -> Vec<(N, N)> {
        self.graph.edges()
    }

    /// Adds a single vertex; the attributes must include the position.
    ///
    /// Returns 1 when the vertex was inserted and 0 when the id already
    /// exists.
    pub fn add_node(&mut self, id: N, attrs: &[(&str, &Buffer)]) -> Result<usize, GraphError> {
        self.add_nodes(&[id], attrs)
    }

    /// Adds a batch of vertices, mirroring each new vertex in the point
    /// tree. On failure the composite state is rolled back to its pre-call
    /// value.
    pub fn add_nodes(
        &mut self,
        ids: &[N],
        attrs: &[(&str, &Buffer)],
    ) -> Result<usize, GraphError> {
        let (_, fresh) = self.graph.validate_add_nodes(ids, attrs)?;
        let positions = self.positions_from_attrs(attrs, ids.len())?;

        let mut indexed: Vec<(N, [C; D])> = Vec::new();
        for (i, &id) in ids.iter().enumerate() {
            if !fresh[i] {
                continue;
            }
            if let Err(error) = self.node_rtree.insert_point(id, positions[i]) {
                self.rollback_points(&indexed);
                return Err(error);
            }
            indexed.push((id, positions[i]));
        }

        match self.graph.add_nodes(ids, attrs) {
            Ok(added) => Ok(added),
            Err(error) => {
                self.rollback_points(&indexed);
                Err(error)
            }
        }
    }

    /// Adds a single edge between existing vertices, mirroring it in the
    /// line tree.
    pub fn add_edge(&mut self, u: N, v: N, attrs: &[(&str, &Buffer)]) -> Result<usize, GraphError> {
        self.add_edges(&[(u, v)], attrs)
    }

    /// Adds a batch of edges. The endpoints' current positions supply the
    /// line geometry. On failure the composite state is rolled back.
    pub fn add_edges(
        &mut self,
        pairs: &[(N, N)],
        attrs: &[(&str, &Buffer)],
    ) -> Result<usize, GraphError> {
        let (_, fresh) = self.graph.validate_add_edges(pairs, attrs)?;

        let mut indexed: Vec<(N, N, [C; D], [C; D])> = Vec::new();
        for (i, &(u, v)) in pairs.iter().enumerate() {
            if !fresh[i] {
                continue;
            }
            let endpoints = self
                .position(&u)
                .and_then(|start| self.position(&v).map(|end| (start, end)));
            let (start, end) = match endpoints {
                Ok(endpoints) => endpoints,
                Err(error) => {
                    self.rollback_lines(&indexed);
                    return Err(error);
                }
            };
            if let Err(error) = self.edge_rtree.insert_line(u, v, start, end) {
                self.rollback_lines(&indexed);
                return Err(error);
            }
            indexed.push((u, v, start, end));
        }

        match self.graph.add_edges(pairs, attrs) {
            Ok(added) => Ok(added),
            Err(error) => {
                self.rollback_lines(&indexed);
                Err(error)
            }
        }
    }

    /// Removes a vertex, all its incident edges, and their index entries.
    pub fn remove_node(&mut self, id: N) -> Result<(), GraphError> {
        self.remove_nodes(&[id])
    }

    /// Removes a batch of vertices. Incident edges (for directed graphs
    /// the union of in- and out-edges) are deleted from the line tree by
    /// their endpoints' current positions, the points from the point tree,
    /// and finally the vertices from the graph.
    ///
    /// # Errors
    ///
    /// [`GraphError::MissingNode`] when any vertex does not exist; nothing
    /// is removed in that case.
    pub fn remove_nodes(&mut self, ids: &[N]) -> Result<(), GraphError> {
        self.graph.check_nodes_exist(ids)?;
        debug!("removing {} nodes from the spatial graph", ids.len());

        let incident = if Ty::is_directed() {
            let mut pairs = self.graph.out_edges_by_nodes(ids)?;
            pairs.extend(self.graph.in_edges_by_nodes(ids)?);
            pairs
        } else {
            self.graph.edges_by_nodes(ids)?
        };

        // An edge shows up once per endpoint in the removal set; the
        // second delete is a no-op.
        for &(a, b) in &incident {
            let start = self.position(&a)?;
            let end = self.position(&b)?;
            self.edge_rtree.delete_line(a, b, start, end);
        }

        for &id in ids {
            if let Ok(position) = self.position(&id) {
                self.node_rtree.delete_point(&id, position);
            }
        }

        self.graph.remove_nodes(ids)
    }

    /// Reads a node attribute; see [`Graph::get_node_attr`].
    pub fn get_node_attr(&self, name: &str, ids: Option<&[N]>) -> Result<Buffer, GraphError> {
        self.graph.get_node_attr(name, ids)
    }

    /// Writes a node attribute; see [`Graph::set_node_attr`]. The position
    /// attribute cannot be rewritten, because the indices store the
    /// coordinates it had at insert time.
    pub fn set_node_attr(
        &mut self,
        name: &str,
        ids: Option<&[N]>,
        values: &Buffer,
    ) -> Result<(), GraphError> {
        if name == self.position_attr {
            return Err(GraphError::PositionAttr {
                name: name.to_string(),
                detail: "positions cannot change while they are indexed".to_string(),
            });
        }
        self.graph.set_node_attr(name, ids, values)
    }

    /// Reads an edge attribute; see [`Graph::get_edge_attr`].
    pub fn get_edge_attr(
        &self,
        name: &str,
        pairs: Option<&[(N, N)]>,
    ) -> Result<Buffer, GraphError> {
        self.graph.get_edge_attr(name, pairs)
    }

    /// Writes an edge attribute; see [`Graph::set_edge_attr`].
    pub fn set_edge_attr(
        &mut self,
        name: &str,
        pairs: Option<&[(N, N)]>,
        values: &Buffer,
    ) -> Result<(), GraphError> {
        self.graph.set_edge_attr(name, pairs, values)
    }

    /// Returns the ids of all vertices whose position lies inside the
    /// query box.
    pub fn query_nodes_in_roi(&self, min: [C; D], max: [C; D]) -> Vec<N> {
        self.node_rtree.search(min, max)
    }

    /// Returns the endpoint pairs of all edges whose endpoint bounding box
    /// intersects the query box. This is the bounding-box test, not true
    /// segment-box intersection.
    pub fn query_edges_in_roi(&self, min: [C; D], max: [C; D]) -> Vec<(N, N)> {
        self.edge_rtree.search(min, max)
    }

    /// Returns up to `k` vertex ids by increasing squared distance from
    /// `point`.
    pub fn query_nearest_nodes(&self, point: &[C; D], k: usize) -> Vec<N> {
        self.node_rtree
            .nearest(point, k)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Like [`SpatialGraph::query_nearest_nodes`], also returning the
    /// squared distances.
    pub fn query_nearest_nodes_with_distances(
        &self,
        point: &[C; D],
        k: usize,
    ) -> (Vec<N>, Vec<C>) {
        self.node_rtree.nearest(point, k).into_iter().unzip()
    }

    /// Returns up to `k` edges by increasing squared point-to-segment
    /// distance from `point`.
    pub fn query_nearest_edges(&self, point: &[C; D], k: usize) -> Vec<(N, N)> {
        self.edge_rtree
            .nearest(point, k)
            .into_iter()
            .map(|(pair, _)| pair)
            .collect()
    }

    /// Like [`SpatialGraph::query_nearest_edges`], also returning the
    /// squared distances.
    pub fn query_nearest_edges_with_distances(
        &self,
        point: &[C; D],
        k: usize,
    ) -> (Vec<(N, N)>, Vec<C>) {
        self.edge_rtree.nearest(point, k).into_iter().unzip()
    }

    /// Returns the bounding box of all vertex positions, or `None` when
    /// the graph is empty.
    pub fn roi(&self) -> Option<Rect<C, D>> {
        self.node_rtree.bounding_box()
    }

    /// Extracts the per-row positions from the supplied attributes. The
    /// attribute set was validated against the schema beforehand.
    fn positions_from_attrs(
        &self,
        attrs: &[(&str, &Buffer)],
        rows: usize,
    ) -> Result<Vec<[C; D]>, GraphError> {
        let buffer = attrs
            .iter()
            .find(|(name, _)| *name == self.position_attr)
            .map(|(_, buffer)| *buffer)
            .ok_or_else(|| GraphError::AttrMismatch {
                name: self.position_attr.clone(),
                detail: "missing".to_string(),
            })?;
        let slice = buffer
            .as_slice::<C>()
            .ok_or_else(|| GraphError::AttrMismatch {
                name: self.position_attr.clone(),
                detail: "wrong element kind".to_string(),
            })?;

        let mut positions = Vec::with_capacity(rows);
        for chunk in slice.chunks_exact(D) {
            let mut position = [C::zero(); D];
            position.copy_from_slice(chunk);
            positions.push(position);
        }
        Ok(positions)
    }

    fn rollback_points(&mut self, indexed: &[(N, [C; D])]) {
        for (id, position) in indexed {
            self.node_rtree.delete_point(id, *position);
        }
    }

    fn rollback_lines(&mut self, indexed: &[(N, N, [C; D], [C; D])]) {
        for &(u, v, start, end) in indexed {
            self.edge_rtree.delete_line(u, v, start, end);
        }
    }
}
