pub mod columns;
pub mod dtypes;
pub mod errors;
pub mod geometry;
pub mod graph;
pub mod line_rtree;
#[cfg(feature = "setup_tracing")]
mod logging;
pub mod point_rtree;
pub mod rtree;
#[cfg(feature = "serde")]
mod serde_util;
pub mod spatial_graph;
