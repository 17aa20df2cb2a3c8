//! ## Error Types
//!
//! This module defines the errors surfaced by the graph, the attribute
//! columns, and the spatial index structures. All validation happens before
//! any state change, so an error never leaves a structure partially mutated.

use std::error::Error;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents errors for invalid operations or parameters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Occurs when a dtype string cannot be parsed.
    MalformedDType {
        /// The dtype string that was rejected.
        dtype: String,
    },
    /// Occurs when an attribute name is not a valid identifier.
    InvalidAttrName {
        /// The offending attribute name.
        name: String,
    },
    /// Occurs when an attribute name is not declared in the schema.
    UnknownAttr {
        /// The requested attribute name.
        name: String,
    },
    /// Occurs when supplied attribute data does not match the declared schema.
    AttrMismatch {
        /// The attribute name, or "*" when the attribute set itself is wrong.
        name: String,
        /// What went wrong (missing, extra, wrong kind, wrong shape).
        detail: String,
    },
    /// Occurs when parallel input arrays have different lengths.
    LengthMismatch {
        /// The expected number of rows.
        expected: usize,
        /// The number of rows found.
        found: usize,
    },
    /// Occurs when a referenced node does not exist.
    MissingNode {
        /// Debug rendering of the node id.
        node: String,
    },
    /// Occurs when a referenced edge does not exist.
    MissingEdge {
        /// Debug rendering of the edge as a `(u, v)` pair.
        edge: String,
    },
    /// Occurs when an edge would connect a node to itself.
    SelfLoop {
        /// Debug rendering of the node id.
        node: String,
    },
    /// Occurs when a bounding box has `min > max` on some axis, or a
    /// non-finite coordinate.
    InvalidRect {
        /// The first axis on which the box is invalid.
        axis: usize,
    },
    /// Occurs when the position attribute of a spatial graph is missing from
    /// the node schema or declared with the wrong dtype.
    PositionAttr {
        /// The position attribute name.
        name: String,
        /// Why the declaration was rejected.
        detail: String,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::MalformedDType { dtype } => {
                write!(f, "Malformed dtype string: {dtype:?}")
            }
            GraphError::InvalidAttrName { name } => {
                write!(f, "Attribute names must be valid identifiers, got {name:?}")
            }
            GraphError::UnknownAttr { name } => {
                write!(f, "Attribute {name:?} is not declared in the schema")
            }
            GraphError::AttrMismatch { name, detail } => {
                write!(f, "Attribute {name:?} does not match the schema: {detail}")
            }
            GraphError::LengthMismatch { expected, found } => {
                write!(
                    f,
                    "Length mismatch: expected {expected} rows, found {found}"
                )
            }
            GraphError::MissingNode { node } => {
                write!(f, "Node {node} does not exist")
            }
            GraphError::MissingEdge { edge } => {
                write!(f, "Edge {edge} does not exist")
            }
            GraphError::SelfLoop { node } => {
                write!(f, "Self-loops are not allowed (node {node})")
            }
            GraphError::InvalidRect { axis } => {
                write!(f, "Invalid bounding box: min > max on axis {axis}")
            }
            GraphError::PositionAttr { name, detail } => {
                write!(f, "Invalid position attribute {name:?}: {detail}")
            }
        }
    }
}

impl Error for GraphError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_dtype_display() {
        let err = GraphError::MalformedDType {
            dtype: "float128".to_string(),
        };
        assert_eq!(format!("{}", err), "Malformed dtype string: \"float128\"");
    }

    #[test]
    fn test_length_mismatch_display() {
        let err = GraphError::LengthMismatch {
            expected: 3,
            found: 5,
        };
        assert_eq!(
            format!("{}", err),
            "Length mismatch: expected 3 rows, found 5"
        );
    }

    #[test]
    fn test_invalid_rect_display() {
        let err = GraphError::InvalidRect { axis: 1 };
        assert_eq!(
            format!("{}", err),
            "Invalid bounding box: min > max on axis 1"
        );
    }

    #[test]
    fn test_self_loop_display() {
        let err = GraphError::SelfLoop {
            node: "7".to_string(),
        };
        assert_eq!(format!("{}", err), "Self-loops are not allowed (node 7)");
    }
}
