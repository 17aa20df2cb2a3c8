//! ## Element Type Descriptors
//!
//! This module describes the element types used for node ids, coordinates,
//! and attributes: a fixed-width numeric base kind with an optional fixed
//! array length. Dtype strings follow the grammar `base` or `base[n]`, e.g.
//! `"uint64"`, `"double"`, or `"float32[3]"`.
//!
//! # Examples
//!
//! ```
//! use spatial_graph::dtypes::{BaseKind, DType};
//!
//! let dtype: DType = "double[3]".parse().unwrap();
//! assert_eq!(dtype.base(), BaseKind::F64);
//! assert!(dtype.is_array());
//! assert_eq!(dtype.size(), 3);
//! assert_eq!(dtype.element_size_bytes(), 24);
//! assert_eq!(dtype.to_string(), "float64[3]");
//! ```

use crate::errors::GraphError;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The fixed-width numeric base kinds an element can have.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl BaseKind {
    /// Returns the size of a single scalar of this kind in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            BaseKind::I8 | BaseKind::U8 => 1,
            BaseKind::I16 | BaseKind::U16 => 2,
            BaseKind::F32 | BaseKind::I32 | BaseKind::U32 => 4,
            BaseKind::F64 | BaseKind::I64 | BaseKind::U64 => 8,
        }
    }

    /// Returns true for the floating-point kinds.
    pub fn is_float(&self) -> bool {
        matches!(self, BaseKind::F32 | BaseKind::F64)
    }

    /// Returns the canonical spelling of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            BaseKind::F32 => "float32",
            BaseKind::F64 => "float64",
            BaseKind::I8 => "int8",
            BaseKind::I16 => "int16",
            BaseKind::I32 => "int32",
            BaseKind::I64 => "int64",
            BaseKind::U8 => "uint8",
            BaseKind::U16 => "uint16",
            BaseKind::U32 => "uint32",
            BaseKind::U64 => "uint64",
        }
    }

    fn from_base_str(s: &str) -> Option<BaseKind> {
        // "float" is single precision, "double" its double-precision
        // counterpart; bare "int"/"uint" default to 64 bits.
        match s {
            "float" | "float32" => Some(BaseKind::F32),
            "double" | "float64" => Some(BaseKind::F64),
            "int8" => Some(BaseKind::I8),
            "int16" => Some(BaseKind::I16),
            "int32" => Some(BaseKind::I32),
            "int" | "int64" => Some(BaseKind::I64),
            "uint8" => Some(BaseKind::U8),
            "uint16" => Some(BaseKind::U16),
            "uint32" => Some(BaseKind::U32),
            "uint" | "uint64" => Some(BaseKind::U64),
            _ => None,
        }
    }
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An element type descriptor: a base kind plus an optional fixed array size.
///
/// `DType` is an immutable value object. Scalars have `size() == 1` and an
/// empty shape; arrays have `size() == n` and shape `[n]`. Nested arrays are
/// rejected at parse time.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DType {
    base: BaseKind,
    size: Option<usize>,
}

impl DType {
    /// Creates a scalar dtype of the given base kind.
    pub fn scalar(base: BaseKind) -> Self {
        DType { base, size: None }
    }

    /// Creates a fixed-length array dtype. `size` must be at least 1.
    pub fn array(base: BaseKind, size: usize) -> Result<Self, GraphError> {
        if size < 1 {
            return Err(GraphError::MalformedDType {
                dtype: format!("{base}[{size}]"),
            });
        }
        Ok(DType {
            base,
            size: Some(size),
        })
    }

    /// Parses a dtype string of the form `base` or `base[n]`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MalformedDType`] when the base kind is not
    /// recognised, the brackets are unbalanced, the size is not a positive
    /// integer, or the string has trailing characters (which also rules out
    /// nested arrays like `"int32[2][3]"`).
    pub fn parse(dtype_str: &str) -> Result<Self, GraphError> {
        let malformed = || GraphError::MalformedDType {
            dtype: dtype_str.to_string(),
        };

        match dtype_str.find('[') {
            None => {
                let base = BaseKind::from_base_str(dtype_str).ok_or_else(malformed)?;
                Ok(DType { base, size: None })
            }
            Some(open) => {
                let base = BaseKind::from_base_str(&dtype_str[..open]).ok_or_else(malformed)?;
                let rest = &dtype_str[open + 1..];
                let close = rest.find(']').ok_or_else(malformed)?;
                if close + 1 != rest.len() {
                    return Err(malformed());
                }
                let digits = &rest[..close];
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(malformed());
                }
                let size: usize = digits.parse().map_err(|_| malformed())?;
                if size < 1 {
                    return Err(malformed());
                }
                Ok(DType {
                    base,
                    size: Some(size),
                })
            }
        }
    }

    /// Returns the base kind of this dtype.
    pub fn base(&self) -> BaseKind {
        self.base
    }

    /// Returns true if this dtype is a fixed-length array.
    pub fn is_array(&self) -> bool {
        self.size.is_some()
    }

    /// Returns the number of scalars per element (1 for scalar dtypes).
    pub fn size(&self) -> usize {
        self.size.unwrap_or(1)
    }

    /// Returns the shape of one element: empty for scalars, `[n]` for arrays.
    pub fn shape(&self) -> Vec<usize> {
        match self.size {
            Some(n) => vec![n],
            None => Vec::new(),
        }
    }

    /// Returns the size of one element in bytes.
    pub fn element_size_bytes(&self) -> usize {
        self.base.size_bytes() * self.size()
    }
}

impl FromStr for DType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DType::parse(s)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size {
            Some(n) => write!(f, "{}[{}]", self.base, n),
            None => write!(f, "{}", self.base),
        }
    }
}
