//! ## Typed Buffers and Attribute Columns
//!
//! This module implements the typed data plane of the graph: contiguous,
//! row-major [`Buffer`]s exchanged with the caller, dense per-attribute
//! [`Column`]s addressed by slot index, and the [`AttrSchema`] that freezes
//! attribute names and dtypes at construction time.
//!
//! Buffers are tagged by [`BaseKind`]; the [`Element`] trait ties each Rust
//! scalar to its tag so callers can recover strongly typed slices from a
//! tag match.
//!
//! # Examples
//!
//! ```
//! use spatial_graph::columns::Buffer;
//!
//! let buffer = Buffer::from(vec![1.0f64, 2.0, 3.0]);
//! assert_eq!(buffer.len(), 3);
//! assert_eq!(buffer.as_slice::<f64>(), Some(&[1.0, 2.0, 3.0][..]));
//! assert_eq!(buffer.as_slice::<f32>(), None);
//! ```

use crate::dtypes::{BaseKind, DType};
use crate::errors::GraphError;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An owned, contiguous, typed buffer of scalars.
///
/// Array-valued elements are stored row-major: element `i` of a buffer with
/// dtype size `m` occupies scalars `i * m .. (i + 1) * m`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
}

macro_rules! buffer_dispatch {
    ($buffer:expr, $v:ident => $body:expr) => {
        match $buffer {
            Buffer::F32($v) => $body,
            Buffer::F64($v) => $body,
            Buffer::I8($v) => $body,
            Buffer::I16($v) => $body,
            Buffer::I32($v) => $body,
            Buffer::I64($v) => $body,
            Buffer::U8($v) => $body,
            Buffer::U16($v) => $body,
            Buffer::U32($v) => $body,
            Buffer::U64($v) => $body,
        }
    };
}

macro_rules! buffer_zip {
    ($a:expr, $b:expr, ($x:ident, $y:ident) => $body:expr, _ => $mismatch:expr) => {
        match ($a, $b) {
            (Buffer::F32($x), Buffer::F32($y)) => $body,
            (Buffer::F64($x), Buffer::F64($y)) => $body,
            (Buffer::I8($x), Buffer::I8($y)) => $body,
            (Buffer::I16($x), Buffer::I16($y)) => $body,
            (Buffer::I32($x), Buffer::I32($y)) => $body,
            (Buffer::I64($x), Buffer::I64($y)) => $body,
            (Buffer::U8($x), Buffer::U8($y)) => $body,
            (Buffer::U16($x), Buffer::U16($y)) => $body,
            (Buffer::U32($x), Buffer::U32($y)) => $body,
            (Buffer::U64($x), Buffer::U64($y)) => $body,
            _ => $mismatch,
        }
    };
}

impl Buffer {
    /// Creates an empty buffer of the given base kind.
    pub fn new(kind: BaseKind) -> Self {
        match kind {
            BaseKind::F32 => Buffer::F32(Vec::new()),
            BaseKind::F64 => Buffer::F64(Vec::new()),
            BaseKind::I8 => Buffer::I8(Vec::new()),
            BaseKind::I16 => Buffer::I16(Vec::new()),
            BaseKind::I32 => Buffer::I32(Vec::new()),
            BaseKind::I64 => Buffer::I64(Vec::new()),
            BaseKind::U8 => Buffer::U8(Vec::new()),
            BaseKind::U16 => Buffer::U16(Vec::new()),
            BaseKind::U32 => Buffer::U32(Vec::new()),
            BaseKind::U64 => Buffer::U64(Vec::new()),
        }
    }

    /// Returns the base kind of this buffer.
    pub fn base_kind(&self) -> BaseKind {
        match self {
            Buffer::F32(_) => BaseKind::F32,
            Buffer::F64(_) => BaseKind::F64,
            Buffer::I8(_) => BaseKind::I8,
            Buffer::I16(_) => BaseKind::I16,
            Buffer::I32(_) => BaseKind::I32,
            Buffer::I64(_) => BaseKind::I64,
            Buffer::U8(_) => BaseKind::U8,
            Buffer::U16(_) => BaseKind::U16,
            Buffer::U32(_) => BaseKind::U32,
            Buffer::U64(_) => BaseKind::U64,
        }
    }

    /// Returns the number of scalars in the buffer.
    pub fn len(&self) -> usize {
        buffer_dispatch!(self, v => v.len())
    }

    /// Returns true if the buffer holds no scalars.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of rows when interpreted with the given dtype.
    pub fn rows(&self, dtype: &DType) -> usize {
        self.len() / dtype.size()
    }

    /// Returns a typed slice of the buffer contents, or `None` when `S`
    /// does not match the buffer's base kind.
    pub fn as_slice<S: Element>(&self) -> Option<&[S]> {
        S::slice(self)
    }

    /// Appends the scalar range `start..start + count` of `src` to this
    /// buffer. Returns false when the base kinds differ or the range is out
    /// of bounds, leaving this buffer unchanged.
    pub(crate) fn extend_from(&mut self, src: &Buffer, start: usize, count: usize) -> bool {
        buffer_zip!(self, src, (dst, s) => {
            match s.get(start..start + count) {
                Some(range) => {
                    dst.extend_from_slice(range);
                    true
                }
                None => false,
            }
        }, _ => false)
    }

    /// Overwrites the scalar range `start..start + count` of this buffer
    /// with the range `src_start..src_start + count` of `src`. Returns false
    /// on kind mismatch or out-of-bounds ranges.
    pub(crate) fn copy_from(
        &mut self,
        start: usize,
        src: &Buffer,
        src_start: usize,
        count: usize,
    ) -> bool {
        buffer_zip!(self, src, (dst, s) => {
            match (dst.get_mut(start..start + count), s.get(src_start..src_start + count)) {
                (Some(d), Some(r)) => {
                    d.copy_from_slice(r);
                    true
                }
                _ => false,
            }
        }, _ => false)
    }

    fn swap_remove_range(&mut self, start: usize, count: usize) {
        buffer_dispatch!(self, v => {
            let last_start = v.len() - count;
            for offset in 0..count {
                v.swap(start + offset, last_start + offset);
            }
            v.truncate(last_start);
        })
    }
}

/// Ties a Rust scalar type to its [`BaseKind`] tag.
///
/// This is the strongly typed accessor over the tagged buffers: matching on
/// the tag is done once, inside [`Element::slice`], and callers work with
/// plain slices afterwards. The trait is sealed; it is implemented exactly
/// for the ten supported scalars.
pub trait Element: Copy + sealed::Sealed + 'static {
    /// The tag of this scalar type.
    const KIND: BaseKind;

    /// Returns the typed contents of `buffer` when the tags agree.
    fn slice(buffer: &Buffer) -> Option<&[Self]>;

    /// Wraps a typed vector into a tagged buffer.
    fn into_buffer(values: Vec<Self>) -> Buffer;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Element for $ty {
                const KIND: BaseKind = BaseKind::$variant;

                fn slice(buffer: &Buffer) -> Option<&[Self]> {
                    match buffer {
                        Buffer::$variant(v) => Some(v.as_slice()),
                        _ => None,
                    }
                }

                fn into_buffer(values: Vec<Self>) -> Buffer {
                    Buffer::$variant(values)
                }
            }

            impl From<Vec<$ty>> for Buffer {
                fn from(values: Vec<$ty>) -> Buffer {
                    Buffer::$variant(values)
                }
            }
        )*
    };
}

impl_element!(
    f32 => F32,
    f64 => F64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
);

/// A dense typed column holding one declared attribute for all vertices or
/// edges, addressed by slot index.
///
/// Rows are removed by swap-remove; the owner of the moved row is fixed up
/// by the graph, which tracks slot ownership.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Column {
    dtype: DType,
    data: Buffer,
}

impl Column {
    /// Creates an empty column for the given dtype.
    pub fn new(dtype: DType) -> Self {
        Column {
            dtype,
            data: Buffer::new(dtype.base()),
        }
    }

    /// Returns the declared dtype of this column.
    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    /// Returns the number of rows stored.
    pub fn rows(&self) -> usize {
        self.data.len() / self.dtype.size()
    }

    /// Appends row `src_row` of `src` to this column.
    pub(crate) fn push_row(&mut self, src: &Buffer, src_row: usize) -> Result<(), GraphError> {
        let size = self.dtype.size();
        if self.data.extend_from(src, src_row * size, size) {
            Ok(())
        } else {
            Err(GraphError::AttrMismatch {
                name: "*".to_string(),
                detail: format!(
                    "expected {} data, found {}",
                    self.dtype.base(),
                    src.base_kind()
                ),
            })
        }
    }

    /// Removes a row, moving the last row into its slot.
    pub(crate) fn swap_remove_row(&mut self, row: usize) {
        let size = self.dtype.size();
        self.data.swap_remove_range(row * size, size);
    }

    /// Reads the given rows into a fresh buffer, in order.
    pub fn read_rows(&self, rows: &[usize]) -> Buffer {
        let size = self.dtype.size();
        let mut out = Buffer::new(self.dtype.base());
        for &row in rows {
            out.extend_from(&self.data, row * size, size);
        }
        out
    }

    /// Returns a copy of the whole column, rows in slot order.
    pub fn read_all(&self) -> Buffer {
        self.data.clone()
    }

    /// Overwrites the given rows with consecutive rows of `values`.
    pub(crate) fn write_rows(&mut self, rows: &[usize], values: &Buffer) -> Result<(), GraphError> {
        let size = self.dtype.size();
        if values.base_kind() != self.dtype.base() {
            return Err(GraphError::AttrMismatch {
                name: "*".to_string(),
                detail: format!(
                    "expected {} data, found {}",
                    self.dtype.base(),
                    values.base_kind()
                ),
            });
        }
        if values.len() != rows.len() * size {
            return Err(GraphError::LengthMismatch {
                expected: rows.len(),
                found: values.len() / size.max(1),
            });
        }
        for (i, &row) in rows.iter().enumerate() {
            self.data.copy_from(row * size, values, i * size, size);
        }
        Ok(())
    }

    /// Returns the typed scalars of one row, or `None` when `S` does not
    /// match the column's base kind or the row is out of bounds.
    pub fn row_slice<S: Element>(&self, row: usize) -> Option<&[S]> {
        let size = self.dtype.size();
        self.data.as_slice::<S>()?.get(row * size..(row + 1) * size)
    }
}

/// An ordered mapping from attribute name to dtype, frozen at construction.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct AttrSchema {
    entries: Vec<(String, DType)>,
    index: HashMap<String, usize>,
}

impl AttrSchema {
    /// Builds a schema from `(name, dtype string)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidAttrName`] when a name is not a valid
    /// identifier or is declared twice, and [`GraphError::MalformedDType`]
    /// when a dtype string does not parse.
    pub fn new(attrs: &[(&str, &str)]) -> Result<Self, GraphError> {
        let mut schema = AttrSchema::default();
        for &(name, dtype_str) in attrs {
            if !is_identifier(name) {
                return Err(GraphError::InvalidAttrName {
                    name: name.to_string(),
                });
            }
            if schema.index.contains_key(name) {
                return Err(GraphError::InvalidAttrName {
                    name: name.to_string(),
                });
            }
            let dtype = DType::parse(dtype_str)?;
            schema.index.insert(name.to_string(), schema.entries.len());
            schema.entries.push((name.to_string(), dtype));
        }
        Ok(schema)
    }

    /// Builds an empty schema.
    pub fn empty() -> Self {
        AttrSchema::default()
    }

    /// Returns the number of declared attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no attributes are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the declaration index of `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns the dtype declared for `name`.
    pub fn dtype_of(&self, name: &str) -> Option<&DType> {
        self.index_of(name).map(|i| &self.entries[i].1)
    }

    /// Returns the `(name, dtype)` pair at declaration index `i`.
    pub fn entry(&self, i: usize) -> (&str, &DType) {
        let (name, dtype) = &self.entries[i];
        (name.as_str(), dtype)
    }

    /// Iterates over `(name, dtype)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DType)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }
}

/// Returns true if `name` is a valid identifier: `[A-Za-z_][A-Za-z0-9_]*`.
fn is_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_typed_access() {
        let buffer = Buffer::from(vec![1u64, 2, 3]);
        assert_eq!(buffer.base_kind(), BaseKind::U64);
        assert_eq!(buffer.as_slice::<u64>(), Some(&[1u64, 2, 3][..]));
        assert_eq!(buffer.as_slice::<i64>(), None);
    }

    #[test]
    fn test_column_push_and_swap_remove() {
        let dtype = DType::parse("float64[2]").unwrap();
        let mut column = Column::new(dtype);
        let data = Buffer::from(vec![0.0f64, 0.1, 1.0, 1.1, 2.0, 2.1]);
        for row in 0..3 {
            column.push_row(&data, row).unwrap();
        }
        assert_eq!(column.rows(), 3);

        // Removing row 0 moves row 2 into its slot.
        column.swap_remove_row(0);
        assert_eq!(column.rows(), 2);
        assert_eq!(column.row_slice::<f64>(0), Some(&[2.0, 2.1][..]));
        assert_eq!(column.row_slice::<f64>(1), Some(&[1.0, 1.1][..]));
    }

    #[test]
    fn test_column_read_write_rows() {
        let dtype = DType::parse("int32").unwrap();
        let mut column = Column::new(dtype);
        let data = Buffer::from(vec![10i32, 20, 30]);
        for row in 0..3 {
            column.push_row(&data, row).unwrap();
        }

        column
            .write_rows(&[2, 0], &Buffer::from(vec![33i32, 11]))
            .unwrap();
        assert_eq!(
            column.read_rows(&[0, 1, 2]),
            Buffer::from(vec![11i32, 20, 33])
        );
    }

    #[test]
    fn test_column_kind_mismatch() {
        let mut column = Column::new(DType::parse("float32").unwrap());
        let data = Buffer::from(vec![1.0f64]);
        assert!(matches!(
            column.push_row(&data, 0),
            Err(GraphError::AttrMismatch { .. })
        ));
    }

    #[test]
    fn test_schema_lookup() {
        let schema = AttrSchema::new(&[("position", "double[3]"), ("score", "float32")]).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.index_of("score"), Some(1));
        assert_eq!(schema.dtype_of("position").unwrap().size(), 3);
        assert_eq!(schema.index_of("missing"), None);
    }

    #[test]
    fn test_schema_rejects_bad_names() {
        assert!(matches!(
            AttrSchema::new(&[("3Dposition", "double[4]")]),
            Err(GraphError::InvalidAttrName { .. })
        ));
        assert!(matches!(
            AttrSchema::new(&[("a", "int32"), ("a", "int32")]),
            Err(GraphError::InvalidAttrName { .. })
        ));
    }
}
