//! Tagged, type-erased value passed across the backend boundary.
//!
//! A [`Cell`] holds exactly one payload together with a small-integer tag
//! ([`TypeId`]). Backends dispatch on the tag, client code downcasts with
//! [`Cell::cast`], and a mismatch is reported as [`CoreError::Cast`] at the
//! cast site instead of reinterpreting the payload.

use crate::error::{CoreError, CoreResult};
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;

/// Discriminant identifying the live payload of a [`Cell`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TypeId {
    String = 0,
    Null = 1,
    Int64 = 2,
    Uint64 = 3,
    Double = 4,
    Float = 5,
    Boolean = 6,
    Blob = 7,
    BlobInput = 8,
}

impl TypeId {
    /// All tags, in discriminant order
    pub const ALL: [TypeId; 9] = [
        TypeId::String,
        TypeId::Null,
        TypeId::Int64,
        TypeId::Uint64,
        TypeId::Double,
        TypeId::Float,
        TypeId::Boolean,
        TypeId::Blob,
        TypeId::BlobInput,
    ];

    /// The raw small-integer tag
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Convert a raw tag back into a `TypeId`
    pub fn from_u8(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Lowercase name used in messages
    pub fn name(self) -> &'static str {
        match self {
            TypeId::String => "string",
            TypeId::Null => "null",
            TypeId::Int64 => "int64",
            TypeId::Uint64 => "uint64",
            TypeId::Double => "double",
            TypeId::Float => "float",
            TypeId::Boolean => "boolean",
            TypeId::Blob => "blob",
            TypeId::BlobInput => "blob_input",
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference-counted, immutable blob payload
///
/// Cloning a blob shares the underlying buffer.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Blob(Bytes);

impl Blob {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.0.len())
    }
}

/// Blob supplied by the caller as a byte stream.
///
/// The stream is drained into one contiguous buffer when the input is
/// created, because native client libraries need the full length up front.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BlobInput(Bytes);

impl BlobInput {
    /// Read `reader` to the end and keep the bytes
    pub fn from_reader<R: Read>(mut reader: R) -> CoreResult<Self> {
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .map_err(CoreError::BlobRead)?;
        Ok(Self(Bytes::from(buffer)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for BlobInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobInput({} bytes)", self.0.len())
    }
}

/// A single tagged value: a query parameter or a result column
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    /// Untyped NULL
    #[default]
    Null,
    /// NULL carrying an explicit type tag
    TypedNull(TypeId),
    String(String),
    Int64(i64),
    Uint64(u64),
    Double(f64),
    Float(f32),
    Boolean(bool),
    Blob(Blob),
    BlobInput(BlobInput),
}

impl Cell {
    /// Build a NULL that reports `tag` from [`Cell::type_id`].
    ///
    /// Lets a backend bind a typed NULL where the engine needs the column
    /// type, while [`Cell::is_null`] still reports true.
    pub fn typed_null(tag: TypeId) -> Self {
        match tag {
            TypeId::Null => Cell::Null,
            other => Cell::TypedNull(other),
        }
    }

    /// Drain `reader` into a [`Cell::BlobInput`]
    pub fn blob_input<R: Read>(reader: R) -> CoreResult<Self> {
        Ok(Cell::BlobInput(BlobInput::from_reader(reader)?))
    }

    /// The tag used for dispatch
    pub fn type_id(&self) -> TypeId {
        match self {
            Cell::Null => TypeId::Null,
            Cell::TypedNull(tag) => *tag,
            Cell::String(_) => TypeId::String,
            Cell::Int64(_) => TypeId::Int64,
            Cell::Uint64(_) => TypeId::Uint64,
            Cell::Double(_) => TypeId::Double,
            Cell::Float(_) => TypeId::Float,
            Cell::Boolean(_) => TypeId::Boolean,
            Cell::Blob(_) => TypeId::Blob,
            Cell::BlobInput(_) => TypeId::BlobInput,
        }
    }

    /// Tag of the live payload; typed NULLs report [`TypeId::Null`]
    fn payload_type(&self) -> TypeId {
        match self {
            Cell::TypedNull(_) => TypeId::Null,
            other => other.type_id(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null | Cell::TypedNull(_))
    }

    /// Borrow the payload as `T`, failing when the tag does not match
    pub fn cast<T: CellValue>(&self) -> CoreResult<&T> {
        T::from_cell(self).ok_or(CoreError::Cast {
            expected: T::TYPE_ID,
            actual: self.payload_type(),
        })
    }

    /// Take the payload as `T`, failing when the tag does not match
    pub fn into_value<T: CellValue>(self) -> CoreResult<T> {
        let actual = self.payload_type();
        T::from_owned(self).map_err(|_| CoreError::Cast {
            expected: T::TYPE_ID,
            actual,
        })
    }

    /// Blob bytes for either blob flavour
    pub fn blob_bytes(&self) -> Option<&Bytes> {
        match self {
            Cell::Blob(blob) => Some(blob.bytes()),
            Cell::BlobInput(input) => Some(input.bytes()),
            _ => None,
        }
    }

    /// Render as JSON. Blobs become base64 strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Cell::Null | Cell::TypedNull(_) => Value::Null,
            Cell::String(s) => Value::String(s.clone()),
            Cell::Int64(n) => Value::from(*n),
            Cell::Uint64(n) => Value::from(*n),
            Cell::Double(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Cell::Float(f) => {
                serde_json::Number::from_f64(f64::from(*f)).map_or(Value::Null, Value::Number)
            }
            Cell::Boolean(b) => Value::Bool(*b),
            Cell::Blob(blob) => Value::String(encode_base64(blob.as_bytes())),
            Cell::BlobInput(input) => Value::String(encode_base64(input.as_bytes())),
        }
    }
}

fn encode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null | Cell::TypedNull(_) => f.write_str("NULL"),
            Cell::String(s) => f.write_str(s),
            Cell::Int64(n) => write!(f, "{n}"),
            Cell::Uint64(n) => write!(f, "{n}"),
            Cell::Double(v) => write!(f, "{v}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Boolean(b) => write!(f, "{b}"),
            Cell::Blob(blob) => write!(f, "<blob {} bytes>", blob.len()),
            Cell::BlobInput(input) => write!(f, "<blob {} bytes>", input.len()),
        }
    }
}

/// Payload types a [`Cell`] can be downcast to
pub trait CellValue: Sized {
    /// Tag carried by cells holding this type
    const TYPE_ID: TypeId;

    /// Borrow the payload when the tag matches
    fn from_cell(cell: &Cell) -> Option<&Self>;

    /// Take the payload when the tag matches, returning the cell otherwise
    fn from_owned(cell: Cell) -> Result<Self, Cell>;
}

macro_rules! cell_value {
    ($ty:ty, $variant:ident) => {
        impl CellValue for $ty {
            const TYPE_ID: TypeId = TypeId::$variant;

            fn from_cell(cell: &Cell) -> Option<&Self> {
                match cell {
                    Cell::$variant(value) => Some(value),
                    _ => None,
                }
            }

            fn from_owned(cell: Cell) -> Result<Self, Cell> {
                match cell {
                    Cell::$variant(value) => Ok(value),
                    other => Err(other),
                }
            }
        }

        impl From<$ty> for Cell {
            fn from(value: $ty) -> Self {
                Cell::$variant(value)
            }
        }
    };
}

cell_value!(String, String);
cell_value!(i64, Int64);
cell_value!(u64, Uint64);
cell_value!(f64, Double);
cell_value!(f32, Float);
cell_value!(bool, Boolean);
cell_value!(Blob, Blob);
cell_value!(BlobInput, BlobInput);

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::String(value.to_string())
    }
}

impl From<&String> for Cell {
    fn from(value: &String) -> Self {
        Cell::String(value.clone())
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Int64(i64::from(value))
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Uint64(u64::from(value))
    }
}

impl From<Bytes> for Cell {
    fn from(value: Bytes) -> Self {
        Cell::Blob(Blob(value))
    }
}

impl From<Vec<u8>> for Cell {
    fn from(value: Vec<u8>) -> Self {
        Cell::Blob(Blob(Bytes::from(value)))
    }
}

impl From<&[u8]> for Cell {
    fn from(value: &[u8]) -> Self {
        Cell::Blob(Blob(Bytes::copy_from_slice(value)))
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Null, Into::into)
    }
}

#[cfg(test)]
#[path = "cell_test.rs"]
mod tests;
