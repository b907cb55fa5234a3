//! The value model: every kind of value a document can hold.

pub(crate) mod convert;
mod datetime;
mod decimal;
mod document;
mod macros;
mod object_id;

use std::fmt;

pub use convert::{from_value, to_value};
pub use datetime::UtcDateTime;
pub use decimal::Decimal128;
pub use document::Document;
pub use object_id::ObjectId;

/// Binary payload with its one-byte subtype (`0x00` generic, `0x04` UUID, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    pub subtype: u8,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal128(Decimal128),
    String(String),
    DateTime(UtcDateTime),
    Binary(Binary),
    ObjectId(ObjectId),
    Array(Vec<Value>),
    Document(Document),
}

/// Element type tags of the binary layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    Double = 0x01,
    String = 0x02,
    Document = 0x03,
    Array = 0x04,
    Binary = 0x05,
    ObjectId = 0x07,
    Boolean = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    Int32 = 0x10,
    Int64 = 0x12,
    Decimal128 = 0x13,
}

impl ElementType {
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0x01 => Self::Double,
            0x02 => Self::String,
            0x03 => Self::Document,
            0x04 => Self::Array,
            0x05 => Self::Binary,
            0x07 => Self::ObjectId,
            0x08 => Self::Boolean,
            0x09 => Self::DateTime,
            0x0A => Self::Null,
            0x10 => Self::Int32,
            0x12 => Self::Int64,
            0x13 => Self::Decimal128,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Double => "Double",
            Self::String => "String",
            Self::Document => "Document",
            Self::Array => "Array",
            Self::Binary => "Binary",
            Self::ObjectId => "ObjectId",
            Self::Boolean => "Boolean",
            Self::DateTime => "DateTime",
            Self::Null => "Null",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Decimal128 => "Decimal128",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        match self {
            Self::Null => ElementType::Null,
            Self::Boolean(_) => ElementType::Boolean,
            Self::Int32(_) => ElementType::Int32,
            Self::Int64(_) => ElementType::Int64,
            Self::Double(_) => ElementType::Double,
            Self::Decimal128(_) => ElementType::Decimal128,
            Self::String(_) => ElementType::String,
            Self::DateTime(_) => ElementType::DateTime,
            Self::Binary(_) => ElementType::Binary,
            Self::ObjectId(_) => ElementType::ObjectId,
            Self::Array(_) => ElementType::Array,
            Self::Document(_) => ElementType::Document,
        }
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.element_type().name()
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int32(_) | Self::Int64(_) | Self::Double(_) | Self::Decimal128(_))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int32(i) => Some(*i),
            _ => None,
        }
    }

    /// Int32 widens; other kinds yield `None`.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int32(i) => Some(*i as i64),
            Self::Int64(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(f) => Some(*f),
            Self::Int32(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(d) => Some(d),
            _ => None,
        }
    }

    pub const fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Self::Document(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Self::ObjectId(o) => Some(*o),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_decimal128(&self) -> Option<Decimal128> {
        match self {
            Self::Decimal128(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_datetime(&self) -> Option<UtcDateTime> {
        match self {
            Self::DateTime(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::value_to_json_string(self))
    }
}
