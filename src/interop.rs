//! Conversions to and from the `bson` crate's types.
//!
//! Only the element kinds both models share convert; `bson`-only kinds such as regular
//! expressions, timestamps or min/max keys fail with `UnsupportedValueType`.

use bson::spec::BinarySubtype;
use bson::{Bson, Document as BsonDocument};

use crate::errors::DbError;
use crate::value::{Binary, Decimal128, Document, ObjectId, UtcDateTime, Value};

impl From<&Value> for Bson {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Boolean(b) => Self::Boolean(*b),
            Value::Int32(i) => Self::Int32(*i),
            Value::Int64(i) => Self::Int64(*i),
            Value::Double(f) => Self::Double(*f),
            Value::Decimal128(d) => Self::Decimal128(bson::Decimal128::from_bytes(d.bytes())),
            Value::String(s) => Self::String(s.clone()),
            Value::DateTime(d) => Self::DateTime(bson::DateTime::from_millis(d.timestamp_millis())),
            Value::Binary(b) => Self::Binary(bson::Binary {
                subtype: BinarySubtype::from(b.subtype),
                bytes: b.bytes.clone(),
            }),
            Value::ObjectId(o) => Self::ObjectId(bson::oid::ObjectId::from_bytes(o.bytes())),
            Value::Array(items) => Self::Array(items.iter().map(Self::from).collect()),
            Value::Document(d) => Self::Document(BsonDocument::from(d)),
        }
    }
}

impl From<&Document> for BsonDocument {
    fn from(doc: &Document) -> Self {
        let mut out = Self::new();
        for (k, v) in doc {
            out.insert(k, Bson::from(v));
        }
        out
    }
}

impl TryFrom<&Bson> for Value {
    type Error = DbError;

    fn try_from(value: &Bson) -> Result<Self, Self::Error> {
        Ok(match value {
            Bson::Null => Self::Null,
            Bson::Boolean(b) => Self::Boolean(*b),
            Bson::Int32(i) => Self::Int32(*i),
            Bson::Int64(i) => Self::Int64(*i),
            Bson::Double(f) => Self::Double(*f),
            Bson::Decimal128(d) => Self::Decimal128(Decimal128::from_bytes(d.bytes())),
            Bson::String(s) => Self::String(s.clone()),
            Bson::DateTime(d) => Self::DateTime(UtcDateTime::from_millis(d.timestamp_millis())),
            Bson::Binary(b) => Self::Binary(Binary { subtype: u8::from(b.subtype), bytes: b.bytes.clone() }),
            Bson::ObjectId(o) => Self::ObjectId(ObjectId::from_bytes(o.bytes())),
            Bson::Array(items) => Self::Array(items.iter().map(Self::try_from).collect::<Result<_, _>>()?),
            Bson::Document(d) => Self::Document(Document::try_from(d)?),
            other => {
                return Err(DbError::UnsupportedValueType(format!(
                    "bson element type {:?} has no counterpart",
                    other.element_type()
                )));
            }
        })
    }
}

impl TryFrom<&BsonDocument> for Document {
    type Error = DbError;

    fn try_from(doc: &BsonDocument) -> Result<Self, Self::Error> {
        let mut out = Self::with_capacity(doc.len());
        for (k, v) in doc {
            out.push(k.as_str(), Value::try_from(v)?);
        }
        Ok(out)
    }
}

/// Encodes `doc` with the `bson` crate. Used to cross-check [`crate::codec::encode_document`].
///
/// # Errors
/// `Bson` when the reference encoder rejects the document.
pub fn encode_with_bson(doc: &Document) -> Result<Vec<u8>, DbError> {
    Ok(BsonDocument::from(doc).to_vec()?)
}

/// Decodes `bytes` with the `bson` crate and converts the result.
///
/// # Errors
/// `Bson` for malformed input, `UnsupportedValueType` for kinds with no counterpart.
pub fn decode_with_bson(bytes: &[u8]) -> Result<Document, DbError> {
    let doc = BsonDocument::from_reader(bytes)?;
    Document::try_from(&doc)
}
