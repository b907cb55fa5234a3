//! Binary and textual encodings behind one streaming reader/writer contract.

mod binary;
mod json;
mod json_writer;
pub mod state;
mod stream;

use crate::errors::DbError;
use crate::value::{Binary, Decimal128, Document, ElementType, ObjectId, UtcDateTime, Value};

pub use binary::{BinaryReader, BinaryWriter};
pub use json::JsonReader;
pub use json_writer::{JsonWriter, JsonWriterSettings};
pub use state::{FrameKind, State};
pub use stream::DocumentStream;

pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Limits applied by every reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderSettings {
    pub max_document_size: usize,
    pub max_depth: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self { max_document_size: DEFAULT_MAX_DOCUMENT_SIZE, max_depth: DEFAULT_MAX_DEPTH }
    }
}

/// Pull-style reader. Call order follows [`State`]; any out-of-order call, a typed read that
/// does not match the element type, and truncated input fail with `MalformedStream`.
pub trait DocumentReader {
    fn state(&self) -> State;

    /// Type of the element whose value is next, once it has been read.
    fn current_type(&self) -> Option<ElementType>;

    fn read_start_document(&mut self) -> Result<(), DbError>;
    fn read_end_document(&mut self) -> Result<(), DbError>;
    fn read_start_array(&mut self) -> Result<(), DbError>;
    fn read_end_array(&mut self) -> Result<(), DbError>;

    /// Next element type, or `None` at the end of the enclosing document or array.
    fn read_element_type(&mut self) -> Result<Option<ElementType>, DbError>;

    /// Name of the next element; reads the element type first when it is still pending.
    fn read_name(&mut self) -> Result<String, DbError>;

    fn read_double(&mut self) -> Result<f64, DbError>;
    fn read_string(&mut self) -> Result<String, DbError>;
    fn read_binary(&mut self) -> Result<Binary, DbError>;
    fn read_object_id(&mut self) -> Result<ObjectId, DbError>;
    fn read_boolean(&mut self) -> Result<bool, DbError>;
    fn read_date_time(&mut self) -> Result<UtcDateTime, DbError>;
    fn read_null(&mut self) -> Result<(), DbError>;
    fn read_int32(&mut self) -> Result<i32, DbError>;
    fn read_int64(&mut self) -> Result<i64, DbError>;
    fn read_decimal128(&mut self) -> Result<Decimal128, DbError>;

    /// Skips the current value, nested content included.
    fn skip_value(&mut self) -> Result<(), DbError>;

    /// Reads the current value, whatever its type.
    fn read_value(&mut self) -> Result<Value, DbError> {
        let Some(ty) = self.current_type() else {
            return Err(state::malformed("read_value called before the element type was read"));
        };
        Ok(match ty {
            ElementType::Double => Value::Double(self.read_double()?),
            ElementType::String => Value::String(self.read_string()?),
            ElementType::Document => Value::Document(read_document(self)?),
            ElementType::Array => {
                self.read_start_array()?;
                let mut items = Vec::new();
                while self.read_element_type()?.is_some() {
                    items.push(self.read_value()?);
                }
                self.read_end_array()?;
                Value::Array(items)
            }
            ElementType::Binary => Value::Binary(self.read_binary()?),
            ElementType::ObjectId => Value::ObjectId(self.read_object_id()?),
            ElementType::Boolean => Value::Boolean(self.read_boolean()?),
            ElementType::DateTime => Value::DateTime(self.read_date_time()?),
            ElementType::Null => {
                self.read_null()?;
                Value::Null
            }
            ElementType::Int32 => Value::Int32(self.read_int32()?),
            ElementType::Int64 => Value::Int64(self.read_int64()?),
            ElementType::Decimal128 => Value::Decimal128(self.read_decimal128()?),
        })
    }
}

/// Push-style writer, the mirror of [`DocumentReader`].
pub trait DocumentWriter {
    fn state(&self) -> State;

    fn write_start_document(&mut self) -> Result<(), DbError>;
    fn write_end_document(&mut self) -> Result<(), DbError>;
    fn write_start_array(&mut self) -> Result<(), DbError>;
    fn write_end_array(&mut self) -> Result<(), DbError>;
    fn write_name(&mut self, name: &str) -> Result<(), DbError>;

    fn write_double(&mut self, v: f64) -> Result<(), DbError>;
    fn write_string(&mut self, v: &str) -> Result<(), DbError>;
    fn write_binary(&mut self, v: &Binary) -> Result<(), DbError>;
    fn write_object_id(&mut self, v: ObjectId) -> Result<(), DbError>;
    fn write_boolean(&mut self, v: bool) -> Result<(), DbError>;
    fn write_date_time(&mut self, v: UtcDateTime) -> Result<(), DbError>;
    fn write_null(&mut self) -> Result<(), DbError>;
    fn write_int32(&mut self, v: i32) -> Result<(), DbError>;
    fn write_int64(&mut self, v: i64) -> Result<(), DbError>;
    fn write_decimal128(&mut self, v: Decimal128) -> Result<(), DbError>;

    fn write_value(&mut self, value: &Value) -> Result<(), DbError> {
        match value {
            Value::Null => self.write_null(),
            Value::Boolean(b) => self.write_boolean(*b),
            Value::Int32(i) => self.write_int32(*i),
            Value::Int64(i) => self.write_int64(*i),
            Value::Double(f) => self.write_double(*f),
            Value::Decimal128(d) => self.write_decimal128(*d),
            Value::String(s) => self.write_string(s),
            Value::DateTime(d) => self.write_date_time(*d),
            Value::Binary(b) => self.write_binary(b),
            Value::ObjectId(o) => self.write_object_id(*o),
            Value::Array(items) => {
                self.write_start_array()?;
                for item in items {
                    self.write_value(item)?;
                }
                self.write_end_array()
            }
            Value::Document(d) => write_document(self, d),
        }
    }
}

/// Reads one whole document. On error nothing is returned; the reader is left mid-stream.
///
/// # Errors
/// `MalformedStream` for any structural or type violation.
pub fn read_document<R: DocumentReader + ?Sized>(reader: &mut R) -> Result<Document, DbError> {
    reader.read_start_document()?;
    let mut doc = Document::new();
    while reader.read_element_type()?.is_some() {
        let name = reader.read_name()?;
        let value = reader.read_value()?;
        doc.push(name, value);
    }
    reader.read_end_document()?;
    Ok(doc)
}

/// # Errors
/// Propagates writer state errors.
pub fn write_document<W: DocumentWriter + ?Sized>(writer: &mut W, doc: &Document) -> Result<(), DbError> {
    writer.write_start_document()?;
    for (name, value) in doc {
        writer.write_name(name)?;
        writer.write_value(value)?;
    }
    writer.write_end_document()
}

/// Encodes a document to its binary form.
///
/// # Errors
/// `MalformedStream` when an element name contains NUL.
pub fn encode_document(doc: &Document) -> Result<Vec<u8>, DbError> {
    let mut writer = BinaryWriter::new();
    write_document(&mut writer, doc)?;
    writer.into_bytes()
}

/// Decodes exactly one binary document; trailing bytes are an error.
///
/// # Errors
/// `MalformedStream` for truncated, oversized or structurally invalid input.
pub fn decode_document(bytes: &[u8]) -> Result<Document, DbError> {
    decode_document_with(bytes, ReaderSettings::default())
}

/// # Errors
/// As [`decode_document`], with explicit limits.
pub fn decode_document_with(bytes: &[u8], settings: ReaderSettings) -> Result<Document, DbError> {
    let mut reader = BinaryReader::with_settings(bytes, settings);
    let doc = read_document(&mut reader)?;
    if !reader.is_at_end() {
        return Err(state::malformed(format!(
            "{} trailing bytes after the document",
            bytes.len() - reader.position()
        )));
    }
    Ok(doc)
}

/// Parses one document in the lenient textual form; only whitespace may follow it.
///
/// # Errors
/// `MalformedStream` for invalid text.
pub fn parse_json(text: &str) -> Result<Document, DbError> {
    parse_json_with(text, ReaderSettings::default())
}

/// # Errors
/// As [`parse_json`], with explicit limits.
pub fn parse_json_with(text: &str, settings: ReaderSettings) -> Result<Document, DbError> {
    let mut reader = JsonReader::with_settings(text, settings);
    let doc = read_document(&mut reader)?;
    if !reader.is_at_end()? {
        return Err(state::malformed("unexpected text after the document"));
    }
    Ok(doc)
}

/// Parses a top-level array of documents, or one or more documents separated by whitespace.
///
/// # Errors
/// `MalformedStream` for invalid text or array members that are not documents.
pub fn parse_json_documents(text: &str, settings: ReaderSettings) -> Result<Vec<Document>, DbError> {
    let mut reader = JsonReader::with_settings(text, settings);
    let mut docs = Vec::new();
    if reader.peek_is_array()? {
        reader.read_start_array()?;
        while let Some(ty) = reader.read_element_type()? {
            if ty != ElementType::Document {
                return Err(state::malformed(format!("array member {} is a {ty}, not a Document", docs.len())));
            }
            docs.push(read_document(&mut reader)?);
        }
        reader.read_end_array()?;
    } else {
        while !reader.is_at_end()? {
            docs.push(read_document(&mut reader)?);
        }
    }
    if !reader.is_at_end()? {
        return Err(state::malformed("unexpected text after the documents"));
    }
    Ok(docs)
}

/// Parses a single value in the textual form, e.g. a pipeline array.
///
/// # Errors
/// `MalformedStream` for invalid text.
pub fn parse_json_value(text: &str) -> Result<Value, DbError> {
    let mut reader = JsonReader::new(text);
    let value = reader.read_top_level_value()?;
    if !reader.is_at_end()? {
        return Err(state::malformed("unexpected text after the value"));
    }
    Ok(value)
}

/// Shell-syntax text of a document, on one line.
#[must_use]
pub fn to_json_string(doc: &Document) -> String {
    to_json_string_with(doc, &JsonWriterSettings::default())
}

#[must_use]
pub fn to_json_string_with(doc: &Document, settings: &JsonWriterSettings) -> String {
    let mut writer = JsonWriter::with_settings(settings.clone());
    match write_document(&mut writer, doc) {
        Ok(()) => writer.into_string(),
        Err(e) => format!("<{e}>"),
    }
}

#[must_use]
pub fn value_to_json_string(value: &Value) -> String {
    let mut writer = JsonWriter::new();
    match writer.write_value(value) {
        Ok(()) => writer.into_string(),
        Err(e) => format!("<{e}>"),
    }
}
