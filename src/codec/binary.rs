use crate::errors::DbError;
use crate::value::{Binary, Decimal128, ElementType, ObjectId, UtcDateTime};

use super::state::{FrameKind, Machine, State, malformed};
use super::{DocumentReader, DocumentWriter, ReaderSettings};

const MIN_DOCUMENT_SIZE: usize = 5;

/// Reads the binary layout from a byte slice.
pub struct BinaryReader<'a> {
    buf: &'a [u8],
    pos: usize,
    machine: Machine,
    settings: ReaderSettings,
}

impl<'a> BinaryReader<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_settings(buf, ReaderSettings::default())
    }

    #[must_use]
    pub fn with_settings(buf: &'a [u8], settings: ReaderSettings) -> Self {
        Self { buf, pos: 0, machine: Machine::new(settings.max_depth), settings }
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn limit(&self) -> usize {
        self.machine.top().map_or(self.buf.len(), |f| f.offset)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DbError> {
        let end = self.pos.checked_add(n).ok_or_else(|| malformed("length overflow"))?;
        if end > self.limit() {
            return Err(malformed(format!("truncated input: needed {n} bytes at offset {}", self.pos)));
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DbError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn raw_i32(&mut self) -> Result<i32, DbError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    fn raw_len(&mut self, what: &str) -> Result<usize, DbError> {
        let len = self.raw_i32()?;
        usize::try_from(len).map_err(|_| malformed(format!("negative {what} length {len}")))
    }

    fn raw_cstring(&mut self) -> Result<String, DbError> {
        let limit = self.limit();
        let rest = &self.buf[self.pos..limit];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| malformed(format!("unterminated name at offset {}", self.pos)))?;
        let text = std::str::from_utf8(&rest[..nul])
            .map_err(|e| malformed(format!("name is not UTF-8: {e}")))?
            .to_string();
        self.pos += nul + 1;
        Ok(text)
    }

    /// Length-prefixed document or array body; pushes a frame bounded by the prefix.
    fn enter(&mut self, op: &str, kind: FrameKind) -> Result<(), DbError> {
        let start = self.pos;
        let len = self.raw_len("document")?;
        if len < MIN_DOCUMENT_SIZE {
            return Err(malformed(format!("{op}: document length {len} is too small")));
        }
        if len > self.settings.max_document_size {
            return Err(malformed(format!(
                "{op}: document length {len} exceeds the limit of {}",
                self.settings.max_document_size
            )));
        }
        let end = start + len;
        if end > self.limit() {
            return Err(malformed(format!("{op}: document length {len} runs past the input")));
        }
        self.machine.push(kind, end)?;
        self.machine.state = State::Type;
        Ok(())
    }

    fn leave(&mut self, op: &str, kind: FrameKind) -> Result<(), DbError> {
        if self.machine.state == State::Type && self.read_element_type()?.is_some() {
            return Err(malformed(format!("{op} called with elements remaining")));
        }
        let expected = match kind {
            FrameKind::Document => State::EndOfDocument,
            FrameKind::Array => State::EndOfArray,
        };
        self.machine.check(op, &[expected])?;
        self.machine.pop(op, kind)?;
        self.machine.reader_value_done();
        Ok(())
    }

    fn value_bytes<const N: usize>(&mut self, op: &str, ty: ElementType) -> Result<[u8; N], DbError> {
        self.machine.check_value(op, ty)?;
        let bytes = self.take_array()?;
        self.machine.reader_value_done();
        Ok(bytes)
    }
}

impl DocumentReader for BinaryReader<'_> {
    fn state(&self) -> State {
        self.machine.state
    }

    fn current_type(&self) -> Option<ElementType> {
        self.machine.current_type
    }

    fn read_start_document(&mut self) -> Result<(), DbError> {
        match self.machine.state {
            State::Initial | State::Done if self.machine.depth() == 0 => self.enter("read_start_document", FrameKind::Document),
            _ => {
                self.machine.check_value("read_start_document", ElementType::Document)?;
                self.enter("read_start_document", FrameKind::Document)
            }
        }
    }

    fn read_end_document(&mut self) -> Result<(), DbError> {
        self.leave("read_end_document", FrameKind::Document)
    }

    fn read_start_array(&mut self) -> Result<(), DbError> {
        self.machine.check_value("read_start_array", ElementType::Array)?;
        self.enter("read_start_array", FrameKind::Array)
    }

    fn read_end_array(&mut self) -> Result<(), DbError> {
        self.leave("read_end_array", FrameKind::Array)
    }

    fn read_element_type(&mut self) -> Result<Option<ElementType>, DbError> {
        self.machine.check("read_element_type", &[State::Type])?;
        let [tag] = self.take_array::<1>()?;
        let kind = self.machine.top_kind().ok_or_else(|| malformed("no open document"))?;
        if tag == 0 {
            if self.pos != self.limit() {
                return Err(malformed(format!("terminator at offset {} before the declared end", self.pos - 1)));
            }
            self.machine.state = match kind {
                FrameKind::Document => State::EndOfDocument,
                FrameKind::Array => State::EndOfArray,
            };
            return Ok(None);
        }
        let ty = ElementType::from_tag(tag)
            .ok_or_else(|| malformed(format!("unknown element type 0x{tag:02X} at offset {}", self.pos - 1)))?;
        self.machine.current_type = Some(ty);
        match kind {
            FrameKind::Document => self.machine.state = State::Name,
            FrameKind::Array => {
                // Array keys carry no information beyond position.
                self.raw_cstring()?;
                self.machine.state = State::Value;
            }
        }
        Ok(Some(ty))
    }

    fn read_name(&mut self) -> Result<String, DbError> {
        if self.machine.state == State::Type && self.read_element_type()?.is_none() {
            return Err(malformed("read_name called at the end of the document"));
        }
        self.machine.check("read_name", &[State::Name])?;
        let name = self.raw_cstring()?;
        self.machine.state = State::Value;
        Ok(name)
    }

    fn read_double(&mut self) -> Result<f64, DbError> {
        Ok(f64::from_le_bytes(self.value_bytes("read_double", ElementType::Double)?))
    }

    fn read_string(&mut self) -> Result<String, DbError> {
        self.machine.check_value("read_string", ElementType::String)?;
        let len = self.raw_len("string")?;
        if len == 0 {
            return Err(malformed("string length must include the terminator"));
        }
        let bytes = self.take(len)?;
        let (text, nul) = bytes.split_at(len - 1);
        if nul != [0] {
            return Err(malformed("string is not NUL terminated"));
        }
        let text = std::str::from_utf8(text).map_err(|e| malformed(format!("string is not UTF-8: {e}")))?;
        self.machine.reader_value_done();
        Ok(text.to_string())
    }

    fn read_binary(&mut self) -> Result<Binary, DbError> {
        self.machine.check_value("read_binary", ElementType::Binary)?;
        let len = self.raw_len("binary")?;
        let [subtype] = self.take_array::<1>()?;
        let bytes = self.take(len)?.to_vec();
        self.machine.reader_value_done();
        Ok(Binary { subtype, bytes })
    }

    fn read_object_id(&mut self) -> Result<ObjectId, DbError> {
        Ok(ObjectId::from_bytes(self.value_bytes("read_object_id", ElementType::ObjectId)?))
    }

    fn read_boolean(&mut self) -> Result<bool, DbError> {
        let [b] = self.value_bytes("read_boolean", ElementType::Boolean)?;
        match b {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(malformed(format!("boolean byte must be 0 or 1, found {other}"))),
        }
    }

    fn read_date_time(&mut self) -> Result<UtcDateTime, DbError> {
        let bytes = self.value_bytes("read_date_time", ElementType::DateTime)?;
        Ok(UtcDateTime::from_millis(i64::from_le_bytes(bytes)))
    }

    fn read_null(&mut self) -> Result<(), DbError> {
        self.value_bytes::<0>("read_null", ElementType::Null).map(|_| ())
    }

    fn read_int32(&mut self) -> Result<i32, DbError> {
        Ok(i32::from_le_bytes(self.value_bytes("read_int32", ElementType::Int32)?))
    }

    fn read_int64(&mut self) -> Result<i64, DbError> {
        Ok(i64::from_le_bytes(self.value_bytes("read_int64", ElementType::Int64)?))
    }

    fn read_decimal128(&mut self) -> Result<Decimal128, DbError> {
        Ok(Decimal128::from_bytes(self.value_bytes("read_decimal128", ElementType::Decimal128)?))
    }

    fn skip_value(&mut self) -> Result<(), DbError> {
        self.machine.check("skip_value", &[State::Value])?;
        let ty = self.machine.current_type.ok_or_else(|| malformed("skip_value without an element type"))?;
        let n = match ty {
            ElementType::Double | ElementType::DateTime | ElementType::Int64 => 8,
            ElementType::Int32 => 4,
            ElementType::Boolean => 1,
            ElementType::Null => 0,
            ElementType::ObjectId => 12,
            ElementType::Decimal128 => 16,
            ElementType::String => self.raw_len("string")?,
            ElementType::Binary => self.raw_len("binary")? + 1,
            ElementType::Document | ElementType::Array => {
                let len = self.raw_len("document")?;
                len.checked_sub(4).ok_or_else(|| malformed(format!("document length {len} is too small")))?
            }
        };
        self.take(n)?;
        self.machine.reader_value_done();
        Ok(())
    }
}

/// Writes the binary layout into a growable buffer.
#[derive(Debug)]
pub struct BinaryWriter {
    buf: Vec<u8>,
    machine: Machine,
    pending_name: Option<String>,
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryWriter {
    #[must_use]
    pub fn new() -> Self {
        Self { buf: Vec::new(), machine: Machine::new(usize::MAX), pending_name: None }
    }

    /// The encoded bytes; only valid once the top-level document is closed.
    ///
    /// # Errors
    /// `MalformedStream` when a document is still open.
    pub fn into_bytes(self) -> Result<Vec<u8>, DbError> {
        self.machine.check("into_bytes", &[State::Done])?;
        Ok(self.buf)
    }

    fn element_header(&mut self, op: &str, ty: ElementType) -> Result<(), DbError> {
        self.machine.check(op, &[State::Value])?;
        let name = match self.machine.top() {
            Some(f) if f.kind == FrameKind::Array => f.index.to_string(),
            Some(_) => self.pending_name.take().ok_or_else(|| malformed(format!("{op} without a name")))?,
            None => return Err(malformed(format!("{op} outside of a document"))),
        };
        self.buf.push(ty.tag());
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.push(0);
        Ok(())
    }

    fn scalar(&mut self, op: &str, ty: ElementType, payload: &[u8]) -> Result<(), DbError> {
        self.element_header(op, ty)?;
        self.buf.extend_from_slice(payload);
        self.machine.writer_value_done();
        Ok(())
    }

    fn open(&mut self, kind: FrameKind) -> Result<(), DbError> {
        let at = self.buf.len();
        self.buf.extend_from_slice(&[0; 4]);
        self.machine.push(kind, at)?;
        self.machine.state = match kind {
            FrameKind::Document => State::Name,
            FrameKind::Array => State::Value,
        };
        Ok(())
    }

    fn close(&mut self, op: &str, kind: FrameKind) -> Result<(), DbError> {
        let frame = self.machine.pop(op, kind)?;
        self.buf.push(0);
        let len = i32::try_from(self.buf.len() - frame.offset)
            .map_err(|_| malformed(format!("{op}: document larger than 2 GiB")))?;
        self.buf[frame.offset..frame.offset + 4].copy_from_slice(&len.to_le_bytes());
        self.machine.writer_value_done();
        Ok(())
    }
}

impl DocumentWriter for BinaryWriter {
    fn state(&self) -> State {
        self.machine.state
    }

    fn write_start_document(&mut self) -> Result<(), DbError> {
        if self.machine.state == State::Initial {
            return self.open(FrameKind::Document);
        }
        self.element_header("write_start_document", ElementType::Document)?;
        self.open(FrameKind::Document)
    }

    fn write_end_document(&mut self) -> Result<(), DbError> {
        self.machine.check("write_end_document", &[State::Name])?;
        self.close("write_end_document", FrameKind::Document)
    }

    fn write_start_array(&mut self) -> Result<(), DbError> {
        self.element_header("write_start_array", ElementType::Array)?;
        self.open(FrameKind::Array)
    }

    fn write_end_array(&mut self) -> Result<(), DbError> {
        self.machine.check("write_end_array", &[State::Value])?;
        self.close("write_end_array", FrameKind::Array)
    }

    fn write_name(&mut self, name: &str) -> Result<(), DbError> {
        self.machine.check("write_name", &[State::Name])?;
        if name.contains('\0') {
            return Err(malformed(format!("element name {name:?} contains NUL")));
        }
        self.pending_name = Some(name.to_string());
        self.machine.state = State::Value;
        Ok(())
    }

    fn write_double(&mut self, v: f64) -> Result<(), DbError> {
        self.scalar("write_double", ElementType::Double, &v.to_le_bytes())
    }

    fn write_string(&mut self, v: &str) -> Result<(), DbError> {
        let len = i32::try_from(v.len() + 1).map_err(|_| malformed("string larger than 2 GiB"))?;
        let mut payload = Vec::with_capacity(v.len() + 5);
        payload.extend_from_slice(&len.to_le_bytes());
        payload.extend_from_slice(v.as_bytes());
        payload.push(0);
        self.scalar("write_string", ElementType::String, &payload)
    }

    fn write_binary(&mut self, v: &Binary) -> Result<(), DbError> {
        let len = i32::try_from(v.bytes.len()).map_err(|_| malformed("binary larger than 2 GiB"))?;
        let mut payload = Vec::with_capacity(v.bytes.len() + 5);
        payload.extend_from_slice(&len.to_le_bytes());
        payload.push(v.subtype);
        payload.extend_from_slice(&v.bytes);
        self.scalar("write_binary", ElementType::Binary, &payload)
    }

    fn write_object_id(&mut self, v: ObjectId) -> Result<(), DbError> {
        self.scalar("write_object_id", ElementType::ObjectId, &v.bytes())
    }

    fn write_boolean(&mut self, v: bool) -> Result<(), DbError> {
        self.scalar("write_boolean", ElementType::Boolean, &[u8::from(v)])
    }

    fn write_date_time(&mut self, v: UtcDateTime) -> Result<(), DbError> {
        self.scalar("write_date_time", ElementType::DateTime, &v.timestamp_millis().to_le_bytes())
    }

    fn write_null(&mut self) -> Result<(), DbError> {
        self.scalar("write_null", ElementType::Null, &[])
    }

    fn write_int32(&mut self, v: i32) -> Result<(), DbError> {
        self.scalar("write_int32", ElementType::Int32, &v.to_le_bytes())
    }

    fn write_int64(&mut self, v: i64) -> Result<(), DbError> {
        self.scalar("write_int64", ElementType::Int64, &v.to_le_bytes())
    }

    fn write_decimal128(&mut self, v: Decimal128) -> Result<(), DbError> {
        self.scalar("write_decimal128", ElementType::Decimal128, &v.bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_document, encode_document, read_document};
    use crate::doc;

    const SAMPLE: [u8; 12] = [0x0c, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0];

    #[test]
    fn step_by_step_read() {
        let mut r = BinaryReader::new(&SAMPLE);
        r.read_start_document().unwrap();
        assert_eq!(r.read_name().unwrap(), "a");
        assert_eq!(r.read_int32().unwrap(), 1);
        r.read_end_document().unwrap();
        assert_eq!(r.state(), State::Done);
    }

    #[test]
    fn reading_the_wrong_type_is_malformed() {
        let mut r = BinaryReader::new(&SAMPLE);
        r.read_start_document().unwrap();
        r.read_name().unwrap();
        assert!(matches!(r.read_string(), Err(DbError::MalformedStream(_))));
    }

    #[test]
    fn end_document_with_elements_left_is_malformed() {
        let mut r = BinaryReader::new(&SAMPLE);
        r.read_start_document().unwrap();
        assert!(r.read_end_document().is_err());
    }

    #[test]
    fn step_by_step_write_matches_sample() {
        let mut w = BinaryWriter::new();
        w.write_start_document().unwrap();
        w.write_name("a").unwrap();
        w.write_int32(1).unwrap();
        w.write_end_document().unwrap();
        assert_eq!(w.into_bytes().unwrap(), SAMPLE.to_vec());
    }

    #[test]
    fn writer_rejects_out_of_order_calls() {
        let mut w = BinaryWriter::new();
        assert!(w.write_int32(1).is_err());
        w.write_start_document().unwrap();
        assert!(w.write_int32(1).is_err());
        assert!(w.write_end_array().is_err());
        w.write_name("x").unwrap();
        assert!(w.write_name("y").is_err());
    }

    #[test]
    fn truncated_and_trailing_input() {
        assert!(decode_document(&SAMPLE[..11]).is_err());
        let mut extra = SAMPLE.to_vec();
        extra.push(0);
        assert!(decode_document(&extra).is_err());
    }

    #[test]
    fn unknown_tag_and_bad_boolean() {
        let mut bad_tag = SAMPLE;
        bad_tag[4] = 0x0B;
        assert!(matches!(decode_document(&bad_tag), Err(DbError::MalformedStream(_))));
        let bytes = encode_document(&doc! { "b": true }).unwrap();
        let mut bad_bool = bytes.clone();
        let pos = bad_bool.len() - 2;
        bad_bool[pos] = 2;
        assert!(decode_document(&bad_bool).is_err());
    }

    #[test]
    fn skip_value_skips_nested_content() {
        let bytes = encode_document(&doc! { "skip": { "x": [1, 2, "three"] }, "keep": "yes" }).unwrap();
        let mut r = BinaryReader::new(&bytes);
        r.read_start_document().unwrap();
        assert_eq!(r.read_name().unwrap(), "skip");
        r.skip_value().unwrap();
        assert_eq!(r.read_name().unwrap(), "keep");
        assert_eq!(r.read_string().unwrap(), "yes");
        r.read_end_document().unwrap();
    }

    #[test]
    fn duplicate_names_survive_decoding() {
        let mut d = doc! { "a": 1 };
        d.push("a", 2);
        let bytes = encode_document(&d).unwrap();
        let back = read_document(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back, d);
    }

    #[test]
    fn depth_limit_applies() {
        let deep = doc! { "a": { "b": { "c": 1 } } };
        let bytes = encode_document(&deep).unwrap();
        let settings = ReaderSettings { max_depth: 2, ..ReaderSettings::default() };
        assert!(crate::codec::decode_document_with(&bytes, settings).is_err());
    }
}
