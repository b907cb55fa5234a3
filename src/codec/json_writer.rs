use std::fmt::Write as _;

use crate::errors::DbError;
use crate::value::{Binary, Decimal128, ObjectId, UtcDateTime};

use super::DocumentWriter;
use super::state::{FrameKind, Machine, State, malformed};

/// Output options for [`JsonWriter`]. `indent: None` writes everything on one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonWriterSettings {
    pub indent: Option<String>,
}

impl JsonWriterSettings {
    #[must_use]
    pub fn indented() -> Self {
        Self { indent: Some("  ".to_string()) }
    }
}

/// Writes shell syntax: `{ "_id" : ObjectId("..."), "n" : NumberLong(5) }`.
#[derive(Debug)]
pub struct JsonWriter {
    out: String,
    machine: Machine,
    settings: JsonWriterSettings,
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(JsonWriterSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: JsonWriterSettings) -> Self {
        Self { out: String::new(), machine: Machine::new(usize::MAX), settings }
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.out
    }

    fn newline(&mut self, depth: usize) {
        if let Some(indent) = &self.settings.indent {
            self.out.push('\n');
            for _ in 0..depth {
                self.out.push_str(indent);
            }
        }
    }

    /// Separator before an array member; document members get theirs in `write_name`.
    fn before_value(&mut self, op: &str) -> Result<(), DbError> {
        match self.machine.state {
            State::Initial => Ok(()),
            State::Value => {
                if let Some(frame) = self.machine.top()
                    && frame.kind == FrameKind::Array
                    && frame.index > 0
                {
                    self.out.push_str(", ");
                }
                Ok(())
            }
            _ => self.machine.check(op, &[State::Value]),
        }
    }

    fn scalar(&mut self, op: &str, text: &str) -> Result<(), DbError> {
        self.before_value(op)?;
        self.out.push_str(text);
        self.machine.writer_value_done();
        Ok(())
    }

    fn open(&mut self, op: &str, kind: FrameKind) -> Result<(), DbError> {
        self.before_value(op)?;
        self.out.push(if kind == FrameKind::Document { '{' } else { '[' });
        self.machine.push(kind, 0)?;
        self.machine.state = if kind == FrameKind::Document { State::Name } else { State::Value };
        Ok(())
    }

    fn close(&mut self, op: &str, kind: FrameKind) -> Result<(), DbError> {
        let frame = self.machine.pop(op, kind)?;
        match kind {
            FrameKind::Document if self.settings.indent.is_some() && frame.index > 0 => {
                self.newline(self.machine.depth());
                self.out.push('}');
            }
            FrameKind::Document => self.out.push_str(" }"),
            FrameKind::Array => self.out.push(']'),
        }
        self.machine.writer_value_done();
        Ok(())
    }
}

pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if u32::from(c) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn format_double(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else {
        // Debug keeps a fractional part on integral values so the reader types them as Double.
        format!("{v:?}")
    }
}

impl DocumentWriter for JsonWriter {
    fn state(&self) -> State {
        self.machine.state
    }

    fn write_start_document(&mut self) -> Result<(), DbError> {
        self.open("write_start_document", FrameKind::Document)
    }

    fn write_end_document(&mut self) -> Result<(), DbError> {
        self.machine.check("write_end_document", &[State::Name])?;
        self.close("write_end_document", FrameKind::Document)
    }

    fn write_start_array(&mut self) -> Result<(), DbError> {
        self.open("write_start_array", FrameKind::Array)
    }

    fn write_end_array(&mut self) -> Result<(), DbError> {
        self.machine.check("write_end_array", &[State::Value])?;
        self.close("write_end_array", FrameKind::Array)
    }

    fn write_name(&mut self, name: &str) -> Result<(), DbError> {
        self.machine.check("write_name", &[State::Name])?;
        let (index, depth) = match self.machine.top() {
            Some(f) => (f.index, self.machine.depth()),
            None => return Err(malformed("write_name outside of a document")),
        };
        if index > 0 {
            self.out.push(',');
        }
        if self.settings.indent.is_some() {
            self.newline(depth);
        } else {
            self.out.push(' ');
        }
        self.out.push_str(&quote(name));
        self.out.push_str(" : ");
        self.machine.state = State::Value;
        Ok(())
    }

    fn write_double(&mut self, v: f64) -> Result<(), DbError> {
        self.scalar("write_double", &format_double(v))
    }

    fn write_string(&mut self, v: &str) -> Result<(), DbError> {
        self.scalar("write_string", &quote(v))
    }

    fn write_binary(&mut self, v: &Binary) -> Result<(), DbError> {
        self.scalar("write_binary", &format!("HexData({}, \"{}\")", v.subtype, hex::encode(&v.bytes)))
    }

    fn write_object_id(&mut self, v: ObjectId) -> Result<(), DbError> {
        self.scalar("write_object_id", &format!("ObjectId(\"{}\")", v.to_hex()))
    }

    fn write_boolean(&mut self, v: bool) -> Result<(), DbError> {
        self.scalar("write_boolean", if v { "true" } else { "false" })
    }

    fn write_date_time(&mut self, v: UtcDateTime) -> Result<(), DbError> {
        let text = match v.to_rfc3339() {
            Some(iso) => format!("ISODate(\"{iso}\")"),
            None => format!("{{ \"$date\" : {{ \"$numberLong\" : \"{}\" }} }}", v.timestamp_millis()),
        };
        self.scalar("write_date_time", &text)
    }

    fn write_null(&mut self) -> Result<(), DbError> {
        self.scalar("write_null", "null")
    }

    fn write_int32(&mut self, v: i32) -> Result<(), DbError> {
        self.scalar("write_int32", &v.to_string())
    }

    fn write_int64(&mut self, v: i64) -> Result<(), DbError> {
        self.scalar("write_int64", &format!("NumberLong({v})"))
    }

    fn write_decimal128(&mut self, v: Decimal128) -> Result<(), DbError> {
        self.scalar("write_decimal128", &format!("NumberDecimal(\"{v}\")"))
    }
}
