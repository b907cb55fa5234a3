//! Lenient textual reader: shell syntax and extended JSON wrappers.

use crate::errors::DbError;
use crate::value::convert::{parse_double, wrapped_scalar};
use crate::value::{Binary, Decimal128, ElementType, ObjectId, UtcDateTime, Value};

use super::state::{FrameKind, Machine, State, malformed};
use super::{DocumentReader, ReaderSettings};

const WRAPPER_KEYS: [&str; 6] = ["$oid", "$numberInt", "$numberLong", "$numberDouble", "$numberDecimal", "$date"];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    LParen,
    RParen,
    Colon,
    Comma,
    Str(String),
    Number(String),
    Ident(String),
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::BeginObject => "'{'".into(),
            Self::EndObject => "'}'".into(),
            Self::BeginArray => "'['".into(),
            Self::EndArray => "']'".into(),
            Self::LParen => "'('".into(),
            Self::RParen => "')'".into(),
            Self::Colon => "':'".into(),
            Self::Comma => "','".into(),
            Self::Str(s) => format!("string {s:?}"),
            Self::Number(n) => format!("number {n}"),
            Self::Ident(i) => format!("identifier {i}"),
            Self::Eof => "end of input".into(),
        }
    }
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    const fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    const fn mark(&self) -> usize {
        self.pos
    }

    fn reset(&mut self, mark: usize) {
        self.pos = mark;
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start_matches([' ', '\t', '\n', '\r']).len();
    }

    fn peek(&mut self) -> Result<Token, DbError> {
        let mark = self.mark();
        let tok = self.next_token();
        self.reset(mark);
        tok
    }

    fn next_token(&mut self) -> Result<Token, DbError> {
        self.skip_whitespace();
        let Some(c) = self.rest().chars().next() else {
            return Ok(Token::Eof);
        };
        let single = match c {
            '{' => Some(Token::BeginObject),
            '}' => Some(Token::EndObject),
            '[' => Some(Token::BeginArray),
            ']' => Some(Token::EndArray),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(tok) = single {
            self.pos += 1;
            return Ok(tok);
        }
        match c {
            '"' | '\'' => self.string(c),
            '-' | '0'..='9' => Ok(self.number()),
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => Ok(self.ident()),
            other => Err(malformed(format!("unexpected character {other:?} at offset {}", self.pos))),
        }
    }

    fn ident(&mut self) -> Token {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(rest.len());
        self.pos += len;
        Token::Ident(rest[..len].to_string())
    }

    fn number(&mut self) -> Token {
        let rest = self.rest();
        if rest.starts_with("-Infinity") {
            self.pos += "-Infinity".len();
            return Token::Number("-Infinity".into());
        }
        let mut prev = None;
        let len = rest
            .char_indices()
            .find(|&(i, c)| {
                let sign_allowed = i == 0 || matches!(prev, Some('e' | 'E'));
                prev = Some(c);
                !(c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || (matches!(c, '-' | '+') && sign_allowed))
            })
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        Token::Number(rest[..len].to_string())
    }

    fn string(&mut self, quote: char) -> Result<Token, DbError> {
        let start = self.pos;
        let mut out = String::new();
        let mut chars = self.rest().char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                c if c == quote => {
                    self.pos += i + c.len_utf8();
                    return Ok(Token::Str(out));
                }
                '\\' => {
                    let (_, esc) = chars.next().ok_or_else(|| malformed("unterminated escape"))?;
                    match esc {
                        '"' | '\'' | '\\' | '/' => out.push(esc),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'u' => {
                            let hi = Self::hex4(&mut chars)?;
                            let code = if (0xD800..0xDC00).contains(&hi) {
                                match (chars.next(), chars.next()) {
                                    (Some((_, '\\')), Some((_, 'u'))) => {}
                                    _ => return Err(malformed("unpaired surrogate in string escape")),
                                }
                                let lo = Self::hex4(&mut chars)?;
                                0x10000 + ((hi - 0xD800) << 10) + (lo.wrapping_sub(0xDC00) & 0x3ff)
                            } else {
                                hi
                            };
                            out.push(char::from_u32(code).ok_or_else(|| malformed("invalid unicode escape"))?);
                        }
                        other => return Err(malformed(format!("invalid escape '\\{other}'"))),
                    }
                }
                c => out.push(c),
            }
        }
        Err(malformed(format!("unterminated string starting at offset {start}")))
    }

    fn hex4(chars: &mut impl Iterator<Item = (usize, char)>) -> Result<u32, DbError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let (_, c) = chars.next().ok_or_else(|| malformed("truncated unicode escape"))?;
            let digit = c.to_digit(16).ok_or_else(|| malformed("invalid unicode escape"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }
}

/// Streaming reader over the lenient textual form.
pub struct JsonReader<'a> {
    lexer: Lexer<'a>,
    machine: Machine,
    pending_name: Option<String>,
    current_value: Option<Value>,
}

impl<'a> JsonReader<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self::with_settings(text, ReaderSettings::default())
    }

    #[must_use]
    pub fn with_settings(text: &'a str, settings: ReaderSettings) -> Self {
        Self {
            lexer: Lexer::new(text),
            machine: Machine::new(settings.max_depth),
            pending_name: None,
            current_value: None,
        }
    }

    /// True when only whitespace remains.
    ///
    /// # Errors
    /// `MalformedStream` when the next token cannot be lexed.
    pub fn is_at_end(&mut self) -> Result<bool, DbError> {
        Ok(self.lexer.peek()? == Token::Eof)
    }

    /// True when the next token opens an array.
    ///
    /// # Errors
    /// `MalformedStream` when the next token cannot be lexed.
    pub fn peek_is_array(&mut self) -> Result<bool, DbError> {
        Ok(self.lexer.peek()? == Token::BeginArray)
    }

    /// Reads one value of any type from the start of the input.
    ///
    /// # Errors
    /// `MalformedStream` for invalid text.
    pub fn read_top_level_value(&mut self) -> Result<Value, DbError> {
        self.machine.check("read_top_level_value", &[State::Initial])?;
        let tok = self.lexer.next_token()?;
        let ty = self.value_head(tok)?;
        self.machine.current_type = Some(ty);
        self.machine.state = State::Value;
        self.read_value()
    }

    fn expect(&mut self, expected: &Token) -> Result<(), DbError> {
        let tok = self.lexer.next_token()?;
        if &tok == expected {
            Ok(())
        } else {
            Err(malformed(format!("expected {} but found {}", expected.describe(), tok.describe())))
        }
    }

    fn set_scalar(&mut self, value: Value) -> ElementType {
        let ty = value.element_type();
        self.current_value = Some(value);
        ty
    }

    /// Classifies the value starting with `tok`. Scalars are parsed completely; for documents
    /// and arrays only the opening bracket is consumed.
    fn value_head(&mut self, tok: Token) -> Result<ElementType, DbError> {
        Ok(match tok {
            Token::BeginObject => match self.wrapper()? {
                Some(v) => self.set_scalar(v),
                None => ElementType::Document,
            },
            Token::BeginArray => ElementType::Array,
            Token::Str(s) => self.set_scalar(Value::String(s)),
            Token::Number(n) => self.set_scalar(number_value(&n)?),
            Token::Ident(id) => {
                let v = self.identifier_value(&id)?;
                self.set_scalar(v)
            }
            other => return Err(malformed(format!("expected a value but found {}", other.describe()))),
        })
    }

    /// Looks past `{` for a single-key extended JSON wrapper; rewinds when there is none.
    fn wrapper(&mut self) -> Result<Option<Value>, DbError> {
        let mark = self.lexer.mark();
        let key = match self.lexer.next_token()? {
            Token::Str(k) | Token::Ident(k) if WRAPPER_KEYS.contains(&k.as_str()) => k,
            _ => {
                self.lexer.reset(mark);
                return Ok(None);
            }
        };
        self.expect(&Token::Colon)?;
        let payload = self.lexer.next_token()?;
        let value = match (key.as_str(), payload) {
            (_, Token::Str(text)) => wrapped_scalar(&key, &text)
                .unwrap_or_else(|| Err(malformed(format!("unknown wrapper {key}"))))
                .map_err(|e| malformed(e.to_string()))?,
            ("$date", Token::Number(n)) => Value::DateTime(UtcDateTime::from_millis(parse_i64(&n)?)),
            ("$date", Token::BeginObject) => {
                self.expect(&Token::Str("$numberLong".into()))
                    .map_err(|_| malformed("$date expects a string, a number or {$numberLong}"))?;
                self.expect(&Token::Colon)?;
                let millis = match self.lexer.next_token()? {
                    Token::Str(s) | Token::Number(s) => parse_i64(&s)?,
                    other => return Err(malformed(format!("expected millis but found {}", other.describe()))),
                };
                self.expect(&Token::EndObject)?;
                Value::DateTime(UtcDateTime::from_millis(millis))
            }
            ("$numberInt" | "$numberLong", Token::Number(n)) => match number_value(&n)? {
                Value::Int32(i) if key == "$numberLong" => Value::Int64(i64::from(i)),
                Value::Int64(_) if key == "$numberInt" => return Err(malformed(format!("{n} does not fit $numberInt"))),
                v @ (Value::Int32(_) | Value::Int64(_)) => v,
                _ => return Err(malformed(format!("{key} expects an integer, found {n}"))),
            },
            (_, other) => return Err(malformed(format!("{key} cannot wrap {}", other.describe()))),
        };
        self.expect(&Token::EndObject)?;
        Ok(Some(value))
    }

    fn identifier_value(&mut self, id: &str) -> Result<Value, DbError> {
        match id {
            "true" => return Ok(Value::Boolean(true)),
            "false" => return Ok(Value::Boolean(false)),
            "null" => return Ok(Value::Null),
            "NaN" => return Ok(Value::Double(f64::NAN)),
            "Infinity" => return Ok(Value::Double(f64::INFINITY)),
            _ => {}
        }
        self.expect(&Token::LParen)
            .map_err(|_| malformed(format!("unexpected identifier {id}")))?;
        let value = match id {
            "ObjectId" => {
                let hex = self.string_arg(id)?;
                Value::ObjectId(ObjectId::parse_str(&hex).map_err(|e| malformed(e.to_string()))?)
            }
            "NumberInt" => {
                let text = self.scalar_arg(id)?;
                Value::Int32(text.trim().parse().map_err(|_| malformed(format!("NumberInt({text}) is out of range")))?)
            }
            "NumberLong" => Value::Int64(parse_i64(&self.scalar_arg(id)?)?),
            "NumberDecimal" => {
                let text = self.scalar_arg(id)?;
                Value::Decimal128(Decimal128::parse(&text).map_err(|e| malformed(e.to_string()))?)
            }
            "ISODate" => {
                let text = self.string_arg(id)?;
                Value::DateTime(UtcDateTime::parse_rfc3339(&text).map_err(|e| malformed(e.to_string()))?)
            }
            "HexData" => {
                let subtype = match self.lexer.next_token()? {
                    Token::Number(n) => n.parse::<u8>().map_err(|_| malformed(format!("invalid HexData subtype {n}")))?,
                    other => return Err(malformed(format!("HexData expects a subtype, found {}", other.describe()))),
                };
                self.expect(&Token::Comma)?;
                let hex_text = self.string_arg(id)?;
                let bytes = hex::decode(&hex_text).map_err(|e| malformed(format!("HexData: {e}")))?;
                Value::Binary(Binary { subtype, bytes })
            }
            other => return Err(malformed(format!("unknown constructor {other}"))),
        };
        self.expect(&Token::RParen)?;
        Ok(value)
    }

    fn string_arg(&mut self, ctor: &str) -> Result<String, DbError> {
        match self.lexer.next_token()? {
            Token::Str(s) => Ok(s),
            other => Err(malformed(format!("{ctor} expects a string, found {}", other.describe()))),
        }
    }

    fn scalar_arg(&mut self, ctor: &str) -> Result<String, DbError> {
        match self.lexer.next_token()? {
            Token::Str(s) | Token::Number(s) => Ok(s),
            other => Err(malformed(format!("{ctor} expects a number or string, found {}", other.describe()))),
        }
    }

    fn take_scalar(&mut self, op: &str, ty: ElementType) -> Result<Value, DbError> {
        self.machine.check_value(op, ty)?;
        let v = self.current_value.take().ok_or_else(|| malformed(format!("{op}: no value pending")))?;
        self.machine.reader_value_done();
        Ok(v)
    }

    fn open(&mut self, op: &str, kind: FrameKind) -> Result<(), DbError> {
        if matches!(self.machine.state, State::Initial | State::Done) && self.machine.depth() == 0 {
            let open = match kind {
                FrameKind::Document => Token::BeginObject,
                FrameKind::Array => Token::BeginArray,
            };
            self.expect(&open)?;
        } else {
            let ty = match kind {
                FrameKind::Document => ElementType::Document,
                FrameKind::Array => ElementType::Array,
            };
            self.machine.check_value(op, ty)?;
        }
        self.machine.push(kind, 0)?;
        self.machine.state = State::Type;
        Ok(())
    }

    fn close(&mut self, op: &str, kind: FrameKind) -> Result<(), DbError> {
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
}

fn parse_i64(text: &str) -> Result<i64, DbError> {
    text.trim().parse().map_err(|_| malformed(format!("{text} is not a 64-bit integer")))
}

/// Integral text becomes Int32 when it fits, then Int64, otherwise Double.
fn number_value(text: &str) -> Result<Value, DbError> {
    if !text.contains(['.', 'e', 'E', 'I']) && let Ok(i) = text.parse::<i64>() {
        return Ok(i32::try_from(i).map_or(Value::Int64(i), Value::Int32));
    }
    parse_double(text)
        .map(Value::Double)
        .ok_or_else(|| malformed(format!("invalid number {text}")))
}

macro_rules! scalar_read {
    ($fn:ident, $ty:ident, $out:ty) => {
        fn $fn(&mut self) -> Result<$out, DbError> {
            match self.take_scalar(stringify!($fn), ElementType::$ty)? {
                Value::$ty(v) => Ok(v),
                other => Err(malformed(format!("{} found {}", stringify!($fn), other.type_name()))),
            }
        }
    };
}

impl DocumentReader for JsonReader<'_> {
    fn state(&self) -> State {
        self.machine.state
    }

    fn current_type(&self) -> Option<ElementType> {
        self.machine.current_type
    }

    fn read_start_document(&mut self) -> Result<(), DbError> {
        self.open("read_start_document", FrameKind::Document)
    }

    fn read_end_document(&mut self) -> Result<(), DbError> {
        self.close("read_end_document", FrameKind::Document)
    }

    fn read_start_array(&mut self) -> Result<(), DbError> {
        self.open("read_start_array", FrameKind::Array)
    }

    fn read_end_array(&mut self) -> Result<(), DbError> {
        self.close("read_end_array", FrameKind::Array)
    }

    fn read_element_type(&mut self) -> Result<Option<ElementType>, DbError> {
        self.machine.check("read_element_type", &[State::Type])?;
        let (kind, index) = self
            .machine
            .top()
            .map(|f| (f.kind, f.index))
            .ok_or_else(|| malformed("no open document"))?;
        let close = match kind {
            FrameKind::Document => Token::EndObject,
            FrameKind::Array => Token::EndArray,
        };
        let mut tok = self.lexer.next_token()?;
        if tok == close {
            self.machine.state = match kind {
                FrameKind::Document => State::EndOfDocument,
                FrameKind::Array => State::EndOfArray,
            };
            return Ok(None);
        }
        if index > 0 {
            if tok != Token::Comma {
                return Err(malformed(format!("expected ',' or {} but found {}", close.describe(), tok.describe())));
            }
            tok = self.lexer.next_token()?;
            if tok == close {
                return Err(malformed("trailing comma"));
            }
        }
        if let Some(frame) = self.machine.top_mut() {
            frame.index += 1;
        }
        if kind == FrameKind::Document {
            let name = match tok {
                Token::Str(s) | Token::Ident(s) => s,
                other => return Err(malformed(format!("expected a name but found {}", other.describe()))),
            };
            self.expect(&Token::Colon)?;
            self.pending_name = Some(name);
            tok = self.lexer.next_token()?;
        }
        let ty = self.value_head(tok)?;
        self.machine.current_type = Some(ty);
        self.machine.state = if kind == FrameKind::Document { State::Name } else { State::Value };
        Ok(Some(ty))
    }

    fn read_name(&mut self) -> Result<String, DbError> {
        if self.machine.state == State::Type && self.read_element_type()?.is_none() {
            return Err(malformed("read_name called at the end of the document"));
        }
        self.machine.check("read_name", &[State::Name])?;
        self.machine.state = State::Value;
        self.pending_name.take().ok_or_else(|| malformed("no name pending"))
    }

    scalar_read!(read_double, Double, f64);
    scalar_read!(read_string, String, String);
    scalar_read!(read_binary, Binary, Binary);
    scalar_read!(read_object_id, ObjectId, ObjectId);
    scalar_read!(read_boolean, Boolean, bool);
    scalar_read!(read_date_time, DateTime, UtcDateTime);
    scalar_read!(read_int32, Int32, i32);
    scalar_read!(read_int64, Int64, i64);
    scalar_read!(read_decimal128, Decimal128, Decimal128);

    fn read_null(&mut self) -> Result<(), DbError> {
        self.take_scalar("read_null", ElementType::Null).map(|_| ())
    }

    fn skip_value(&mut self) -> Result<(), DbError> {
        self.machine.check("skip_value", &[State::Value])?;
        match self.machine.current_type {
            Some(ElementType::Document | ElementType::Array) => self.read_value().map(|_| ()),
            Some(_) => {
                self.current_value = None;
                self.machine.reader_value_done();
                Ok(())
            }
            None => Err(malformed("skip_value without an element type")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{parse_json, read_document};
    use crate::doc;

    #[test]
    fn step_by_step_lenient_read() {
        let mut r = JsonReader::new("{ a: 1 }");
        r.read_start_document().unwrap();
        assert_eq!(r.read_name().unwrap(), "a");
        assert_eq!(r.read_int32().unwrap(), 1);
        r.read_end_document().unwrap();
        assert_eq!(r.state(), State::Done);
    }

    #[test]
    fn lexer_handles_quotes_and_escapes() {
        let mut lx = Lexer::new(r#" 'it\'s' "a\"bé" name_1 -2.5e3 "#);
        assert_eq!(lx.next_token().unwrap(), Token::Str("it's".into()));
        assert_eq!(lx.next_token().unwrap(), Token::Str("a\"b\u{e9}".into()));
        assert_eq!(lx.next_token().unwrap(), Token::Ident("name_1".into()));
        assert_eq!(lx.next_token().unwrap(), Token::Number("-2.5e3".into()));
        assert_eq!(lx.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn number_typing() {
        let d = parse_json("{ a: 1, b: 3000000000, c: 1.5, d: 99999999999999999999 }").unwrap();
        assert_eq!(d.get("a"), Some(&Value::Int32(1)));
        assert_eq!(d.get("b"), Some(&Value::Int64(3_000_000_000)));
        assert_eq!(d.get("c"), Some(&Value::Double(1.5)));
        assert!(matches!(d.get("d"), Some(Value::Double(_))));
    }

    #[test]
    fn exponents_may_carry_a_sign() {
        let d = parse_json("{ a: 1e-7, b: -2.5E+3, c: [1,-2] }").unwrap();
        assert_eq!(d.get("a"), Some(&Value::Double(1e-7)));
        assert_eq!(d.get("b"), Some(&Value::Double(-2500.0)));
        assert_eq!(d.get("c"), Some(&Value::Array(vec![Value::Int32(1), Value::Int32(-2)])));
        assert!(parse_json("{ a: 1-2 }").is_err());
    }

    #[test]
    fn shell_constructors_and_wrappers() {
        let text = r#"{
            _id: ObjectId("5f1d7f3e9d1e8a2b3c4d5e6f"),
            n: NumberLong(5), i: NumberInt("7"), dec: NumberDecimal("420.69"),
            when: ISODate("2000-01-01T00:00:00Z"), bin: HexData(0, "0aff"),
            w1: {"$numberLong": "9"}, w2: {"$date": {"$numberLong": "0"}}, w3: {"$numberDouble": "NaN"}
        }"#;
        let d = parse_json(text).unwrap();
        assert_eq!(d.get_object_id("_id").unwrap().to_hex(), "5f1d7f3e9d1e8a2b3c4d5e6f");
        assert_eq!(d.get("n"), Some(&Value::Int64(5)));
        assert_eq!(d.get("i"), Some(&Value::Int32(7)));
        assert_eq!(d.get_decimal128("dec").unwrap().to_string(), "420.69");
        assert_eq!(d.get_datetime("when").unwrap().timestamp_millis(), 946_684_800_000);
        assert_eq!(d.get_binary("bin").unwrap().bytes, vec![0x0a, 0xff]);
        assert_eq!(d.get("w1"), Some(&Value::Int64(9)));
        assert_eq!(d.get_datetime("w2").unwrap().timestamp_millis(), 0);
        assert!(matches!(d.get("w3"), Some(Value::Double(f)) if f.is_nan()));
    }

    #[test]
    fn dollar_keys_that_are_not_wrappers_stay_documents() {
        let d = parse_json("{ counter: { $gt: 50 } }").unwrap();
        assert_eq!(d, doc! { "counter": { "$gt": 50 } });
    }

    #[test]
    fn rejects_trailing_commas_and_garbage() {
        assert!(parse_json("{ a: 1, }").is_err());
        assert!(parse_json("[1, 2,]").is_err());
        assert!(parse_json("{ a: 1 } x").is_err());
        assert!(parse_json("{ a: 1").is_err());
        assert!(parse_json("{ a 1 }").is_err());
        assert!(parse_json("{ a: undefined }").is_err());
    }

    #[test]
    fn nested_read_and_skip() {
        let mut r = JsonReader::new("{ skip: { x: [1, { y: 2 }] }, keep: [true, null] }");
        r.read_start_document().unwrap();
        assert_eq!(r.read_name().unwrap(), "skip");
        r.skip_value().unwrap();
        assert_eq!(r.read_name().unwrap(), "keep");
        r.read_start_array().unwrap();
        assert_eq!(r.read_element_type().unwrap(), Some(ElementType::Boolean));
        assert!(r.read_boolean().unwrap());
        assert_eq!(r.read_element_type().unwrap(), Some(ElementType::Null));
        r.read_null().unwrap();
        r.read_end_array().unwrap();
        r.read_end_document().unwrap();
        assert!(r.is_at_end().unwrap());
    }

    #[test]
    fn documents_can_follow_each_other() {
        let mut r = JsonReader::new("{a: 1} {a: 2}");
        assert_eq!(read_document(&mut r).unwrap(), doc! { "a": 1 });
        assert_eq!(read_document(&mut r).unwrap(), doc! { "a": 2 });
        assert!(r.is_at_end().unwrap());
    }
}
