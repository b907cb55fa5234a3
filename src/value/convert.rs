//! Conversions between host values, `serde_json` and the value model.
//!
//! The JSON bridge uses relaxed extended JSON: ints and finite doubles map to plain numbers,
//! everything the JSON type system lacks is wrapped in a single-key `$` object.

use std::fmt;

use chrono::{Local, NaiveDateTime, TimeZone};
use serde::de::{self, DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value as Json};

use crate::errors::DbError;

use super::{Binary, Decimal128, Document, ObjectId, UtcDateTime, Value};

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v.into())
            }
        })*
    };
}

value_from! {
    bool => Boolean,
    i32 => Int32,
    i16 => Int32,
    u16 => Int32,
    i8 => Int32,
    u8 => Int32,
    i64 => Int64,
    u32 => Int64,
    f64 => Double,
    f32 => Double,
    String => String,
    &str => String,
    Decimal128 => Decimal128,
    UtcDateTime => DateTime,
    Binary => Binary,
    ObjectId => ObjectId,
    Document => Document,
    Vec<Value> => Array,
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Self::String(v.clone())
    }
}

impl<Tz: TimeZone> From<chrono::DateTime<Tz>> for Value {
    fn from(v: chrono::DateTime<Tz>) -> Self {
        Self::DateTime(UtcDateTime::from_chrono(v))
    }
}

/// Naive times are read in the host's local zone and stored as the UTC instant.
impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        let dt = Local
            .from_local_datetime(&v)
            .earliest()
            .map_or_else(|| UtcDateTime::from_chrono(v.and_utc()), UtcDateTime::from_chrono);
        Self::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl TryFrom<u64> for Value {
    type Error = DbError;

    fn try_from(v: u64) -> Result<Self, Self::Error> {
        i64::try_from(v)
            .map(Self::Int64)
            .map_err(|_| DbError::UnsupportedValueType(format!("unsigned integer {v} exceeds Int64")))
    }
}

impl TryFrom<Json> for Value {
    type Error = DbError;

    fn try_from(json: Json) -> Result<Self, Self::Error> {
        Ok(match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Boolean(b),
            Json::Number(n) => number_to_value(&n)?,
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::Array(items.into_iter().map(Self::try_from).collect::<Result<_, _>>()?),
            Json::Object(map) => object_to_value(map)?,
        })
    }
}

impl TryFrom<Json> for Document {
    type Error = DbError;

    fn try_from(json: Json) -> Result<Self, Self::Error> {
        match Value::try_from(json)? {
            Value::Document(d) => Ok(d),
            other => Err(DbError::UnsupportedValueType(format!(
                "a {} cannot be the root of a document",
                other.type_name()
            ))),
        }
    }
}

fn number_to_value(n: &Number) -> Result<Value, DbError> {
    if let Some(i) = n.as_i64() {
        return Ok(i32::try_from(i).map_or(Value::Int64(i), Value::Int32));
    }
    if n.is_u64() {
        return Err(DbError::UnsupportedValueType(format!("unsigned integer {n} exceeds Int64")));
    }
    n.as_f64()
        .map(Value::Double)
        .ok_or_else(|| DbError::UnsupportedValueType(format!("number {n} is not representable")))
}

fn object_to_value(map: Map<String, Json>) -> Result<Value, DbError> {
    if map.len() == 1
        && let Some((key, payload)) = map.iter().next()
        && key.starts_with('$')
    {
        match (key.as_str(), payload) {
            (_, Json::String(text)) => {
                if let Some(v) = wrapped_scalar(key, text) {
                    return v;
                }
            }
            ("$date", Json::Number(n)) => {
                if let Some(ms) = n.as_i64() {
                    return Ok(Value::DateTime(UtcDateTime::from_millis(ms)));
                }
            }
            ("$date", Json::Object(inner)) => {
                if let Some(Json::String(ms)) = inner.get("$numberLong") {
                    let millis = ms
                        .parse::<i64>()
                        .map_err(|_| DbError::TypeMismatch(format!("'{ms}' is not a millisecond count")))?;
                    return Ok(Value::DateTime(UtcDateTime::from_millis(millis)));
                }
            }
            ("$binary", Json::Object(inner)) => return binary_from_json(inner),
            _ => {}
        }
    }
    let mut doc = Document::with_capacity(map.len());
    for (k, v) in map {
        doc.push(k, Value::try_from(v)?);
    }
    Ok(Value::Document(doc))
}

fn binary_from_json(inner: &Map<String, Json>) -> Result<Value, DbError> {
    let bad = || DbError::TypeMismatch("$binary expects {\"hex\": \"..\", \"subType\": \"..\"}".to_string());
    let hex_text = inner.get("hex").and_then(Json::as_str).ok_or_else(bad)?;
    let subtype_text = inner.get("subType").and_then(Json::as_str).unwrap_or("00");
    let subtype = u8::from_str_radix(subtype_text, 16).map_err(|_| bad())?;
    let bytes = hex::decode(hex_text).map_err(|_| bad())?;
    Ok(Value::Binary(Binary { subtype, bytes }))
}

/// Resolves a single-key extended JSON wrapper whose payload is a string.
/// `None` when `key` is not a wrapper name, so the object is kept as a plain document.
pub(crate) fn wrapped_scalar(key: &str, text: &str) -> Option<Result<Value, DbError>> {
    let mismatch = |kind: &str| DbError::TypeMismatch(format!("'{text}' is not a valid {kind}"));
    Some(match key {
        "$oid" => ObjectId::parse_str(text).map(Value::ObjectId),
        "$numberDecimal" => Decimal128::parse(text).map(Value::Decimal128),
        "$numberLong" => text.parse::<i64>().map(Value::Int64).map_err(|_| mismatch("Int64")),
        "$numberInt" => text.parse::<i32>().map(Value::Int32).map_err(|_| mismatch("Int32")),
        "$numberDouble" => parse_double(text).map(Value::Double).ok_or_else(|| mismatch("Double")),
        "$date" => UtcDateTime::parse_rfc3339(text).map(Value::DateTime),
        _ => return None,
    })
}

pub(crate) fn parse_double(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => text.parse::<f64>().ok(),
    }
}

fn wrap(key: &str, payload: Json) -> Json {
    let mut map = Map::with_capacity(1);
    map.insert(key.to_string(), payload);
    Json::Object(map)
}

impl Value {
    /// Relaxed extended JSON form of the value.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Boolean(b) => Json::Bool(*b),
            Self::Int32(i) => Json::from(*i),
            Self::Int64(i) => Json::from(*i),
            Self::Double(f) => Number::from_f64(*f)
                .map_or_else(|| wrap("$numberDouble", Json::String(format_double_special(*f))), Json::Number),
            Self::Decimal128(d) => wrap("$numberDecimal", Json::String(d.to_string())),
            Self::String(s) => Json::String(s.clone()),
            Self::DateTime(d) => match d.to_rfc3339() {
                Some(iso) => wrap("$date", Json::String(iso)),
                None => wrap("$date", wrap("$numberLong", Json::String(d.timestamp_millis().to_string()))),
            },
            Self::Binary(b) => {
                let mut inner = Map::with_capacity(2);
                inner.insert("hex".into(), Json::String(hex::encode(&b.bytes)));
                inner.insert("subType".into(), Json::String(format!("{:02x}", b.subtype)));
                wrap("$binary", Json::Object(inner))
            }
            Self::ObjectId(o) => wrap("$oid", Json::String(o.to_hex())),
            Self::Array(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Document(d) => d.to_json(),
        }
    }
}

impl Document {
    #[must_use]
    pub fn to_json(&self) -> Json {
        Json::Object(self.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect())
    }
}

fn format_double_special(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f > 0.0 {
        "Infinity".to_string()
    } else {
        "-Infinity".to_string()
    }
}

/// Converts any serializable host value into a [`Value`].
///
/// # Errors
/// `UnsupportedValueType` for integers above `i64::MAX`, `Json` when serialization fails.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, DbError> {
    Value::try_from(serde_json::to_value(value)?)
}

/// Converts a [`Value`] into a host type through its extended JSON form.
///
/// # Errors
/// `Json` when the shape does not match `T`.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, DbError> {
    Ok(serde_json::from_value(value.to_json())?)
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$oid", &self.to_hex())?;
        map.end()
    }
}

impl Serialize for Decimal128 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$numberDecimal", &self.to_string())?;
        map.end()
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self.to_rfc3339() {
            Some(iso) => map.serialize_entry("$date", &iso)?,
            None => map.serialize_entry("$date", &self.timestamp_millis())?,
        }
        map.end()
    }
}

/// Accepts the wrapper object, the bare string form, and (for numeric kinds) a number.
struct WrapperVisitor<T> {
    key: &'static str,
    expecting: &'static str,
    parse: fn(&str) -> Result<T, DbError>,
    from_number: Option<fn(f64) -> Result<T, DbError>>,
    from_integer: Option<fn(i64) -> T>,
}

impl<'de, T> Visitor<'de> for WrapperVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.expecting)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        (self.parse)(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<T, E> {
        match self.from_integer {
            Some(f) => Ok(f(v)),
            None => Err(E::invalid_type(de::Unexpected::Signed(v), &self)),
        }
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<T, E> {
        let signed = i64::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))?;
        self.visit_i64(signed)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<T, E> {
        match self.from_number {
            Some(f) => f(v).map_err(E::custom),
            None => Err(E::invalid_type(de::Unexpected::Float(v), &self)),
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<T, A::Error> {
        let mut out = None;
        while let Some(key) = map.next_key::<String>()? {
            if key != self.key {
                return Err(de::Error::unknown_field(&key, &[]));
            }
            let payload: Json = map.next_value()?;
            out = Some(match payload {
                Json::String(s) => (self.parse)(&s).map_err(de::Error::custom)?,
                Json::Number(n) => match (n.as_i64(), self.from_integer) {
                    (Some(i), Some(f)) => f(i),
                    _ => return Err(de::Error::custom(format!("unexpected number in {}", self.key))),
                },
                _ => return Err(de::Error::custom(format!("unexpected payload in {}", self.key))),
            });
        }
        out.ok_or_else(|| de::Error::missing_field(self.key))
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WrapperVisitor {
            key: "$oid",
            expecting: "an ObjectId hex string or {\"$oid\": ...}",
            parse: Self::parse_str,
            from_number: None,
            from_integer: None,
        })
    }
}

impl<'de> Deserialize<'de> for Decimal128 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WrapperVisitor {
            key: "$numberDecimal",
            expecting: "a decimal string, number or {\"$numberDecimal\": ...}",
            parse: Self::parse,
            from_number: Some(|v: f64| Self::try_from(v)),
            from_integer: Some(|v: i64| Self::from(v)),
        })
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WrapperVisitor {
            key: "$date",
            expecting: "an RFC 3339 string, epoch millis or {\"$date\": ...}",
            parse: Self::parse_rfc3339,
            from_number: None,
            from_integer: Some(Self::from_millis),
        })
    }
}
