use serde_json::{Number, Value as Json};

use super::class_map::Representation;
use crate::errors::DbError;
use crate::value::{Decimal128, ObjectId, UtcDateTime, Value};

fn mismatch(member: &str, value: &Value, rep: &Representation) -> DbError {
    DbError::TypeMismatch(format!("member '{member}' holds a {} that cannot be stored as {rep:?}", value.type_name()))
}

/// Host JSON to stored value.
pub(crate) fn store(rep: &Representation, member: &str, json: Json) -> Result<Value, DbError> {
    let value = Value::try_from(json)?;
    if value.is_null() {
        return Ok(value);
    }
    let converted = match (rep, &value) {
        (Representation::Auto, _) => None,
        (Representation::ObjectId, Value::String(s)) => Some(Value::ObjectId(ObjectId::parse_str(s)?)),
        (Representation::ObjectId, Value::ObjectId(_)) => None,
        (Representation::Decimal128, Value::Int32(_) | Value::Int64(_)) => {
            value.as_i64().map(|i| Value::Decimal128(Decimal128::from(i)))
        }
        (Representation::Decimal128, Value::Double(f)) => Some(Value::Decimal128(Decimal128::try_from(*f)?)),
        (Representation::Decimal128, Value::String(s)) => Some(Value::Decimal128(Decimal128::parse(s)?)),
        (Representation::Decimal128, Value::Decimal128(_)) => None,
        (Representation::DateTime, Value::String(s)) => Some(Value::DateTime(UtcDateTime::parse_rfc3339(s)?)),
        (Representation::DateTime, Value::Int32(_) | Value::Int64(_)) => {
            value.as_i64().map(|ms| Value::DateTime(UtcDateTime::from_millis(ms)))
        }
        (Representation::DateTime, Value::DateTime(_)) => None,
        (Representation::Int64, Value::Int32(i)) => Some(Value::Int64(i64::from(*i))),
        (Representation::Int64, Value::Int64(_)) => None,
        (Representation::Int64, Value::Double(f)) => Some(Value::Int64(exact_i64(*f, member)?)),
        (Representation::Int64, Value::String(s)) => {
            Some(Value::Int64(s.parse().map_err(|_| mismatch(member, &value, rep))?))
        }
        (Representation::Double, Value::Int32(i)) => Some(Value::Double(f64::from(*i))),
        (Representation::Double, Value::Int64(i)) => Some(Value::Double(exact_f64(*i, member)?)),
        (Representation::Double, Value::Double(_)) => None,
        (Representation::Double, Value::Decimal128(d)) => Some(Value::Double(d.to_f64_exact()?)),
        (Representation::String, Value::String(_)) => None,
        (Representation::String, _) => Some(Value::String(scalar_text(&value).ok_or_else(|| mismatch(member, &value, rep))?)),
        (Representation::Enum { variants, as_string }, Value::String(name)) => {
            let index = variants
                .iter()
                .position(|v| v == name)
                .ok_or_else(|| DbError::TypeMismatch(format!("'{name}' is not a variant of member '{member}'")))?;
            if *as_string {
                None
            } else {
                Some(Value::Int32(i32::try_from(index).map_err(|_| mismatch(member, &value, rep))?))
            }
        }
        _ => return Err(mismatch(member, &value, rep)),
    };
    Ok(converted.unwrap_or(value))
}

/// Stored value to the JSON the host member deserializes from.
pub(crate) fn load(rep: &Representation, element: &str, value: &Value) -> Result<Json, DbError> {
    Ok(match (rep, value) {
        (_, Value::Null) => Json::Null,
        (Representation::ObjectId, Value::ObjectId(o)) => Json::String(o.to_hex()),
        (Representation::Decimal128, Value::Decimal128(d)) => {
            let f = d.to_f64_exact()?;
            Number::from_f64(f)
                .map(Json::Number)
                .ok_or_else(|| DbError::ConversionPrecisionLoss(format!("element '{element}' holds {d}")))?
        }
        (Representation::DateTime, Value::DateTime(d)) => Json::String(d.to_rfc3339().ok_or_else(|| {
            DbError::ConversionPrecisionLoss(format!("element '{element}' holds {d}, outside the host date range"))
        })?),
        (Representation::String, Value::String(s)) => match serde_json::from_str::<Json>(s) {
            Ok(parsed @ (Json::Number(_) | Json::Bool(_))) => parsed,
            _ => Json::String(s.clone()),
        },
        (Representation::Enum { variants, .. }, Value::Int32(_) | Value::Int64(_)) => {
            let name = value
                .as_i64()
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| variants.get(i))
                .ok_or_else(|| DbError::TypeMismatch(format!("element '{element}' holds an unknown variant index {value}")))?;
            Json::String(name.clone())
        }
        _ => value.to_json(),
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    Some(match value {
        Value::Boolean(b) => b.to_string(),
        Value::Int32(i) => i.to_string(),
        Value::Int64(i) => i.to_string(),
        Value::Double(f) => f.to_string(),
        Value::Decimal128(d) => d.to_string(),
        Value::DateTime(d) => d.to_string(),
        Value::ObjectId(o) => o.to_hex(),
        _ => return None,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn exact_i64(f: f64, member: &str) -> Result<i64, DbError> {
    let i = f as i64;
    if f.fract() == 0.0 && i as f64 == f && f.abs() < 9.223_372_036_854_775_807e18 {
        Ok(i)
    } else {
        Err(DbError::ConversionPrecisionLoss(format!("member '{member}' value {f} is not an Int64")))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn exact_f64(i: i64, member: &str) -> Result<f64, DbError> {
    let f = i as f64;
    if f as i64 == i && f.abs() < 9.223_372_036_854_775_807e18 {
        Ok(f)
    } else {
        Err(DbError::ConversionPrecisionLoss(format!("member '{member}' value {i} is not exact as a Double")))
    }
}
