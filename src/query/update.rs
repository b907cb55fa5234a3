use crate::errors::DbError;
use crate::value::{Decimal128, Document, Value};

use super::eval::values_equal;
use super::types::{MAX_PATH_DEPTH, UpdateDoc, UpdateOp};

/// Applies `update` to `doc` and reports whether the document changed.
///
/// Operators run in order against a scratch copy; the document is replaced only when every
/// operator succeeded.
pub fn apply_update(doc: &mut Document, update: &UpdateDoc) -> Result<bool, DbError> {
    let mut next = doc.clone();
    for op in &update.ops {
        let segs = split_path(op.path())?;
        if segs[0] == "_id" {
            check_id(&next, op)?;
        }
        match op {
            UpdateOp::Set { value, .. } => set_path(&mut next, &segs, value.clone())?,
            UpdateOp::Inc { path, amount } => {
                if !amount.is_numeric() {
                    return Err(DbError::TypeMismatch(format!(
                        "cannot increment '{path}' with non-numeric argument of type {}",
                        amount.type_name()
                    )));
                }
                let current = super::eval::get_path(&next, path).cloned();
                let updated = match current {
                    None => amount.clone(),
                    Some(v) if v.is_numeric() => add_numbers(path, &v, amount)?,
                    Some(v) => {
                        return Err(DbError::TypeMismatch(format!(
                            "cannot apply $inc to '{path}' of non-numeric type {}",
                            v.type_name()
                        )));
                    }
                };
                set_path(&mut next, &segs, updated)?;
            }
            UpdateOp::Unset { .. } => unset_path(&mut next, &segs),
        }
    }
    if next == *doc {
        return Ok(false);
    }
    *doc = next;
    Ok(true)
}

fn split_path(path: &str) -> Result<Vec<&str>, DbError> {
    let segs: Vec<&str> = path.split('.').collect();
    if path.is_empty() || segs.iter().any(|s| s.is_empty()) {
        return Err(DbError::QueryError(format!("invalid update path '{path}'")));
    }
    if segs.len() > MAX_PATH_DEPTH {
        return Err(DbError::QueryError(format!("update path '{path}' is nested too deeply")));
    }
    Ok(segs)
}

/// `_id` may only be "set" to the value it already has.
fn check_id(doc: &Document, op: &UpdateOp) -> Result<(), DbError> {
    let unchanged = match (op, doc.id()) {
        (UpdateOp::Set { path, value }, Some(current)) if path == "_id" => values_equal(current, value),
        _ => false,
    };
    if unchanged { Ok(()) } else { Err(DbError::ImmutableField(op.path().to_string())) }
}

/// Writes `value` at `segs`, creating intermediate documents and padding arrays with nulls.
pub(crate) fn set_path(doc: &mut Document, segs: &[&str], value: Value) -> Result<(), DbError> {
    let Some((first, rest)) = segs.split_first() else { return Ok(()) };
    if rest.is_empty() {
        doc.insert(*first, value);
        return Ok(());
    }
    if !doc.contains_key(first) {
        doc.insert(*first, Document::new());
    }
    match doc.get_mut(first) {
        Some(child) => set_in_value(child, first, rest, value),
        None => Ok(()),
    }
}

fn set_in_value(target: &mut Value, name: &str, segs: &[&str], value: Value) -> Result<(), DbError> {
    match target {
        Value::Document(d) => set_path(d, segs, value),
        Value::Array(items) => {
            let Some((first, rest)) = segs.split_first() else { return Ok(()) };
            let index: usize = first.parse().map_err(|_| {
                DbError::TypeMismatch(format!("cannot create field '{first}' in array '{name}'"))
            })?;
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            if rest.is_empty() {
                items[index] = value;
                return Ok(());
            }
            if items[index].is_null() {
                items[index] = Value::Document(Document::new());
            }
            set_in_value(&mut items[index], first, rest, value)
        }
        other => Err(DbError::TypeMismatch(format!(
            "cannot create field '{}' in element '{name}' of type {}",
            segs[0],
            other.type_name()
        ))),
    }
}

fn unset_path(doc: &mut Document, segs: &[&str]) {
    let Some((first, rest)) = segs.split_first() else { return };
    if rest.is_empty() {
        doc.remove(first);
        return;
    }
    let mut target = doc.get_mut(first);
    let mut remaining = rest;
    while let Some(value) = target {
        let Some((seg, tail)) = remaining.split_first() else { return };
        match value {
            Value::Document(d) if tail.is_empty() => {
                d.remove(seg);
                return;
            }
            Value::Document(d) => target = d.get_mut(seg),
            Value::Array(items) => {
                let Ok(index) = seg.parse::<usize>() else { return };
                if tail.is_empty() {
                    // removing would shift later elements
                    if let Some(slot) = items.get_mut(index) {
                        *slot = Value::Null;
                    }
                    return;
                }
                target = items.get_mut(index);
            }
            _ => return,
        }
        remaining = tail;
    }
}

/// Type-preserving addition used by `$inc`.
///
/// Int32 overflow widens to Int64; any Double operand yields a Double; any Decimal128
/// operand yields an exact Decimal128.
pub(crate) fn add_numbers(path: &str, current: &Value, amount: &Value) -> Result<Value, DbError> {
    match (current, amount) {
        (Value::Int32(a), Value::Int32(b)) => Ok(a
            .checked_add(*b)
            .map_or_else(|| Value::Int64(i64::from(*a) + i64::from(*b)), Value::Int32)),
        (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
            let (a, b) = (current.as_i64().unwrap_or_default(), amount.as_i64().unwrap_or_default());
            a.checked_add(b)
                .map(Value::Int64)
                .ok_or_else(|| DbError::QueryError(format!("$inc on '{path}' overflows Int64")))
        }
        (Value::Decimal128(_), _) | (_, Value::Decimal128(_)) => {
            let a = decimal_of(current)?;
            let b = decimal_of(amount)?;
            a.checked_add(&b).map(Value::Decimal128)
        }
        _ => Ok(Value::Double(float_of(current) + float_of(amount))),
    }
}

fn decimal_of(v: &Value) -> Result<Decimal128, DbError> {
    match v {
        Value::Int32(i) => Ok(Decimal128::from(*i)),
        Value::Int64(i) => Ok(Decimal128::from(*i)),
        Value::Double(f) => Decimal128::try_from(*f),
        Value::Decimal128(d) => Ok(*d),
        other => Err(DbError::TypeMismatch(format!("{} is not numeric", other.type_name()))),
    }
}

#[allow(clippy::cast_precision_loss)]
fn float_of(v: &Value) -> f64 {
    match v {
        Value::Int32(i) => f64::from(*i),
        Value::Int64(i) => *i as f64,
        Value::Double(f) => *f,
        Value::Decimal128(d) => d.to_f64(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::query::builders::{inc, set, unset};

    #[test]
    fn set_creates_intermediate_documents() {
        let mut d = doc! { "_id": 1 };
        assert!(apply_update(&mut d, &set("a.b.c", 5)).unwrap());
        assert_eq!(d, doc! { "_id": 1, "a": { "b": { "c": 5 } } });
        assert!(!apply_update(&mut d, &set("a.b.c", 5)).unwrap());
    }

    #[test]
    fn failed_update_leaves_document_untouched() {
        let mut d = doc! { "_id": 1, "name": "x" };
        let err = apply_update(&mut d, &set("n", 1).inc("name", 1)).unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch(_)));
        assert_eq!(d, doc! { "_id": 1, "name": "x" });
        let err = apply_update(&mut d, &inc("n", "1")).unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch(_)));
    }

    #[test]
    fn inc_keeps_numeric_kinds() {
        let mut d = doc! { "i": (i32::MAX), "f": 1.5, "dec": (Decimal128::parse("30.99").unwrap()) };
        apply_update(&mut d, &inc("i", 1).inc("f", 1).inc("dec", Decimal128::parse("0.01").unwrap()).inc("new", 2))
            .unwrap();
        assert_eq!(d.get("i"), Some(&Value::Int64(i64::from(i32::MAX) + 1)));
        assert_eq!(d.get("f"), Some(&Value::Double(2.5)));
        assert_eq!(d.get_decimal128("dec").unwrap().to_string(), "31.00");
        assert_eq!(d.get("new"), Some(&Value::Int32(2)));
    }

    #[test]
    fn id_is_immutable() {
        let mut d = doc! { "_id": 1, "a": 1 };
        assert!(matches!(apply_update(&mut d, &set("_id", 2)), Err(DbError::ImmutableField(_))));
        assert!(matches!(apply_update(&mut d, &unset("_id")), Err(DbError::ImmutableField(_))));
        assert!(!apply_update(&mut d, &set("_id", 1)).unwrap());
    }

    #[test]
    fn unset_removes_nested_fields() {
        let mut d = doc! { "a": { "b": 1, "c": 2 }, "arr": [1, 2] };
        apply_update(&mut d, &unset("a.b").unset("arr.0").unset("missing.x")).unwrap();
        assert_eq!(d, doc! { "a": { "c": 2 }, "arr": [null, 2] });
    }
}
