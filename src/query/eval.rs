use std::cmp::Ordering;

use crate::value::{Decimal128, Document, Value};

use super::types::{CmpOp, Filter, MAX_IN_SET, MAX_PATH_DEPTH, MAX_SORT_FIELDS, Order, Projection, SortSpec};

pub fn eval_filter(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => !resolve_path(doc, path).is_empty() == *exists,
        Filter::In { path, values } => is_in_set(doc, path, values),
        Filter::Nin { path, values } => !is_in_set(doc, path, values),
        Filter::Cmp { path, op: CmpOp::Ne, value } => {
            !candidates(doc, path).into_iter().any(|v| values_equal(v, value))
        }
        Filter::Cmp { path, op, value } => {
            candidates(doc, path).into_iter().any(|v| matches_cmp(v, *op, value))
        }
        #[cfg(feature = "regex")]
        Filter::Regex { path, regex } => {
            candidates(doc, path).into_iter().any(|v| v.as_str().is_some_and(|s| regex.is_match(s)))
        }
    }
}

fn matches_cmp(v: &Value, op: CmpOp, value: &Value) -> bool {
    match op {
        CmpOp::Eq => values_equal(v, value),
        CmpOp::Ne => !values_equal(v, value),
        CmpOp::Gt => compare_values(v, value) == Some(Ordering::Greater),
        CmpOp::Gte => matches!(compare_values(v, value), Some(Ordering::Greater | Ordering::Equal)),
        CmpOp::Lt => compare_values(v, value) == Some(Ordering::Less),
        CmpOp::Lte => matches!(compare_values(v, value), Some(Ordering::Less | Ordering::Equal)),
    }
}

fn is_in_set(doc: &Document, path: &str, set: &[Value]) -> bool {
    candidates(doc, path)
        .into_iter()
        .any(|v| set.iter().take(MAX_IN_SET).any(|x| values_equal(v, x)))
}

/// Every value `path` reaches. Non-numeric segments fan out over arrays of documents;
/// numeric segments index into arrays.
pub fn resolve_path<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let mut out = Vec::new();
    if path.is_empty() || path.len() > 1024 {
        return out;
    }
    let segs: Vec<&str> = path.split('.').collect();
    if segs.len() > MAX_PATH_DEPTH {
        return out;
    }
    resolve_in_doc(doc, &segs, &mut out);
    out
}

fn resolve_in_doc<'a>(doc: &'a Document, segs: &[&str], out: &mut Vec<&'a Value>) {
    let Some((first, rest)) = segs.split_first() else { return };
    if let Some(child) = doc.get(first) {
        if rest.is_empty() {
            out.push(child);
        } else {
            resolve_in_value(child, rest, out);
        }
    }
}

fn resolve_in_value<'a>(value: &'a Value, segs: &[&str], out: &mut Vec<&'a Value>) {
    match value {
        Value::Document(d) => resolve_in_doc(d, segs, out),
        Value::Array(items) => {
            let Some((first, rest)) = segs.split_first() else { return };
            if let Ok(index) = first.parse::<usize>() {
                if let Some(item) = items.get(index) {
                    if rest.is_empty() {
                        out.push(item);
                    } else {
                        resolve_in_value(item, rest, out);
                    }
                }
            } else {
                for item in items {
                    if let Value::Document(d) = item {
                        resolve_in_doc(d, segs, out);
                    }
                }
            }
        }
        _ => {}
    }
}

/// Resolved values plus the elements of resolved arrays, the set a comparison may match.
fn candidates<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let mut out = Vec::new();
    for v in resolve_path(doc, path) {
        out.push(v);
        if let Value::Array(items) = v {
            out.extend(items.iter());
        }
    }
    out
}

/// First value at `path`, used for sorting and lookup keys.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    resolve_path(doc, path).into_iter().next()
}

/// Equality with numbers compared by value across Int32, Int64, Double and Decimal128.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (x, y) if x.is_numeric() && y.is_numeric() => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| values_equal(p, q))
        }
        (Value::Document(x), Value::Document(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|((ka, va), (kb, vb))| ka == kb && values_equal(va, vb))
        }
        _ => a == b,
    }
}

/// Comparison-operator ordering. `None` across type brackets or with NaN.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if bracket(a) != bracket(b) {
        return None;
    }
    if a.is_numeric() {
        return compare_numbers(a, b);
    }
    Some(total_cmp(a, b))
}

/// Total order used by sort stages: type brackets first, then value order.
pub fn total_cmp(a: &Value, b: &Value) -> Ordering {
    let rank = bracket(a).cmp(&bracket(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (x, y) if x.is_numeric() => compare_numbers(x, y).unwrap_or_else(|| {
            // NaN sorts below every other number
            is_nan(y).cmp(&is_nan(x))
        }),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Document(x), Value::Document(y)) => {
            for ((ka, va), (kb, vb)) in x.iter().zip(y) {
                let ord = ka.cmp(kb).then_with(|| total_cmp(va, vb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Array(x), Value::Array(y)) => {
            for (va, vb) in x.iter().zip(y) {
                let ord = total_cmp(va, vb);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Binary(x), Value::Binary(y)) => x
            .bytes
            .len()
            .cmp(&y.bytes.len())
            .then(x.subtype.cmp(&y.subtype))
            .then_with(|| x.bytes.cmp(&y.bytes)),
        (Value::ObjectId(x), Value::ObjectId(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        _ => Ordering::Equal,
    }
}

const fn bracket(v: &Value) -> u8 {
    match v {
        Value::Null => 1,
        Value::Int32(_) | Value::Int64(_) | Value::Double(_) | Value::Decimal128(_) => 2,
        Value::String(_) => 3,
        Value::Document(_) => 4,
        Value::Array(_) => 5,
        Value::Binary(_) => 6,
        Value::ObjectId(_) => 7,
        Value::Boolean(_) => 8,
        Value::DateTime(_) => 9,
    }
}

fn is_nan(v: &Value) -> bool {
    match v {
        Value::Double(f) => f.is_nan(),
        Value::Decimal128(d) => d.is_nan(),
        _ => false,
    }
}

fn to_decimal(v: &Value) -> Option<Decimal128> {
    match v {
        Value::Int32(i) => Some(Decimal128::from(*i)),
        Value::Int64(i) => Some(Decimal128::from(*i)),
        Value::Double(f) => Decimal128::try_from(*f).ok(),
        Value::Decimal128(d) => Some(*d),
        _ => None,
    }
}

fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => Some(a.as_i64()?.cmp(&b.as_i64()?)),
        (Value::Decimal128(_), _) | (_, Value::Decimal128(_)) => to_decimal(a)?.cmp_numeric(&to_decimal(b)?),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        (Value::Double(x), _) => cmp_int_float(b.as_i64()?, *x).map(Ordering::reverse),
        (_, Value::Double(y)) => cmp_int_float(a.as_i64()?, *y),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn cmp_int_float(i: i64, f: f64) -> Option<Ordering> {
    match (i as f64).partial_cmp(&f)? {
        // the float conversion rounds large integers; settle ties on integral floats exactly
        Ordering::Equal if f.fract() == 0.0 && f.abs() < 9.2e18 => Some(i.cmp(&(f as i64))),
        ord => Some(ord),
    }
}

pub fn compare_docs(a: &Document, b: &Document, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let ord = match (get_path(a, &s.field), get_path(b, &s.field)) {
            (Some(x), Some(y)) => total_cmp(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// Applies a validated projection.
pub fn project(doc: &Document, projection: &Projection) -> Document {
    let fields = projection.fields();
    if fields.is_empty() {
        return doc.clone();
    }
    let id_excluded = fields.iter().any(|(p, inc)| p == "_id" && !inc);
    let inclusion = fields.iter().any(|(p, inc)| *inc && p != "_id")
        || fields.iter().all(|(p, inc)| p == "_id" && *inc);
    if inclusion {
        let mut paths: Vec<Vec<&str>> = fields
            .iter()
            .filter(|(p, inc)| *inc && p != "_id")
            .map(|(p, _)| p.split('.').collect())
            .collect();
        if !id_excluded {
            paths.push(vec!["_id"]);
        }
        include_paths(doc, &paths)
    } else {
        let mut out = doc.clone();
        for (path, _) in fields.iter().filter(|(_, inc)| !inc) {
            let segs: Vec<&str> = path.split('.').collect();
            exclude_path(&mut out, &segs);
        }
        out
    }
}

fn include_paths(doc: &Document, paths: &[Vec<&str>]) -> Document {
    let mut out = Document::new();
    for (key, value) in doc {
        let matching: Vec<&Vec<&str>> = paths.iter().filter(|p| p.first() == Some(&key)).collect();
        if matching.is_empty() {
            continue;
        }
        if matching.iter().any(|p| p.len() == 1) {
            out.push(key, value.clone());
            continue;
        }
        let rest: Vec<Vec<&str>> = matching.iter().map(|p| p[1..].to_vec()).collect();
        match value {
            Value::Document(d) => out.push(key, include_paths(d, &rest)),
            Value::Array(items) => {
                let projected: Vec<Value> = items
                    .iter()
                    .filter_map(|item| item.as_document().map(|d| Value::Document(include_paths(d, &rest))))
                    .collect();
                out.push(key, projected);
            }
            _ => {}
        }
    }
    out
}

fn exclude_path(doc: &mut Document, segs: &[&str]) {
    let Some((first, rest)) = segs.split_first() else { return };
    if rest.is_empty() {
        doc.retain(|k, _| k != *first);
        return;
    }
    match doc.get_mut(first) {
        Some(Value::Document(d)) => exclude_path(d, rest),
        Some(Value::Array(items)) => {
            for item in items {
                if let Some(d) = item.as_document_mut() {
                    exclude_path(d, rest);
                }
            }
        }
        _ => {}
    }
}
