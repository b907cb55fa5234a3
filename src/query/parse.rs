use crate::errors::DbError;
use crate::value::{Document, Value};

use super::types::{CmpOp, Filter, MAX_IN_SET, UpdateDoc, UpdateOp};

impl Filter {
    /// Parses query syntax such as `{ counter: { $gt: 50 }, $or: [ ... ] }`.
    ///
    /// # Errors
    /// `QueryError` for unknown operators or malformed operands.
    pub fn from_document(doc: &Document) -> Result<Self, DbError> {
        let mut parts = Vec::with_capacity(doc.len());
        for (key, value) in doc {
            parts.push(if key.starts_with('$') {
                parse_logical(key, value)?
            } else {
                parse_field(key, value)?
            });
        }
        Ok(match parts.len() {
            0 => Self::True,
            1 => parts.remove(0),
            _ => Self::And(parts),
        })
    }
}

fn parse_logical(op: &str, value: &Value) -> Result<Filter, DbError> {
    let items = value
        .as_array()
        .ok_or_else(|| DbError::QueryError(format!("{op} expects an array of filter documents")))?;
    let filters = items
        .iter()
        .map(|item| {
            item.as_document()
                .ok_or_else(|| DbError::QueryError(format!("{op} entries must be documents")))
                .and_then(Filter::from_document)
        })
        .collect::<Result<Vec<_>, _>>()?;
    match op {
        "$and" => Ok(Filter::And(filters)),
        "$or" => Ok(Filter::Or(filters)),
        "$nor" => Ok(Filter::Not(Box::new(Filter::Or(filters)))),
        other => Err(DbError::QueryError(format!("unknown top-level operator '{other}'"))),
    }
}

fn is_operator_doc(value: &Value) -> bool {
    value
        .as_document()
        .and_then(|d| d.keys().next())
        .is_some_and(|k| k.starts_with('$'))
}

fn parse_field(path: &str, value: &Value) -> Result<Filter, DbError> {
    let Some(ops) = value.as_document().filter(|_| is_operator_doc(value)) else {
        return Ok(Filter::Cmp { path: path.to_string(), op: CmpOp::Eq, value: value.clone() });
    };
    let mut parts = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        let cmp = |kind| Filter::Cmp { path: path.to_string(), op: kind, value: operand.clone() };
        parts.push(match op {
            "$eq" => cmp(CmpOp::Eq),
            "$ne" => cmp(CmpOp::Ne),
            "$gt" => cmp(CmpOp::Gt),
            "$gte" => cmp(CmpOp::Gte),
            "$lt" => cmp(CmpOp::Lt),
            "$lte" => cmp(CmpOp::Lte),
            "$in" => Filter::In { path: path.to_string(), values: value_list(op, operand)? },
            "$nin" => Filter::Nin { path: path.to_string(), values: value_list(op, operand)? },
            "$exists" => Filter::Exists { path: path.to_string(), exists: truthy(operand) },
            "$not" => Filter::Not(Box::new(parse_field(path, operand)?)),
            "$regex" => regex_filter(path, operand, ops.get("$options"))?,
            "$options" => continue,
            other => return Err(DbError::QueryError(format!("unknown operator '{other}' on '{path}'"))),
        });
    }
    Ok(if parts.len() == 1 { parts.remove(0) } else { Filter::And(parts) })
}

fn value_list(op: &str, operand: &Value) -> Result<Vec<Value>, DbError> {
    let items = operand
        .as_array()
        .ok_or_else(|| DbError::QueryError(format!("{op} expects an array")))?;
    if items.len() > MAX_IN_SET {
        return Err(DbError::QueryError(format!("{op} list exceeds {MAX_IN_SET} values")));
    }
    Ok(items.to_vec())
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Boolean(b) => *b,
        Value::Null => false,
        Value::Int32(i) => *i != 0,
        Value::Int64(i) => *i != 0,
        Value::Double(f) => *f != 0.0,
        _ => true,
    }
}

#[cfg(feature = "regex")]
fn regex_filter(path: &str, pattern: &Value, options: Option<&Value>) -> Result<Filter, DbError> {
    let pattern = pattern
        .as_str()
        .ok_or_else(|| DbError::QueryError("$regex expects a string pattern".into()))?;
    let case_insensitive = options.and_then(Value::as_str).is_some_and(|o| o.contains('i'));
    super::builders::regex(path, pattern, case_insensitive)
}

#[cfg(not(feature = "regex"))]
fn regex_filter(_path: &str, _pattern: &Value, _options: Option<&Value>) -> Result<Filter, DbError> {
    Err(DbError::QueryError("$regex requires the 'regex' feature".into()))
}

impl UpdateDoc {
    /// Parses `{ $set: {...}, $inc: {...}, $unset: {...} }`, keeping operator order.
    ///
    /// # Errors
    /// `QueryError` for an empty update, unknown operators, or plain fields (use
    /// `replace_one` for whole-document replacement).
    pub fn from_document(doc: &Document) -> Result<Self, DbError> {
        if doc.is_empty() {
            return Err(DbError::QueryError("update document must not be empty".into()));
        }
        let mut ops = Vec::new();
        for (op, fields) in doc {
            let fields = match (op.starts_with('$'), fields.as_document()) {
                (false, _) => {
                    return Err(DbError::QueryError(format!(
                        "update field '{op}' is not an operator; use replace_one to replace documents"
                    )));
                }
                (true, None) => return Err(DbError::QueryError(format!("{op} expects a document"))),
                (true, Some(d)) => d,
            };
            for (path, value) in fields {
                let path = path.to_string();
                ops.push(match op {
                    "$set" => UpdateOp::Set { path, value: value.clone() },
                    "$inc" => UpdateOp::Inc { path, amount: value.clone() },
                    "$unset" => UpdateOp::Unset { path },
                    other => return Err(DbError::QueryError(format!("unknown update operator '{other}'"))),
                });
            }
        }
        Ok(Self { ops })
    }
}

/// Parses a filter written in the lenient JSON syntax.
pub fn parse_filter_json(text: &str) -> Result<Filter, DbError> {
    Filter::from_document(&Document::parse(text)?)
}

pub fn parse_update_json(text: &str) -> Result<UpdateDoc, DbError> {
    UpdateDoc::from_document(&Document::parse(text)?)
}
