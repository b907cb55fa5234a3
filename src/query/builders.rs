//! Free functions that build immutable filters and updates.
//!
//! ```
//! use bsonite::query::builders::{gt, lte, set};
//! let filter = gt("counter", 50) & lte("counter", 60);
//! let update = set("status", "seen").inc("visits", 1);
//! # let _ = (filter, update);
//! ```

use std::ops::{BitAnd, BitOr, Not};

#[cfg(feature = "regex")]
use crate::errors::DbError;
use crate::value::Value;

use super::types::{CmpOp, Filter, UpdateDoc};

fn cmp(path: impl Into<String>, op: CmpOp, value: impl Into<Value>) -> Filter {
    Filter::Cmp { path: path.into(), op, value: value.into() }
}

pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Filter {
    cmp(path, CmpOp::Eq, value)
}

pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Filter {
    cmp(path, CmpOp::Ne, value)
}

pub fn gt(path: impl Into<String>, value: impl Into<Value>) -> Filter {
    cmp(path, CmpOp::Gt, value)
}

pub fn gte(path: impl Into<String>, value: impl Into<Value>) -> Filter {
    cmp(path, CmpOp::Gte, value)
}

pub fn lt(path: impl Into<String>, value: impl Into<Value>) -> Filter {
    cmp(path, CmpOp::Lt, value)
}

pub fn lte(path: impl Into<String>, value: impl Into<Value>) -> Filter {
    cmp(path, CmpOp::Lte, value)
}

pub fn exists(path: impl Into<String>, exists: bool) -> Filter {
    Filter::Exists { path: path.into(), exists }
}

/// Matches when every filter matches; evaluation stops at the first miss.
pub fn and(filters: impl IntoIterator<Item = Filter>) -> Filter {
    Filter::And(filters.into_iter().collect())
}

pub fn or(filters: impl IntoIterator<Item = Filter>) -> Filter {
    Filter::Or(filters.into_iter().collect())
}

pub fn not(filter: Filter) -> Filter {
    Filter::Not(Box::new(filter))
}

pub fn in_<V: Into<Value>>(path: impl Into<String>, values: impl IntoIterator<Item = V>) -> Filter {
    Filter::In { path: path.into(), values: values.into_iter().map(Into::into).collect() }
}

pub fn nin<V: Into<Value>>(path: impl Into<String>, values: impl IntoIterator<Item = V>) -> Filter {
    Filter::Nin { path: path.into(), values: values.into_iter().map(Into::into).collect() }
}

/// # Errors
/// `QueryError` when the pattern does not compile.
#[cfg(feature = "regex")]
pub fn regex(path: impl Into<String>, pattern: &str, case_insensitive: bool) -> Result<Filter, DbError> {
    let regex = regex::RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| DbError::QueryError(format!("invalid regex '{pattern}': {e}")))?;
    Ok(Filter::Regex { path: path.into(), regex })
}

pub fn set(path: impl Into<String>, value: impl Into<Value>) -> UpdateDoc {
    UpdateDoc::new().set(path, value)
}

pub fn inc(path: impl Into<String>, amount: impl Into<Value>) -> UpdateDoc {
    UpdateDoc::new().inc(path, amount)
}

pub fn unset(path: impl Into<String>) -> UpdateDoc {
    UpdateDoc::new().unset(path)
}

impl BitAnd for Filter {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        match self {
            Self::And(mut fs) => {
                fs.push(rhs);
                Self::And(fs)
            }
            lhs => Self::And(vec![lhs, rhs]),
        }
    }
}

impl BitOr for Filter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        match self {
            Self::Or(mut fs) => {
                fs.push(rhs);
                Self::Or(fs)
            }
            lhs => Self::Or(vec![lhs, rhs]),
        }
    }
}

impl Not for Filter {
    type Output = Self;

    fn not(self) -> Self {
        not(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::query::eval_filter;

    #[test]
    fn operators_flatten_chains() {
        let f = gt("a", 1) & lt("a", 5) & ne("a", 3);
        assert!(matches!(&f, Filter::And(fs) if fs.len() == 3));
        assert!(eval_filter(&doc! { "a": 2 }, &f));
        assert!(!eval_filter(&doc! { "a": 3 }, &f));
        assert!(eval_filter(&doc! { "a": 9 }, &(!f | eq("a", 9))));
    }

    #[test]
    fn in_and_nin() {
        let d = doc! { "c": "red" };
        assert!(eval_filter(&d, &in_("c", ["red", "blue"])));
        assert!(!eval_filter(&d, &nin("c", ["red"])));
        assert!(eval_filter(&doc! {}, &nin("c", ["red"])));
    }

    #[cfg(feature = "regex")]
    #[test]
    fn regex_matches_strings_only() {
        let f = regex("name", "^mo", true).unwrap();
        assert!(eval_filter(&doc! { "name": "MongoDB" }, &f));
        assert!(!eval_filter(&doc! { "name": 5 }, &f));
        assert!(regex("name", "(", false).is_err());
    }
}
