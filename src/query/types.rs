use crate::errors::DbError;
use crate::value::Value;

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc }
    }
}

/// Field selection applied to result documents. Entries are `(path, included)`.
///
/// `_id` is kept unless it is listed with `false`. Apart from `_id`, entries must all
/// include or all exclude.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub(crate) fields: Vec<(String, bool)>,
}

impl Projection {
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    #[must_use]
    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.fields.push((path.into(), true));
        self
    }

    #[must_use]
    pub fn exclude(mut self, path: impl Into<String>) -> Self {
        self.fields.push((path.into(), false));
        self
    }

    pub fn fields(&self) -> &[(String, bool)] {
        &self.fields
    }

    /// Rejects mixed inclusion and exclusion and oversized projections.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.fields.len() > MAX_PROJECTION_FIELDS {
            return Err(DbError::QueryError(format!(
                "projection has {} fields, the limit is {MAX_PROJECTION_FIELDS}",
                self.fields.len()
            )));
        }
        let mut includes = false;
        let mut excludes = false;
        for (path, included) in &self.fields {
            if path.is_empty() {
                return Err(DbError::QueryError("projection path must not be empty".into()));
            }
            if path == "_id" {
                continue;
            }
            if *included {
                includes = true;
            } else {
                excludes = true;
            }
        }
        if includes && excludes {
            return Err(DbError::QueryError(
                "projection cannot mix inclusion and exclusion of fields other than _id".into(),
            ));
        }
        Ok(())
    }
}

/// Options for `Collection::find_with`, applied as filter, sort, skip, limit, projection.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub projection: Option<Projection>,
    pub sort: Option<Vec<SortSpec>>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    #[must_use]
    pub const fn operator(self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Value> },
    Nin { path: String, values: Vec<Value> },
    Cmp { path: String, op: CmpOp, value: Value },
    #[cfg(feature = "regex")]
    Regex { path: String, regex: regex::Regex },
}

/// One update operator; an `UpdateDoc` applies them in order.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set { path: String, value: Value },
    Inc { path: String, amount: Value },
    Unset { path: String },
}

impl UpdateOp {
    pub fn path(&self) -> &str {
        match self {
            Self::Set { path, .. } | Self::Inc { path, .. } | Self::Unset { path } => path,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpdateDoc {
    pub ops: Vec<UpdateOp>,
}

impl UpdateDoc {
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    #[must_use]
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set { path: path.into(), value: value.into() });
        self
    }

    #[must_use]
    pub fn inc(mut self, path: impl Into<String>, amount: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Inc { path: path.into(), amount: amount.into() });
        self
    }

    #[must_use]
    pub fn unset(mut self, path: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset { path: path.into() });
        self
    }

    /// Appends the operators of `other` after this document's own.
    #[must_use]
    pub fn combine(mut self, other: Self) -> Self {
        self.ops.extend(other.ops);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_mixing_is_rejected() {
        assert!(Projection::new().include("a").exclude("_id").validate().is_ok());
        assert!(Projection::new().exclude("a").exclude("b").validate().is_ok());
        let err = Projection::new().include("a").exclude("b").validate().unwrap_err();
        assert!(matches!(err, DbError::QueryError(_)));
    }

    #[test]
    fn update_ops_keep_their_order() {
        let u = UpdateDoc::new().set("a", 1).inc("b", 2).combine(UpdateDoc::new().unset("c"));
        let paths: Vec<_> = u.ops.iter().map(UpdateOp::path).collect();
        assert_eq!(paths, ["a", "b", "c"]);
    }
}
