use crate::errors::DbError;
use crate::query::{Filter, Order, Projection, SortSpec};
use crate::value::{Document, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSpec {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwindSpec {
    pub path: String,
    pub preserve_null_and_empty: bool,
    pub include_array_index: Option<String>,
}

impl UnwindSpec {
    /// A leading `$` on `path` is accepted and dropped.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let path = path.strip_prefix('$').map(str::to_string).unwrap_or(path);
        Self { path, preserve_null_and_empty: false, include_array_index: None }
    }

    #[must_use]
    pub const fn preserve_null_and_empty(mut self, preserve: bool) -> Self {
        self.preserve_null_and_empty = preserve;
        self
    }

    #[must_use]
    pub fn include_array_index(mut self, field: impl Into<String>) -> Self {
        self.include_array_index = Some(field.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum Stage {
    Match(Filter),
    Lookup(LookupSpec),
    Unwind(UnwindSpec),
    Project(Projection),
    Sort(Vec<SortSpec>),
    Skip(usize),
    Limit(usize),
    /// Replaces the stream with one `{ <field>: n }` document.
    Count(String),
}

impl Stage {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Match(_) => "$match",
            Self::Lookup(_) => "$lookup",
            Self::Unwind(_) => "$unwind",
            Self::Project(_) => "$project",
            Self::Sort(_) => "$sort",
            Self::Skip(_) => "$skip",
            Self::Limit(_) => "$limit",
            Self::Count(_) => "$count",
        }
    }

    /// Parses one `{ $stage: ... }` document.
    ///
    /// # Errors
    /// `QueryError` for unknown stages or malformed arguments.
    pub fn from_document(doc: &Document) -> Result<Self, DbError> {
        let (name, arg) = match (doc.len(), doc.get_index(0)) {
            (1, Some(entry)) => entry,
            _ => return Err(DbError::QueryError(format!("a pipeline stage needs exactly one field, got {doc}"))),
        };
        let bad = |what: &str| DbError::QueryError(format!("{name} {what}"));
        match name {
            "$match" => Ok(Self::Match(Filter::from_document(arg.as_document().ok_or_else(|| bad("expects a document"))?)?)),
            "$lookup" => {
                let spec = arg.as_document().ok_or_else(|| bad("expects a document"))?;
                let field = |key: &str| {
                    spec.get_str(key).map(str::to_string).map_err(|_| bad(&format!("requires string field '{key}'")))
                };
                Ok(Self::Lookup(LookupSpec {
                    from: field("from")?,
                    local_field: field("localField")?,
                    foreign_field: field("foreignField")?,
                    as_field: field("as")?,
                }))
            }
            "$unwind" => match arg {
                Value::String(path) => Ok(Self::Unwind(UnwindSpec::new(path.as_str()))),
                Value::Document(spec) => {
                    let path = spec.get_str("path").map_err(|_| bad("requires string field 'path'"))?;
                    let mut unwind = UnwindSpec::new(path)
                        .preserve_null_and_empty(spec.get_bool("preserveNullAndEmptyArrays").unwrap_or(false));
                    if let Ok(index) = spec.get_str("includeArrayIndex") {
                        unwind = unwind.include_array_index(index);
                    }
                    Ok(Self::Unwind(unwind))
                }
                _ => Err(bad("expects a path string or a document")),
            },
            "$project" => {
                let spec = arg.as_document().ok_or_else(|| bad("expects a document"))?;
                let mut projection = Projection::new();
                for (field, flag) in spec {
                    projection = if truthy(flag).ok_or_else(|| bad("values must be 0/1 or booleans"))? {
                        projection.include(field)
                    } else {
                        projection.exclude(field)
                    };
                }
                projection.validate()?;
                Ok(Self::Project(projection))
            }
            "$sort" => {
                let spec = arg.as_document().ok_or_else(|| bad("expects a document"))?;
                let specs = spec
                    .iter()
                    .map(|(field, dir)| match dir.as_i64() {
                        Some(1) => Ok(SortSpec { field: field.to_string(), order: Order::Asc }),
                        Some(-1) => Ok(SortSpec { field: field.to_string(), order: Order::Desc }),
                        _ => Err(bad("directions must be 1 or -1")),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Sort(specs))
            }
            "$skip" => Ok(Self::Skip(count_arg(arg).ok_or_else(|| bad("expects a non-negative integer"))?)),
            "$limit" => Ok(Self::Limit(count_arg(arg).ok_or_else(|| bad("expects a non-negative integer"))?)),
            "$count" => {
                let field = arg.as_str().ok_or_else(|| bad("expects a field name"))?;
                Ok(Self::Count(field.to_string()))
            }
            other => Err(DbError::QueryError(format!("unsupported pipeline stage '{other}'"))),
        }
    }
}

fn truthy(v: &Value) -> Option<bool> {
    match v {
        Value::Boolean(b) => Some(*b),
        Value::Int32(_) | Value::Int64(_) => v.as_i64().map(|i| i != 0),
        Value::Double(f) => Some(*f != 0.0),
        _ => None,
    }
}

fn count_arg(v: &Value) -> Option<usize> {
    v.as_i64().and_then(|n| usize::try_from(n).ok())
}

/// Free-function builders for pipeline stages.
pub fn match_(filter: Filter) -> Stage {
    Stage::Match(filter)
}

pub fn lookup(
    from: impl Into<String>,
    local_field: impl Into<String>,
    foreign_field: impl Into<String>,
    as_field: impl Into<String>,
) -> Stage {
    Stage::Lookup(LookupSpec {
        from: from.into(),
        local_field: local_field.into(),
        foreign_field: foreign_field.into(),
        as_field: as_field.into(),
    })
}

pub fn unwind(path: impl Into<String>) -> Stage {
    Stage::Unwind(UnwindSpec::new(path))
}

pub fn unwind_with(spec: UnwindSpec) -> Stage {
    Stage::Unwind(spec)
}

pub fn project(projection: Projection) -> Stage {
    Stage::Project(projection)
}

pub fn sort(specs: impl IntoIterator<Item = SortSpec>) -> Stage {
    Stage::Sort(specs.into_iter().collect())
}

pub fn skip(n: usize) -> Stage {
    Stage::Skip(n)
}

pub fn limit(n: usize) -> Stage {
    Stage::Limit(n)
}

pub fn count(field: impl Into<String>) -> Stage {
    Stage::Count(field.into())
}
