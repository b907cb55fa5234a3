//! Pipelines of match, lookup, unwind, project, sort, skip, limit and count stages.

mod exec;
pub mod stages;

pub use exec::{CollectionResolver, aggregate};
pub use stages::{LookupSpec, Stage, UnwindSpec};

use crate::errors::DbError;
use crate::value::Document;

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    #[must_use]
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Parses `[{ $match: ... }, { $lookup: ... }, ...]` stage documents.
    ///
    /// # Errors
    /// `QueryError` naming the offending stage.
    pub fn from_documents(docs: &[Document]) -> Result<Self, DbError> {
        let stages = docs
            .iter()
            .enumerate()
            .map(|(i, d)| {
                Stage::from_document(d).map_err(|e| DbError::QueryError(format!("stage {i}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { stages })
    }

    /// Appends a stage.
    #[must_use]
    pub fn then(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Checks projections and count field names before any document is read.
    ///
    /// # Errors
    /// `QueryError`.
    pub fn validate(&self) -> Result<(), DbError> {
        for stage in &self.stages {
            match stage {
                Stage::Project(p) => p.validate()?,
                Stage::Count(field) if field.is_empty() || field.starts_with('$') || field.contains('.') => {
                    return Err(DbError::QueryError(format!("invalid $count field name '{field}'")));
                }
                Stage::Lookup(spec) if spec.as_field.is_empty() || spec.from.is_empty() => {
                    return Err(DbError::QueryError("$lookup needs non-empty 'from' and 'as'".into()));
                }
                Stage::Unwind(spec) if spec.path.is_empty() => {
                    return Err(DbError::QueryError("$unwind needs a path".into()));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl From<Vec<Stage>> for Pipeline {
    fn from(stages: Vec<Stage>) -> Self {
        Self::new(stages)
    }
}

impl FromIterator<Stage> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
