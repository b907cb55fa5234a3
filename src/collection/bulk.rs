use std::collections::BTreeMap;
use std::fmt;

use super::core::Collection;
use crate::errors::DbError;
use crate::query::{Filter, UpdateDoc};
use crate::value::{Document, Value};

/// One write in a [`Collection::bulk_write`] batch.
#[derive(Debug, Clone)]
pub enum WriteModel {
    InsertOne { document: Document },
    UpdateOne { filter: Filter, update: UpdateDoc },
    UpdateMany { filter: Filter, update: UpdateDoc },
    ReplaceOne { filter: Filter, replacement: Document },
    DeleteOne { filter: Filter },
    DeleteMany { filter: Filter },
}

impl WriteModel {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InsertOne { .. } => "insertOne",
            Self::UpdateOne { .. } => "updateOne",
            Self::UpdateMany { .. } => "updateMany",
            Self::ReplaceOne { .. } => "replaceOne",
            Self::DeleteOne { .. } => "deleteOne",
            Self::DeleteMany { .. } => "deleteMany",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkWriteOptions {
    pub ordered: bool,
}

impl Default for BulkWriteOptions {
    fn default() -> Self {
        Self { ordered: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkWriteResult {
    pub inserted_count: u64,
    pub matched_count: u64,
    pub modified_count: u64,
    pub deleted_count: u64,
    /// Ids of inserted documents keyed by model index.
    pub inserted_ids: BTreeMap<usize, Value>,
}

/// A failed model and why it failed.
#[derive(Debug)]
pub struct WriteError {
    pub index: usize,
    pub error: DbError,
}

/// Partial outcome of a batch in which at least one write failed.
#[derive(Debug)]
pub struct BulkWriteError {
    pub result: BulkWriteResult,
    pub write_errors: Vec<WriteError>,
}

impl fmt::Display for BulkWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bulk write failed with {} error(s)", self.write_errors.len())?;
        if let Some(first) = self.write_errors.first() {
            write!(f, "; first at index {} ({}): {}", first.index, first.error.kind(), first.error)?;
        }
        Ok(())
    }
}

impl Collection {
    /// Runs `models` in order. Ordered batches stop at the first failure with earlier
    /// writes kept; unordered batches attempt every model.
    ///
    /// # Errors
    /// `InvalidNamespace` before any write, or `BulkWrite` with the partial result.
    pub fn bulk_write(&self, models: Vec<WriteModel>, options: BulkWriteOptions) -> Result<BulkWriteResult, DbError> {
        self.check_writable()?;
        let mut result = BulkWriteResult::default();
        let mut write_errors = Vec::new();
        for (index, model) in models.into_iter().enumerate() {
            let op = model.name();
            if let Err(error) = self.apply_model(index, model, &mut result) {
                log::debug!("bulk {op} #{index} on {} failed: {error}", self.namespace());
                write_errors.push(WriteError { index, error });
                if options.ordered {
                    break;
                }
            }
        }
        if write_errors.is_empty() {
            Ok(result)
        } else {
            Err(DbError::BulkWrite(Box::new(BulkWriteError { result, write_errors })))
        }
    }

    fn apply_model(&self, index: usize, model: WriteModel, result: &mut BulkWriteResult) -> Result<(), DbError> {
        match model {
            WriteModel::InsertOne { mut document } => {
                let id = self.insert_one(&mut document)?;
                result.inserted_count += 1;
                result.inserted_ids.insert(index, id);
            }
            WriteModel::UpdateOne { filter, update } => {
                let r = self.update_one(&filter, &update)?;
                result.matched_count += r.matched;
                result.modified_count += r.modified;
            }
            WriteModel::UpdateMany { filter, update } => {
                let r = self.update_many(&filter, &update)?;
                result.matched_count += r.matched;
                result.modified_count += r.modified;
            }
            WriteModel::ReplaceOne { filter, replacement } => {
                let r = self.replace_one(&filter, replacement)?;
                result.matched_count += r.matched;
                result.modified_count += r.modified;
            }
            WriteModel::DeleteOne { filter } => result.deleted_count += self.delete_one(&filter)?.deleted,
            WriteModel::DeleteMany { filter } => result.deleted_count += self.delete_many(&filter)?.deleted,
        }
        Ok(())
    }
}
