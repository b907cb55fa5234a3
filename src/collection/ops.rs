use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use super::bulk::{BulkWriteError, BulkWriteResult, WriteError};
use super::core::{Collection, CollectionState};
use crate::errors::DbError;
use crate::query::{
    Cursor, DeleteReport, Filter, FindOptions, UpdateDoc, UpdateReport, apply_update, values_equal,
};
use crate::telemetry;
use crate::value::{Document, ObjectId, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertManyOptions {
    /// Stop at the first failure (`true`) or attempt every document.
    pub ordered: bool,
}

impl Default for InsertManyOptions {
    fn default() -> Self {
        Self { ordered: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertManyResult {
    /// Ids of the inserted documents keyed by input position.
    pub inserted_ids: BTreeMap<usize, Value>,
}

/// Puts a fresh `ObjectId` first when the document has no `_id`; returns the id either way.
pub(crate) fn ensure_id(doc: &mut Document) -> Value {
    if let Some(id) = doc.id() {
        return id.clone();
    }
    let id = Value::ObjectId(ObjectId::new());
    doc.insert_at(0, "_id", id.clone());
    id
}

impl Collection {
    /// Inserts one document, assigning `_id` on the caller's document when missing.
    ///
    /// # Errors
    /// `InvalidNamespace`, `DuplicateKey`, or `UnsupportedValueType` for an array `_id`.
    pub fn insert_one(&self, doc: &mut Document) -> Result<Value, DbError> {
        let id = ensure_id(doc);
        self.check_writable()?;
        self.state.write().insert(self.namespace(), doc.clone())?;
        telemetry::log_audit("insert", self.namespace(), &id.to_string());
        Ok(id)
    }

    /// Inserts documents in order. Ids are assigned to every document before the first
    /// write; failures are collected into a `BulkWrite` error.
    ///
    /// # Errors
    /// `InvalidNamespace` before any write, or `BulkWrite` carrying the partial result.
    pub fn insert_many(
        &self,
        docs: &mut [Document],
        options: InsertManyOptions,
    ) -> Result<InsertManyResult, DbError> {
        let ids: Vec<Value> = docs.iter_mut().map(ensure_id).collect();
        self.check_writable()?;
        let mut st = self.state.write();
        self.insert_all(&mut st, docs.iter().cloned().zip(ids), options)
    }

    /// Like [`Collection::insert_many`] but consumes the documents; generated ids only
    /// appear in the result.
    ///
    /// # Errors
    /// As [`Collection::insert_many`].
    pub fn insert_many_iter<I>(&self, docs: I, options: InsertManyOptions) -> Result<InsertManyResult, DbError>
    where
        I: IntoIterator<Item = Document>,
    {
        let prepared: Vec<(Document, Value)> = docs
            .into_iter()
            .map(|mut doc| {
                let id = ensure_id(&mut doc);
                (doc, id)
            })
            .collect();
        self.check_writable()?;
        let mut st = self.state.write();
        self.insert_all(&mut st, prepared.into_iter(), options)
    }

    fn insert_all(
        &self,
        st: &mut CollectionState,
        docs: impl Iterator<Item = (Document, Value)>,
        options: InsertManyOptions,
    ) -> Result<InsertManyResult, DbError> {
        let mut result = InsertManyResult::default();
        let mut write_errors = Vec::new();
        for (index, (doc, id)) in docs.enumerate() {
            match st.insert(self.namespace(), doc) {
                Ok(()) => {
                    telemetry::log_audit("insert", self.namespace(), &id.to_string());
                    result.inserted_ids.insert(index, id);
                }
                Err(error) => {
                    log::debug!("insert_many into {} failed at {index}: {error}", self.namespace());
                    write_errors.push(WriteError { index, error });
                    if options.ordered {
                        break;
                    }
                }
            }
        }
        if write_errors.is_empty() {
            return Ok(result);
        }
        let partial = BulkWriteResult {
            inserted_count: result.inserted_ids.len() as u64,
            inserted_ids: result.inserted_ids,
            ..BulkWriteResult::default()
        };
        Err(DbError::BulkWrite(Box::new(BulkWriteError { result: partial, write_errors })))
    }

    /// Lazy query over the collection; nothing is read until the cursor is iterated.
    pub fn find(self: &Arc<Self>, filter: Filter) -> Cursor {
        Cursor::new(Arc::clone(self), filter, FindOptions::default())
    }

    /// # Errors
    /// `QueryError` for an invalid projection.
    pub fn find_with(self: &Arc<Self>, filter: Filter, options: FindOptions) -> Result<Cursor, DbError> {
        if let Some(p) = &options.projection {
            p.validate()?;
        }
        Ok(Cursor::new(Arc::clone(self), filter, options))
    }

    #[must_use]
    pub fn find_one(&self, filter: &Filter) -> Option<Document> {
        let start = Instant::now();
        let found = self.state.read().next_match(None, filter).map(|(_, d)| d.clone());
        telemetry::log_query(self.namespace(), &format!("{filter:?}"), start.elapsed().as_millis(), Some(1), None);
        found
    }

    #[must_use]
    pub fn count_documents(&self, filter: &Filter) -> u64 {
        let start = Instant::now();
        let n = self.state.read().matching_seqs(filter, None).len() as u64;
        telemetry::log_query(self.namespace(), &format!("{filter:?}"), start.elapsed().as_millis(), None, None);
        n
    }

    /// Updates the first matching document.
    ///
    /// # Errors
    /// `InvalidNamespace`, `TypeMismatch`, `ImmutableField`, `QueryError`; nothing changes on error.
    pub fn update_one(&self, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, DbError> {
        self.update(filter, update, false)
    }

    /// Updates every matching document, or none of them if any update fails.
    ///
    /// # Errors
    /// As [`Collection::update_one`].
    pub fn update_many(&self, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, DbError> {
        self.update(filter, update, true)
    }

    fn update(&self, filter: &Filter, update: &UpdateDoc, multi: bool) -> Result<UpdateReport, DbError> {
        self.check_writable()?;
        let bench_start = Instant::now();
        let mut st = self.state.write();
        let seqs = st.matching_seqs(filter, if multi { None } else { Some(1) });
        let mut changes = Vec::new();
        for seq in &seqs {
            if let Some(doc) = st.docs.get(seq) {
                let mut next = doc.clone();
                if apply_update(&mut next, update)? {
                    changes.push((*seq, next));
                }
            }
        }
        let report = UpdateReport { matched: seqs.len() as u64, modified: changes.len() as u64 };
        for (seq, doc) in changes {
            let id = doc.id().map(ToString::to_string).unwrap_or_default();
            st.docs.insert(seq, doc);
            telemetry::log_audit("update", self.namespace(), &id);
        }
        drop(st);
        log::debug!(
            "{{\"op\":\"update\",\"namespace\":\"{}\",\"duration_ms\":{},\"matched\":{},\"modified\":{}}}",
            self.namespace(),
            bench_start.elapsed().as_millis(),
            report.matched,
            report.modified
        );
        Ok(report)
    }

    /// Replaces the first matching document, keeping its `_id` in first position.
    ///
    /// # Errors
    /// `QueryError` if the replacement holds update operators, `ImmutableField` if it
    /// carries a different `_id`.
    pub fn replace_one(&self, filter: &Filter, replacement: Document) -> Result<UpdateReport, DbError> {
        self.check_writable()?;
        if let Some(key) = replacement.keys().find(|k| k.starts_with('$')) {
            return Err(DbError::QueryError(format!("replacement document must not contain operator '{key}'")));
        }
        let mut st = self.state.write();
        let Some(seq) = st.matching_seqs(filter, Some(1)).first().copied() else {
            return Ok(UpdateReport::default());
        };
        let Some(current) = st.docs.get(&seq) else {
            return Ok(UpdateReport::default());
        };
        let id = current.id().cloned().unwrap_or(Value::Null);
        if let Some(new_id) = replacement.id()
            && !values_equal(new_id, &id)
        {
            return Err(DbError::ImmutableField("_id".into()));
        }
        let mut next = Document::with_capacity(replacement.len() + 1);
        next.push("_id", id.clone());
        next.extend(replacement.into_iter().filter(|(k, _)| k != "_id"));
        let modified = next != *current;
        if modified {
            st.docs.insert(seq, next);
            telemetry::log_audit("replace", self.namespace(), &id.to_string());
        }
        Ok(UpdateReport { matched: 1, modified: u64::from(modified) })
    }

    /// # Errors
    /// `InvalidNamespace`.
    pub fn delete_one(&self, filter: &Filter) -> Result<DeleteReport, DbError> {
        self.delete(filter, false)
    }

    /// # Errors
    /// `InvalidNamespace`.
    pub fn delete_many(&self, filter: &Filter) -> Result<DeleteReport, DbError> {
        self.delete(filter, true)
    }

    fn delete(&self, filter: &Filter, multi: bool) -> Result<DeleteReport, DbError> {
        self.check_writable()?;
        let mut st = self.state.write();
        let seqs = st.matching_seqs(filter, if multi { None } else { Some(1) });
        let mut deleted = 0u64;
        for seq in seqs {
            if let Some(doc) = st.remove(seq) {
                deleted += 1;
                let id = doc.id().map(ToString::to_string).unwrap_or_default();
                telemetry::log_audit("delete", self.namespace(), &id);
            }
        }
        Ok(DeleteReport { deleted })
    }
}
