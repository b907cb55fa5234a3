use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::collection::Collection;
use crate::errors::DbError;
use crate::query::{compare_docs, eval_filter, get_path, project, set_path, values_equal};
use crate::telemetry::{self, StageEvent};
use crate::value::{Document, Value};

use super::stages::{LookupSpec, Stage, UnwindSpec};
use super::Pipeline;

/// Finds the foreign collections named by `$lookup` stages.
pub trait CollectionResolver {
    fn resolve(&self, name: &str) -> Option<Arc<Collection>>;
}

impl CollectionResolver for HashMap<String, Arc<Collection>> {
    fn resolve(&self, name: &str) -> Option<Arc<Collection>> {
        self.get(name).cloned()
    }
}

impl CollectionResolver for crate::engine::Engine {
    fn resolve(&self, name: &str) -> Option<Arc<Collection>> {
        self.get_collection(name)
    }
}

/// Runs `pipeline` over a snapshot of `source`.
///
/// # Errors
/// `QueryError` for invalid stages; `TypeMismatch` when a stage cannot write its output path.
pub fn aggregate(
    source: &Collection,
    pipeline: &Pipeline,
    resolver: &dyn CollectionResolver,
) -> Result<Vec<Document>, DbError> {
    pipeline.validate()?;
    let start = Instant::now();
    let docs: Vec<Document> = source.state.read().docs.values().cloned().collect();
    let out = run_stages(docs, pipeline.stages(), resolver)?;
    telemetry::log_query(
        source.namespace(),
        &format!("pipeline of {} stage(s)", pipeline.stages().len()),
        start.elapsed().as_millis(),
        None,
        None,
    );
    Ok(out)
}

pub(crate) fn run_stages(
    mut docs: Vec<Document>,
    stages: &[Stage],
    resolver: &dyn CollectionResolver,
) -> Result<Vec<Document>, DbError> {
    for stage in stages {
        let input = docs.len();
        docs = match stage {
            Stage::Match(filter) => docs.into_iter().filter(|d| eval_filter(d, filter)).collect(),
            Stage::Lookup(spec) => lookup(docs, spec, resolver)?,
            Stage::Unwind(spec) => unwind(docs, spec)?,
            Stage::Project(p) => docs.iter().map(|d| project(d, p)).collect(),
            Stage::Sort(specs) => {
                docs.sort_by(|a, b| compare_docs(a, b, specs));
                docs
            }
            Stage::Skip(n) => docs.into_iter().skip(*n).collect(),
            Stage::Limit(n) => {
                docs.truncate(*n);
                docs
            }
            Stage::Count(field) => count(&docs, field),
        };
        telemetry::record_stage(StageEvent { stage: stage.name().to_string(), input, output: docs.len() });
    }
    Ok(docs)
}

/// Values a side of the join offers: array elements plus the array itself; missing is null.
fn join_keys(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None => vec![&Value::Null],
        Some(v @ Value::Array(items)) => items.iter().chain(std::iter::once(v)).collect(),
        Some(v) => vec![v],
    }
}

fn lookup(docs: Vec<Document>, spec: &LookupSpec, resolver: &dyn CollectionResolver) -> Result<Vec<Document>, DbError> {
    let foreign: Vec<Document> = match resolver.resolve(&spec.from) {
        Some(c) => c.state.read().docs.values().cloned().collect(),
        None => {
            log::debug!("$lookup from unknown collection '{}' joins nothing", spec.from);
            Vec::new()
        }
    };
    let as_path: Vec<&str> = spec.as_field.split('.').collect();
    docs.into_iter()
        .map(|mut doc| -> Result<Document, DbError> {
            let local = join_keys(get_path(&doc, &spec.local_field));
            let matches: Vec<Value> = foreign
                .iter()
                .filter(|fd| {
                    let keys = join_keys(get_path(fd, &spec.foreign_field));
                    local.iter().any(|l| keys.iter().any(|k| values_equal(l, k)))
                })
                .cloned()
                .map(Value::Document)
                .collect();
            set_path(&mut doc, &as_path, Value::Array(matches))?;
            Ok(doc)
        })
        .collect()
}

fn unwind(docs: Vec<Document>, spec: &UnwindSpec) -> Result<Vec<Document>, DbError> {
    let path: Vec<&str> = spec.path.split('.').collect();
    let index_path: Option<Vec<&str>> = spec.include_array_index.as_deref().map(|p| p.split('.').collect());
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        let items = match get_path(&doc, &spec.path) {
            Some(Value::Array(items)) if !items.is_empty() => Some(items.clone()),
            // a scalar unwinds to itself
            Some(v) if !v.is_null() && !matches!(v, Value::Array(_)) => None,
            _ if spec.preserve_null_and_empty => None,
            _ => continue,
        };
        let Some(items) = items else {
            let mut kept = doc;
            if let Some(ip) = &index_path {
                set_path(&mut kept, ip, Value::Null)?;
            }
            out.push(kept);
            continue;
        };
        for (i, item) in items.into_iter().enumerate() {
            let mut next = doc.clone();
            set_path(&mut next, &path, item)?;
            if let Some(ip) = &index_path {
                set_path(&mut next, ip, Value::Int64(i64::try_from(i).unwrap_or(i64::MAX)))?;
            }
            out.push(next);
        }
    }
    Ok(out)
}

fn count(docs: &[Document], field: &str) -> Vec<Document> {
    if docs.is_empty() {
        return Vec::new();
    }
    let n = i64::try_from(docs.len()).unwrap_or(i64::MAX);
    let value = i32::try_from(n).map_or(Value::Int64(n), Value::Int32);
    let mut out = Document::new();
    out.insert(field, value);
    vec![out]
}

impl Collection {
    /// Runs `pipeline` with this collection as the source.
    ///
    /// # Errors
    /// As [`aggregate`].
    pub fn aggregate(&self, pipeline: &Pipeline, resolver: &dyn CollectionResolver) -> Result<Vec<Document>, DbError> {
        aggregate(self, pipeline, resolver)
    }
}
