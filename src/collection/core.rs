use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use parking_lot::RwLock;

use crate::codec::encode_document;
use crate::errors::DbError;
use crate::query::{Filter, eval_filter};
use crate::telemetry;
use crate::value::{Decimal128, Document, Value};

/// Characters a database name may not contain.
const DB_NAME_FORBIDDEN: &[char] = &[' ', '.', '/', '\\', '"', '$', '\0'];

#[must_use]
pub fn is_valid_database_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(DB_NAME_FORBIDDEN)
}

#[must_use]
pub fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['$', '\0']) && !name.starts_with("system.")
}

/// Canonical form of an `_id` for the uniqueness index. Numbers equal by value share one
/// key so `1`, `1i64`, `1.0` and `NumberDecimal("1.0")` collide the way equality filters
/// treat them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct IdKey(Vec<u8>);

impl IdKey {
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn of(id: &Value) -> Result<Self, DbError> {
        let normalized = match id {
            Value::Int32(i) => Value::Int64(i64::from(*i)),
            Value::Double(f) if f.fract() == 0.0 && f.abs() < 9.2e18 => Value::Int64(*f as i64),
            Value::Double(f) if f.is_finite() => match Decimal128::try_from(*f) {
                Ok(d) => canonical_decimal(d),
                Err(_) => Value::Double(*f),
            },
            Value::Decimal128(d) => canonical_decimal(*d),
            Value::Array(_) => {
                return Err(DbError::UnsupportedValueType("_id cannot be an array".into()));
            }
            other => other.clone(),
        };
        let mut wrapper = Document::new();
        wrapper.push("", normalized);
        encode_document(&wrapper).map(Self)
    }
}

fn canonical_decimal(d: Decimal128) -> Value {
    match d.to_scaled_i128(0).ok().and_then(|i| i64::try_from(i).ok()) {
        Some(i) => Value::Int64(i),
        None => Value::Decimal128(d.normalized()),
    }
}

#[derive(Debug, Default)]
pub(crate) struct CollectionState {
    /// Documents by insertion sequence, which is also natural (unsorted) result order.
    pub(crate) docs: BTreeMap<u64, Document>,
    pub(crate) ids: HashMap<IdKey, u64>,
    next_seq: u64,
}

impl CollectionState {
    /// Appends a document whose `_id` is already set.
    pub(crate) fn insert(&mut self, namespace: &str, doc: Document) -> Result<(), DbError> {
        let id = doc.id().cloned().unwrap_or(Value::Null);
        let key = IdKey::of(&id)?;
        if self.ids.contains_key(&key) {
            return Err(DbError::DuplicateKey(format!(
                "E11000 duplicate key error collection: {namespace} index: _id_ dup key: {{ _id: {id} }}"
            )));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.ids.insert(key, seq);
        self.docs.insert(seq, doc);
        Ok(())
    }

    pub(crate) fn remove(&mut self, seq: u64) -> Option<Document> {
        let doc = self.docs.remove(&seq)?;
        if let Some(id) = doc.id()
            && let Ok(key) = IdKey::of(id)
        {
            self.ids.remove(&key);
        }
        Some(doc)
    }

    /// Scans forward from `after` for the next document matching `filter`.
    pub(crate) fn next_match(&self, after: Option<u64>, filter: &Filter) -> Option<(u64, &Document)> {
        let start = after.map_or(Bound::Unbounded, Bound::Excluded);
        let mut scanned = 0u64;
        let found = self.docs.range((start, Bound::Unbounded)).find(|(_, doc)| {
            scanned += 1;
            eval_filter(doc, filter)
        });
        telemetry::record_scanned(scanned);
        found.map(|(seq, doc)| (*seq, doc))
    }

    pub(crate) fn matching_seqs(&self, filter: &Filter, limit: Option<usize>) -> Vec<u64> {
        let mut out = Vec::new();
        let mut scanned = 0u64;
        for (seq, doc) in &self.docs {
            if limit.is_some_and(|n| out.len() >= n) {
                break;
            }
            scanned += 1;
            if eval_filter(doc, filter) {
                out.push(*seq);
            }
        }
        telemetry::record_scanned(scanned);
        out
    }
}

/// An in-memory collection. All state sits behind one `RwLock`; writers hold it for the
/// whole operation.
#[derive(Debug)]
pub struct Collection {
    name: String,
    namespace: String,
    namespace_valid: bool,
    pub(crate) state: RwLock<CollectionState>,
}

impl Collection {
    pub(crate) fn new(database: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: format!("{database}.{name}"),
            namespace_valid: is_valid_database_name(database) && is_valid_collection_name(name),
            state: RwLock::new(CollectionState::default()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<database>.<collection>`.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Writes are refused on collections whose namespace is invalid.
    pub(crate) fn check_writable(&self) -> Result<(), DbError> {
        if self.namespace_valid {
            Ok(())
        } else {
            Err(DbError::InvalidNamespace(self.namespace.clone()))
        }
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every document.
    pub(crate) fn clear(&self) {
        let mut st = self.state.write();
        st.docs.clear();
        st.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_rules() {
        assert!(is_valid_database_name("test"));
        for bad in ["", "a b", "a.b", "a/b", "a\\b", "a\"b", "a$b"] {
            assert!(!is_valid_database_name(bad), "{bad:?}");
        }
        assert!(is_valid_collection_name("users.archive"));
        for bad in ["", "a$b", "system.users"] {
            assert!(!is_valid_collection_name(bad), "{bad:?}");
        }
        assert!(Collection::new("db", "$bad").check_writable().is_err());
    }

    #[test]
    fn integral_ids_share_a_key() {
        assert_eq!(IdKey::of(&Value::Int32(1)).unwrap(), IdKey::of(&Value::Double(1.0)).unwrap());
        assert_ne!(IdKey::of(&Value::Int32(1)).unwrap(), IdKey::of(&Value::from("1")).unwrap());
        assert!(IdKey::of(&Value::Array(vec![])).is_err());
    }

    #[test]
    fn decimal_ids_share_a_key_with_equal_numbers() {
        let key = |v: Value| IdKey::of(&v).unwrap();
        let dec = |s: &str| Value::Decimal128(Decimal128::parse(s).unwrap());
        assert_eq!(key(dec("1")), key(Value::Int32(1)));
        assert_eq!(key(dec("1.000")), key(Value::Int64(1)));
        assert_eq!(key(dec("2.50")), key(Value::Double(2.5)));
        assert_eq!(key(dec("-0.0")), key(Value::Int32(0)));
        assert_eq!(key(dec("1E+30")), key(dec("1000E+27")));
        assert_ne!(key(dec("2.5")), key(dec("2.05")));
    }
}
