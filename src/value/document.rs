use std::collections::HashMap;
use std::fmt;

use crate::errors::DbError;

use super::{Binary, Decimal128, ObjectId, UtcDateTime, Value};

/// An ordered list of named elements.
///
/// Element order is observable and duplicates are allowed when pushed explicitly or read
/// from a stream; `insert` keeps names unique by replacing in place.
#[derive(Clone, Default, PartialEq)]
pub struct Document {
    elements: Vec<(String, Value)>,
}

impl Document {
    #[must_use]
    pub const fn new() -> Self {
        Self { elements: Vec::new() }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { elements: Vec::with_capacity(capacity) }
    }

    /// Parses the lenient shell/extended JSON text form.
    ///
    /// # Errors
    /// `MalformedStream` for text that is not a single document.
    pub fn parse(text: &str) -> Result<Self, DbError> {
        crate::codec::parse_json(text)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.elements.iter().position(|(k, _)| k == key)
    }

    /// First element named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.elements.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.elements.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Replaces the first element named `key` in place, or appends. Returns the old value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.elements.push((key, value));
                None
            }
        }
    }

    /// Appends without checking for an existing element of the same name.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.elements.push((key.into(), value.into()));
    }

    /// Inserts at `index`, shifting later elements. Any other element named `key` is removed.
    pub fn insert_at(&mut self, index: usize, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.elements.retain(|(k, _)| *k != key);
        let index = index.min(self.elements.len());
        self.elements.insert(index, (key, value.into()));
    }

    /// Removes the first element named `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.position(key)?;
        Some(self.elements.remove(pos).1)
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.elements.retain(|(k, v)| keep(k, v));
    }

    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<(&str, &Value)> {
        self.elements.get(index).map(|(k, v)| (k.as_str(), v))
    }

    /// Positional access that reports an out-of-range index.
    ///
    /// # Errors
    /// `FieldNotFound` naming the index.
    pub fn element_at(&self, index: usize) -> Result<(&str, &Value), DbError> {
        self.get_index(index).ok_or_else(|| DbError::FieldNotFound(format!("#{index}")))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.elements.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.elements.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.elements.iter().map(|(_, v)| v)
    }

    /// Copies the elements into a map; for duplicate names the last one wins.
    #[must_use]
    pub fn to_dictionary(&self) -> HashMap<String, Value> {
        self.elements.iter().cloned().collect()
    }

    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.get("_id")
    }

    fn require(&self, key: &str) -> Result<&Value, DbError> {
        self.get(key).ok_or_else(|| DbError::FieldNotFound(key.to_string()))
    }

    fn mismatch(key: &str, expected: &str, found: &Value) -> DbError {
        DbError::TypeMismatch(format!("element '{key}' is {} not {expected}", found.type_name()))
    }

    /// # Errors
    /// `FieldNotFound` or `TypeMismatch`.
    pub fn get_str(&self, key: &str) -> Result<&str, DbError> {
        let v = self.require(key)?;
        v.as_str().ok_or_else(|| Self::mismatch(key, "String", v))
    }

    /// # Errors
    /// `FieldNotFound` or `TypeMismatch`.
    pub fn get_bool(&self, key: &str) -> Result<bool, DbError> {
        let v = self.require(key)?;
        v.as_bool().ok_or_else(|| Self::mismatch(key, "Boolean", v))
    }

    /// # Errors
    /// `FieldNotFound` or `TypeMismatch`.
    pub fn get_i32(&self, key: &str) -> Result<i32, DbError> {
        let v = self.require(key)?;
        v.as_i32().ok_or_else(|| Self::mismatch(key, "Int32", v))
    }

    /// Accepts Int32 and Int64 elements.
    ///
    /// # Errors
    /// `FieldNotFound` or `TypeMismatch`.
    pub fn get_i64(&self, key: &str) -> Result<i64, DbError> {
        let v = self.require(key)?;
        v.as_i64().ok_or_else(|| Self::mismatch(key, "Int64", v))
    }

    /// Accepts Double and Int32 elements, the kinds that widen to `f64` exactly.
    ///
    /// # Errors
    /// `FieldNotFound` or `TypeMismatch`.
    pub fn get_f64(&self, key: &str) -> Result<f64, DbError> {
        let v = self.require(key)?;
        v.as_f64().ok_or_else(|| Self::mismatch(key, "Double", v))
    }

    /// # Errors
    /// `FieldNotFound` or `TypeMismatch`.
    pub fn get_decimal128(&self, key: &str) -> Result<Decimal128, DbError> {
        let v = self.require(key)?;
        v.as_decimal128().ok_or_else(|| Self::mismatch(key, "Decimal128", v))
    }

    /// # Errors
    /// `FieldNotFound` or `TypeMismatch`.
    pub fn get_object_id(&self, key: &str) -> Result<ObjectId, DbError> {
        let v = self.require(key)?;
        v.as_object_id().ok_or_else(|| Self::mismatch(key, "ObjectId", v))
    }

    /// # Errors
    /// `FieldNotFound` or `TypeMismatch`.
    pub fn get_datetime(&self, key: &str) -> Result<UtcDateTime, DbError> {
        let v = self.require(key)?;
        v.as_datetime().ok_or_else(|| Self::mismatch(key, "DateTime", v))
    }

    /// # Errors
    /// `FieldNotFound` or `TypeMismatch`.
    pub fn get_document(&self, key: &str) -> Result<&Document, DbError> {
        let v = self.require(key)?;
        v.as_document().ok_or_else(|| Self::mismatch(key, "Document", v))
    }

    /// # Errors
    /// `FieldNotFound` or `TypeMismatch`.
    pub fn get_array(&self, key: &str) -> Result<&[Value], DbError> {
        let v = self.require(key)?;
        v.as_array().ok_or_else(|| Self::mismatch(key, "Array", v))
    }

    /// # Errors
    /// `FieldNotFound` or `TypeMismatch`.
    pub fn get_binary(&self, key: &str) -> Result<&Binary, DbError> {
        match self.require(key)? {
            Value::Binary(b) => Ok(b),
            other => Err(Self::mismatch(key, "Binary", other)),
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.elements.iter().map(|(k, v)| (k, v))).finish()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::to_json_string(self))
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a str, &'a Value);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a Value)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    /// Collects with `push` semantics, so duplicates survive.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Self::new();
        for (k, v) in iter {
            doc.push(k, v);
        }
        doc
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Document {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
