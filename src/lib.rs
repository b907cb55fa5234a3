//! bsonite: a BSON-style document codec with an embedded in-memory document store.
//!
//! The pieces, bottom up:
//! - [`value`]: the value model (`Value`, `Document`, `ObjectId`, `Decimal128`, `UtcDateTime`)
//! - [`codec`]: binary and lenient textual readers/writers driven by one state machine
//! - [`query`]: filters, updates, projections, sorting and lazy cursors
//! - [`collection`] / [`engine`] / [`Database`] / [`client::Client`]: the store itself
//! - [`aggregate`]: pipelines with `$lookup`/`$unwind`
//! - [`mapping`]: typed collections over serde host types
//!
//! ```
//! use bsonite::{doc, Database};
//! use bsonite::query::builders::{eq, set};
//!
//! let db = Database::new("shop");
//! let items = db.collection("items");
//! items.insert_one(&mut doc! { "sku": "a", "qty": 1 }).unwrap();
//! let report = items.update_one(&eq("sku", "a"), &set("qty", 2)).unwrap();
//! assert_eq!(report.modified, 1);
//! ```

pub mod aggregate;
pub mod cli;
pub mod client;
pub mod codec;
pub mod collection;
pub mod config;
pub mod engine;
pub mod errors;
pub mod interop;
pub mod logger;
pub mod mapping;
pub mod query;
pub mod telemetry;
pub mod value;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use errors::DbError;
pub use value::{Document, Value};

use crate::aggregate::{CollectionResolver, Pipeline};
use crate::collection::Collection;
use crate::engine::Engine;
use crate::mapping::{Mapper, TypedCollection};

/// A named database: a cheap, cloneable handle over a shared collection registry.
#[derive(Debug, Clone)]
pub struct Database {
    engine: Arc<Engine>,
}

impl Database {
    /// Creates a standalone database. Names that are not valid database names are
    /// accepted here; writes to their collections fail with `InvalidNamespace`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self { engine: Arc::new(Engine::new(name)) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.engine.name()
    }

    /// Returns the named collection, creating it on first reference.
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        self.engine.collection(name)
    }

    /// Returns a typed view of the named collection.
    pub fn typed_collection<T>(&self, name: &str, mapper: Arc<Mapper>) -> TypedCollection<T>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        TypedCollection::new(self.collection(name), mapper)
    }

    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.engine.get_collection(name)
    }

    /// Removes the collection and its documents. Returns whether it existed.
    pub fn drop_collection(&self, name: &str) -> bool {
        self.engine.drop_collection(name)
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        self.engine.list_collection_names()
    }

    /// Runs `pipeline` over `collection`, resolving `$lookup` sources in this database.
    ///
    /// # Errors
    /// As [`aggregate::aggregate`].
    pub fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Document>, DbError> {
        let source = self.collection(collection);
        aggregate::aggregate(&source, pipeline, self)
    }

    pub(crate) fn clear(&self) {
        self.engine.clear();
    }
}

impl CollectionResolver for Database {
    fn resolve(&self, name: &str) -> Option<Arc<Collection>> {
        self.engine.get_collection(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::stages;
    use crate::query::Filter;

    #[test]
    fn handles_share_one_registry() {
        let db = Database::new("app");
        let other = db.clone();
        db.collection("a").insert_one(&mut doc! { "x": 1 }).unwrap();
        assert_eq!(other.collection("a").len(), 1);
        assert_eq!(other.list_collection_names(), vec!["a".to_string()]);
    }

    #[test]
    fn drop_then_recreate_is_empty() {
        let db = Database::new("app");
        db.collection("a").insert_one(&mut doc! { "x": 1 }).unwrap();
        assert!(db.drop_collection("a"));
        assert!(!db.drop_collection("a"));
        assert!(db.get_collection("a").is_none());
        assert_eq!(db.collection("a").count_documents(&Filter::True), 0);
    }

    #[test]
    fn aggregate_resolves_lookups_in_the_same_database() {
        let db = Database::new("shop");
        db.collection("orders").insert_one(&mut doc! { "_id": 1, "sku": "a" }).unwrap();
        db.collection("items").insert_one(&mut doc! { "_id": 2, "sku": "a" }).unwrap();
        let out = db
            .aggregate("orders", &Pipeline::new(vec![stages::lookup("items", "sku", "sku", "item")]))
            .unwrap();
        assert_eq!(out[0].get_array("item").unwrap().len(), 1);
    }
}
