use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::collection::{Collection, is_valid_database_name};

/// Collection registry of one database. Collections are created on first reference.
#[derive(Debug)]
pub struct Engine {
    name: String,
    pub(crate) collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Engine {
    #[must_use]
    pub fn new(name: &str) -> Self {
        if !is_valid_database_name(name) {
            log::warn!("database name '{name}' is invalid; writes will be refused");
        }
        Self { name: name.to_string(), collections: RwLock::new(HashMap::new()) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the named collection, creating it empty if needed.
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        if let Some(c) = self.collections.read().get(name) {
            return Arc::clone(c);
        }
        let mut map = self.collections.write();
        let c = map.entry(name.to_string()).or_insert_with(|| {
            log::debug!("creating collection {}.{name}", self.name);
            Arc::new(Collection::new(&self.name, name))
        });
        Arc::clone(c)
    }

    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    /// Removes the collection. Handles still held elsewhere see it empty.
    pub fn drop_collection(&self, name: &str) -> bool {
        let removed = self.collections.write().remove(name);
        match removed {
            Some(c) => {
                c.clear();
                log::info!("dropped collection {}", c.namespace());
                true
            }
            None => false,
        }
    }

    /// Drops every collection.
    pub fn clear(&self) {
        let drained: Vec<Arc<Collection>> = self.collections.write().drain().map(|(_, c)| c).collect();
        for c in drained {
            c.clear();
        }
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}
