//! Entry point that owns the databases reachable through one connection string.
//!
//! There is no transport: the connection string is parsed and validated, and databases
//! live in process memory for as long as the client does.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::Database;
use crate::config::ConnectionString;
use crate::errors::DbError;

#[derive(Debug)]
pub struct Client {
    connection: ConnectionString,
    databases: RwLock<HashMap<String, Database>>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// A client for `mongodb://localhost:27017`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connection(ConnectionString::default())
    }

    /// Parses `uri` and builds a client from it.
    ///
    /// # Errors
    /// `Configuration` when `uri` is not a valid connection string.
    pub fn with_uri_str(uri: &str) -> Result<Self, DbError> {
        Ok(Self::with_connection(ConnectionString::parse(uri)?))
    }

    #[must_use]
    pub fn with_connection(connection: ConnectionString) -> Self {
        log::debug!("client for {connection}");
        Self { connection, databases: RwLock::new(HashMap::new()) }
    }

    #[must_use]
    pub const fn connection_string(&self) -> &ConnectionString {
        &self.connection
    }

    /// Returns the named database, creating it on first reference. Every call with the
    /// same name shares the same collections.
    pub fn database(&self, name: &str) -> Database {
        if let Some(db) = self.databases.read().get(name) {
            return db.clone();
        }
        self.databases.write().entry(name.to_string()).or_insert_with(|| Database::new(name)).clone()
    }

    /// The database named in the connection string path, if any.
    #[must_use]
    pub fn default_database(&self) -> Option<Database> {
        self.connection.database.as_deref().map(|name| self.database(name))
    }

    /// Drops the database and every collection in it. Handles held elsewhere see empty
    /// collections afterwards.
    pub fn drop_database(&self, name: &str) -> bool {
        let removed = self.databases.write().remove(name);
        match removed {
            Some(db) => {
                db.clear();
                log::info!("dropped database {name}");
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn list_database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.read().keys().cloned().collect();
        names.sort();
        names
    }
}
