//! Table and connection lookup

use std::sync::Arc;

use indexmap::IndexMap;

use ormsync_core::Connection;

use crate::object::ObjectConfig;

/// Resolves where an object's table lives
pub trait TableLocator: Send + Sync {
    /// Prefix added to tables of objects with `use_db_prefix`
    fn prefix(&self) -> &str;

    /// Connection named by the object's `connection` key
    fn connection(&self, config: &ObjectConfig) -> Option<Arc<dyn Connection>>;

    /// Physical table name, prefix included
    fn table_name(&self, config: &ObjectConfig) -> String {
        if config.use_db_prefix {
            format!("{}{}", self.prefix(), config.table)
        } else {
            config.table.clone()
        }
    }

    /// Called after an object's table was renamed
    fn refresh_table(&self, _object: &str, _table: &str) {}
}

/// Fixed set of named connections sharing one prefix
pub struct StaticLocator {
    prefix: String,
    connections: IndexMap<String, Arc<dyn Connection>>,
}

impl StaticLocator {
    /// Locator with `connection` registered as `default`
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        let mut connections = IndexMap::new();
        connections.insert("default".to_string(), connection);
        Self {
            prefix: String::new(),
            connections,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_connection(
        mut self,
        name: impl Into<String>,
        connection: Arc<dyn Connection>,
    ) -> Self {
        self.connections.insert(name.into(), connection);
        self
    }
}

impl TableLocator for StaticLocator {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn connection(&self, config: &ObjectConfig) -> Option<Arc<dyn Connection>> {
        self.connections.get(&config.connection).cloned()
    }
}
