//! Named connections.

use crate::client::{Connection, Database};
use crate::config::OrmConfig;
use crate::error::{OrmError, OrmResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

const REGISTRY_TARGET: &str = "activerow.registry";

/// Maps connection names to [`Database`] handles.
///
/// The registry is an ordinary value: create one at startup and pass it (or an
/// `Arc` of it) to the code that runs queries. Registration replaces any
/// connection already stored under the same name.
#[derive(Debug)]
pub struct ConnectionRegistry {
    config: Arc<OrmConfig>,
    connections: RwLock<HashMap<String, Database>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::with_config(OrmConfig::default())
    }

    pub fn with_config(config: OrmConfig) -> Self {
        Self {
            config: Arc::new(config),
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    /// Register `conn` under `name`, resolving its dialect.
    ///
    /// Fails with [`OrmError::Config`] when the driver is not one of the supported dialects.
    pub fn set_connection<C: Connection + 'static>(&self, name: &str, conn: C) -> OrmResult<Database> {
        self.set_shared_connection(name, Arc::new(conn))
    }

    /// Like [`set_connection`](Self::set_connection) for a driver that is already shared.
    pub fn set_shared_connection(&self, name: &str, conn: Arc<dyn Connection>) -> OrmResult<Database> {
        let db = Database::with_config(conn, Arc::clone(&self.config))?;
        tracing::debug!(
            target: REGISTRY_TARGET,
            name,
            dialect = db.dialect().name(),
            "connection registered"
        );
        self.write()?.insert(name.to_string(), db.clone());
        Ok(db)
    }

    /// Look up a registered connection.
    pub fn connection(&self, name: &str) -> OrmResult<Database> {
        self.read()?
            .get(name)
            .cloned()
            .ok_or_else(|| OrmError::connection_not_found(name))
    }

    /// The connection named by [`OrmConfig::default_connection`].
    pub fn default_connection(&self) -> OrmResult<Database> {
        self.connection(&self.config.default_connection)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().map(|c| c.contains_key(name)).unwrap_or(false)
    }

    /// Remove a connection, returning it if it was registered.
    pub fn remove(&self, name: &str) -> OrmResult<Option<Database>> {
        let removed = self.write()?.remove(name);
        if removed.is_some() {
            tracing::debug!(target: REGISTRY_TARGET, name, "connection removed");
        }
        Ok(removed)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names = self
            .read()
            .map(|c| c.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn read(&self) -> OrmResult<std::sync::RwLockReadGuard<'_, HashMap<String, Database>>> {
        self.connections
            .read()
            .map_err(|_| OrmError::Other("connection registry lock poisoned".into()))
    }

    fn write(&self) -> OrmResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Database>>> {
        self.connections
            .write()
            .map_err(|_| OrmError::Other("connection registry lock poisoned".into()))
    }
}
