//! Data node connectors
//!
//! A connector stores the value behind a data node. Data nodes name their
//! connector through a storage type string resolved in the
//! [`ConnectorRegistry`](crate::registry::ConnectorRegistry).

use crate::ids::DataNodeId;
use dashmap::DashMap;
use serde_json::Value;

/// Storage type of the built-in [`InMemoryConnector`]
pub const IN_MEMORY: &str = "in_memory";

/// Reads and writes the value of a data node
pub trait Connector: Send + Sync {
    /// Current value, `None` if nothing was written yet
    ///
    /// # Errors
    /// Returns error if the backing storage cannot be read
    fn read(&self, id: &DataNodeId) -> anyhow::Result<Option<Value>>;

    /// Replace the value
    ///
    /// # Errors
    /// Returns error if the backing storage cannot be written
    fn write(&self, id: &DataNodeId, value: Value) -> anyhow::Result<()>;

    /// Drop the value; removing an absent value is not an error
    ///
    /// # Errors
    /// Returns error if the backing storage cannot be written
    fn remove(&self, id: &DataNodeId) -> anyhow::Result<()>;
}

/// Process-local connector keyed by data node id
#[derive(Debug, Default)]
pub struct InMemoryConnector {
    values: DashMap<DataNodeId, Value>,
}

impl InMemoryConnector {
    /// Create empty connector
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if connector holds no value
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Connector for InMemoryConnector {
    fn read(&self, id: &DataNodeId) -> anyhow::Result<Option<Value>> {
        Ok(self.values.get(id).map(|v| v.value().clone()))
    }

    fn write(&self, id: &DataNodeId, value: Value) -> anyhow::Result<()> {
        self.values.insert(id.clone(), value);
        Ok(())
    }

    fn remove(&self, id: &DataNodeId) -> anyhow::Result<()> {
        self.values.remove(id);
        Ok(())
    }
}
