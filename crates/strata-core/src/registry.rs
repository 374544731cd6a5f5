//! Named handler registries
//!
//! Task functions, pipeline subscribers and connectors are registered under
//! a name; entities persist only the name, so they can be reloaded from any
//! repository backend and still resolve to live code.

use crate::connector::Connector;
use crate::entities::{Job, Pipeline};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Task body: input values in position order to output values in position order
pub type TaskFunction = Arc<dyn Fn(&[Value]) -> anyhow::Result<Vec<Value>> + Send + Sync>;

/// Persistent pipeline subscriber, called on every job transition
pub type Subscriber = Arc<dyn Fn(&Pipeline, &Job) -> anyhow::Result<()> + Send + Sync>;

/// Registry of task functions
pub type FunctionRegistry = Registry<TaskFunction>;

/// Registry of pipeline subscribers
pub type SubscriberRegistry = Registry<Subscriber>;

/// Registry of connectors by storage type
pub type ConnectorRegistry = Registry<Arc<dyn Connector>>;

/// Thread-safe name → handler map, kept in registration order
pub struct Registry<T: Clone> {
    entries: RwLock<IndexMap<String, T>>,
}

impl<T: Clone> Registry<T> {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
        }
    }

    /// Register `item` under `name`, returning the handler it replaced
    pub fn register(&self, name: impl Into<String>, item: T) -> Option<T> {
        self.entries.write().insert(name.into(), item)
    }

    /// Handler registered under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<T> {
        self.entries.read().get(name).cloned()
    }

    /// Check if `name` is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Remove handler
    #[inline]
    pub fn remove(&self, name: &str) -> bool {
        self.entries.write().shift_remove(name).is_some()
    }

    /// Registered names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Get number of registered handlers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<T: Clone> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}
