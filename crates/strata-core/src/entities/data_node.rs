//! Data node entity

use crate::config::DataNodeConfig;
use crate::ids::{DataNodeId, JobId};
use crate::scope::{ContextKey, Scope};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_store::Entity;

/// One recorded write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// When the value was written
    pub timestamp: DateTime<Utc>,
    /// Job that wrote it, `None` for default data and manual writes
    pub job_id: Option<JobId>,
}

/// Addressable data artifact; its value lives in a connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataNode {
    id: DataNodeId,
    config_id: String,
    scope: Scope,
    storage_type: String,
    owner_id: Option<String>,
    properties: IndexMap<String, Value>,
    last_edit_date: Option<DateTime<Utc>>,
    edits: Vec<Edit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context_key: Option<ContextKey>,
}

impl DataNode {
    /// Create never-written data node
    #[must_use]
    pub fn new(
        id: DataNodeId,
        config_id: impl Into<String>,
        scope: Scope,
        storage_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            config_id: config_id.into(),
            scope,
            storage_type: storage_type.into(),
            owner_id: None,
            properties: IndexMap::new(),
            last_edit_date: None,
            edits: Vec::new(),
            context_key: None,
        }
    }

    /// Instantiate `config` under a fresh id
    #[must_use]
    pub fn from_config(config: &DataNodeConfig, owner_id: Option<String>) -> Self {
        let mut node = Self::new(
            DataNodeId::generate(config.id()),
            config.id(),
            config.scope(),
            config.storage_type(),
        );
        node.owner_id = owner_id;
        node.properties = config.properties().clone();
        node
    }

    /// Set owner
    #[must_use]
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &DataNodeId {
        &self.id
    }

    /// Config id
    #[inline]
    #[must_use]
    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    /// Scope
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Connector storage type
    #[inline]
    #[must_use]
    pub fn storage_type(&self) -> &str {
        &self.storage_type
    }

    /// Owning pipeline, scenario or cycle id
    #[inline]
    #[must_use]
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// Properties
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    /// Time of the last write
    #[inline]
    #[must_use]
    pub fn last_edit_date(&self) -> Option<DateTime<Utc>> {
        self.last_edit_date
    }

    /// Write history, oldest first
    #[inline]
    #[must_use]
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Context key the node was realized for, `None` when never shared
    #[inline]
    #[must_use]
    pub fn context_key(&self) -> Option<&ContextKey> {
        self.context_key.as_ref()
    }

    pub(crate) fn set_context_key(&mut self, key: ContextKey) {
        self.context_key = Some(key);
    }

    /// Whether a value was ever written
    #[inline]
    #[must_use]
    pub fn is_ready_for_reading(&self) -> bool {
        self.last_edit_date.is_some()
    }

    pub(crate) fn record_edit(&mut self, job_id: Option<JobId>) {
        let timestamp = Utc::now();
        self.last_edit_date = Some(timestamp);
        self.edits.push(Edit { timestamp, job_id });
    }
}

impl Entity for DataNode {
    const KIND: &'static str = "data_node";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn config_id(&self) -> &str {
        &self.config_id
    }
}
