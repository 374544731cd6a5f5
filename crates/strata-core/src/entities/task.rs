//! Task entity

use crate::ids::{DataNodeId, TaskId};
use crate::scope::{ContextKey, Scope};
use serde::{Deserialize, Serialize};
use std::fmt;
use strata_store::Entity;

/// Executable step bound to concrete data nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    config_id: String,
    function: String,
    scope: Scope,
    owner_id: Option<String>,
    inputs: Vec<DataNodeId>,
    outputs: Vec<DataNodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context_key: Option<ContextKey>,
}

impl Task {
    /// Create task without data nodes, `PIPELINE` scoped
    #[must_use]
    pub fn new(id: TaskId, config_id: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            id,
            config_id: config_id.into(),
            function: function.into(),
            scope: Scope::Pipeline,
            owner_id: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            context_key: None,
        }
    }

    /// Set effective scope
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Set owner
    #[must_use]
    pub fn with_owner(mut self, owner_id: Option<String>) -> Self {
        self.owner_id = owner_id;
        self
    }

    /// Set inputs
    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<DataNodeId>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set outputs
    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<DataNodeId>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Config id
    #[inline]
    #[must_use]
    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    /// Registered function name
    #[inline]
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Effective scope
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Owning pipeline, scenario or cycle id
    #[inline]
    #[must_use]
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// Context key the entity was realized for
    #[inline]
    #[must_use]
    pub fn context_key(&self) -> Option<&ContextKey> {
        self.context_key.as_ref()
    }

    pub(crate) fn set_context_key(&mut self, key: ContextKey) {
        self.context_key = Some(key);
    }

    /// Inputs in position order
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &[DataNodeId] {
        &self.inputs
    }

    /// Outputs in position order
    #[inline]
    #[must_use]
    pub fn outputs(&self) -> &[DataNodeId] {
        &self.outputs
    }

    /// Inputs followed by outputs
    pub fn data_node_ids(&self) -> impl Iterator<Item = &DataNodeId> {
        self.inputs.iter().chain(&self.outputs)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id.as_str())
    }
}

impl Entity for Task {
    const KIND: &'static str = "task";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn config_id(&self) -> &str {
        &self.config_id
    }
}
