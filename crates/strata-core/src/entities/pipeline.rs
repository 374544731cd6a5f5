//! Pipeline entity

use crate::ids::{PipelineId, TaskId};
use crate::scope::{ContextKey, Scope};
use serde::{Deserialize, Serialize};
use strata_store::Entity;

/// Ordered task set with persistent subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    id: PipelineId,
    config_id: String,
    scope: Scope,
    owner_id: Option<String>,
    tasks: Vec<TaskId>,
    subscribers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context_key: Option<ContextKey>,
}

impl Pipeline {
    /// Create pipeline without tasks, `PIPELINE` scoped
    #[must_use]
    pub fn new(id: PipelineId, config_id: impl Into<String>) -> Self {
        Self {
            id,
            config_id: config_id.into(),
            scope: Scope::Pipeline,
            owner_id: None,
            tasks: Vec::new(),
            subscribers: Vec::new(),
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

    /// Set tasks
    #[must_use]
    pub fn with_tasks(mut self, tasks: Vec<TaskId>) -> Self {
        self.tasks = tasks;
        self
    }

    /// Add subscriber name, returning `false` if already present
    pub fn subscribe(&mut self, name: &str) -> bool {
        if self.subscribers.iter().any(|s| s == name) {
            return false;
        }
        self.subscribers.push(name.to_string());
        true
    }

    /// Remove subscriber name, returning whether it was present
    pub fn unsubscribe(&mut self, name: &str) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s != name);
        self.subscribers.len() != before
    }

    /// Id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &PipelineId {
        &self.id
    }

    /// Config id
    #[inline]
    #[must_use]
    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    /// Effective scope
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Owning scenario or cycle id
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

    /// Task ids in config order
    #[inline]
    #[must_use]
    pub fn tasks(&self) -> &[TaskId] {
        &self.tasks
    }

    /// Subscriber names in subscription order
    #[inline]
    #[must_use]
    pub fn subscribers(&self) -> &[String] {
        &self.subscribers
    }
}

impl Entity for Pipeline {
    const KIND: &'static str = "pipeline";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn config_id(&self) -> &str {
        &self.config_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_behave_as_a_set() {
        let mut pipeline = Pipeline::new(PipelineId::from("p"), "p");
        assert!(pipeline.subscribe("a"));
        assert!(!pipeline.subscribe("a"));
        assert!(pipeline.subscribe("b"));
        assert_eq!(pipeline.subscribers(), ["a", "b"]);

        assert!(pipeline.unsubscribe("a"));
        assert!(!pipeline.unsubscribe("a"));
        assert_eq!(pipeline.subscribers(), ["b"]);
    }
}
