//! Scenario entity

use crate::ids::{CycleId, PipelineId, ScenarioId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use strata_store::Entity;

/// Pipelines realized together under one scenario id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    id: ScenarioId,
    config_id: String,
    pipelines: Vec<PipelineId>,
    cycle_id: Option<CycleId>,
    creation_date: DateTime<Utc>,
    name: Option<String>,
    tags: BTreeSet<String>,
    properties: IndexMap<String, Value>,
}

impl Scenario {
    /// Create scenario without pipelines
    #[must_use]
    pub fn new(id: ScenarioId, config_id: impl Into<String>, creation_date: DateTime<Utc>) -> Self {
        Self {
            id,
            config_id: config_id.into(),
            pipelines: Vec::new(),
            cycle_id: None,
            creation_date,
            name: None,
            tags: BTreeSet::new(),
            properties: IndexMap::new(),
        }
    }

    /// Set pipelines
    #[must_use]
    pub fn with_pipelines(mut self, pipelines: Vec<PipelineId>) -> Self {
        self.pipelines = pipelines;
        self
    }

    /// Attach to a cycle
    #[must_use]
    pub fn with_cycle(mut self, cycle_id: Option<CycleId>) -> Self {
        self.cycle_id = cycle_id;
        self
    }

    /// Set display name
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Set properties
    #[must_use]
    pub fn with_properties(mut self, properties: IndexMap<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    /// Add tag, returning `false` if already present
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    /// Remove tag, returning whether it was present
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    /// Check for tag
    #[inline]
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ScenarioId {
        &self.id
    }

    /// Config id
    #[inline]
    #[must_use]
    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    /// Pipeline ids in config order
    #[inline]
    #[must_use]
    pub fn pipelines(&self) -> &[PipelineId] {
        &self.pipelines
    }

    /// Cycle the scenario belongs to
    #[inline]
    #[must_use]
    pub fn cycle_id(&self) -> Option<&CycleId> {
        self.cycle_id.as_ref()
    }

    /// Creation time
    #[inline]
    #[must_use]
    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Tags, sorted
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Properties
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }
}

impl Entity for Scenario {
    const KIND: &'static str = "scenario";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn config_id(&self) -> &str {
        &self.config_id
    }
}
