//! Scope resolution
//!
//! A scope bounds how widely one realized entity may be shared. Resolution
//! maps a config id, an effective scope and the ambient [`ExecutionContext`]
//! to a [`ContextKey`]; two requests with equal keys must observe the same
//! entity, and a `PIPELINE` request never matches anything.

use crate::ids::{CycleId, PipelineId, ScenarioId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Sharing breadth of an entity, declared broadest first.
///
/// The derived ordering runs from broadest to narrowest, so the narrowest of
/// several scopes is their maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    /// One instance for the whole process
    Global,
    /// One instance per business cycle
    Cycle,
    /// One instance per scenario
    Scenario,
    /// Never shared
    #[default]
    Pipeline,
}

impl Scope {
    /// Narrowest scope among `scopes`; `Pipeline` when there are none
    #[must_use]
    pub fn narrowest(scopes: impl IntoIterator<Item = Scope>) -> Scope {
        scopes.into_iter().max().unwrap_or(Scope::Pipeline)
    }

    /// Upper-case scope name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Global => "GLOBAL",
            Scope::Cycle => "CYCLE",
            Scope::Scenario => "SCENARIO",
            Scope::Pipeline => "PIPELINE",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ambient ids a realization runs under
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    scenario_id: Option<ScenarioId>,
    cycle_id: Option<CycleId>,
    pipeline_id: Option<PipelineId>,
}

impl ExecutionContext {
    /// Create the process-default context
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current scenario
    #[must_use]
    pub fn with_scenario(mut self, scenario_id: ScenarioId) -> Self {
        self.scenario_id = Some(scenario_id);
        self
    }

    /// Set the current cycle
    #[must_use]
    pub fn with_cycle(mut self, cycle_id: CycleId) -> Self {
        self.cycle_id = Some(cycle_id);
        self
    }

    /// Set the pipeline being realized
    #[must_use]
    pub fn with_pipeline(mut self, pipeline_id: PipelineId) -> Self {
        self.pipeline_id = Some(pipeline_id);
        self
    }

    /// Current scenario
    #[inline]
    #[must_use]
    pub fn scenario_id(&self) -> Option<&ScenarioId> {
        self.scenario_id.as_ref()
    }

    /// Current cycle
    #[inline]
    #[must_use]
    pub fn cycle_id(&self) -> Option<&CycleId> {
        self.cycle_id.as_ref()
    }

    /// Pipeline being realized
    #[inline]
    #[must_use]
    pub fn pipeline_id(&self) -> Option<&PipelineId> {
        self.pipeline_id.as_ref()
    }

    /// Owner of a data node or task realized at `scope` in this context
    #[must_use]
    pub fn owner_for(&self, scope: Scope) -> Option<String> {
        match scope {
            Scope::Pipeline => self.pipeline_id.as_ref().map(ToString::to_string),
            Scope::Scenario => self.scenario_id.as_ref().map(ToString::to_string),
            Scope::Cycle => self.cycle_id.as_ref().map(ToString::to_string),
            Scope::Global => None,
        }
    }
}

/// Derived identity deciding reuse versus creation
///
/// Reusable keys are stored on the entity realized for them, so a reopened
/// store still answers for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKey {
    /// Fresh nonce, matches nothing
    Unique(Uuid),
    /// Shared within one scenario (or among scenario-less requests)
    Scenario {
        /// Config id
        config_id: String,
        /// Scenario, if any
        scenario_id: Option<ScenarioId>,
    },
    /// Shared within one cycle (or among cycle-less requests)
    Cycle {
        /// Config id
        config_id: String,
        /// Cycle, if any
        cycle_id: Option<CycleId>,
    },
    /// Shared by every request for the config
    Global {
        /// Config id
        config_id: String,
    },
}

/// Outcome of [`resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Whether an entity registered under `key` may be returned
    pub reuse: bool,
    /// Storage key of the candidate
    pub key: ContextKey,
}

/// Resolve the context key of a candidate entity.
///
/// `scope` is the candidate's effective scope: a data node's own scope, or
/// the narrowest scope among the data nodes a task or pipeline reaches.
#[must_use]
pub fn resolve(config_id: &str, scope: Scope, context: &ExecutionContext) -> Resolution {
    let config_id = config_id.to_string();
    match scope {
        Scope::Pipeline => Resolution {
            reuse: false,
            key: ContextKey::Unique(Uuid::new_v4()),
        },
        Scope::Scenario => Resolution {
            reuse: true,
            key: ContextKey::Scenario {
                config_id,
                scenario_id: context.scenario_id.clone(),
            },
        },
        Scope::Cycle => Resolution {
            reuse: true,
            key: ContextKey::Cycle {
                config_id,
                cycle_id: context.cycle_id.clone(),
            },
        },
        Scope::Global => Resolution {
            reuse: true,
            key: ContextKey::Global { config_id },
        },
    }
}
