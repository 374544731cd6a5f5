//! Scenario manager
//!
//! A scenario is always freshly created. Its pipelines are realized with the
//! scenario id (and cycle id, when the config has a frequency) in context, so
//! `SCENARIO` and `CYCLE` scoped entities are shared exactly as wide as their
//! scope allows.

use crate::config::ScenarioConfig;
use crate::dispatch::JobCallback;
use crate::entities::{Job, Scenario};
use crate::error::{OrchestratorError, Result};
use crate::ids::{CycleId, PipelineId, ScenarioId};
use crate::manager::{CycleManager, DataManager, EntityManager, PipelineManager, TaskManager};
use crate::observability::orchestration_span;
use crate::scope::{ExecutionContext, Scope};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use strata_store::Repository;

/// Scenario creation, submission and cascading deletion
#[derive(Debug)]
pub struct ScenarioManager {
    store: EntityManager<Scenario>,
    cycles: Arc<CycleManager>,
    pipelines: Arc<PipelineManager>,
    tasks: Arc<TaskManager>,
    data: Arc<DataManager>,
}

impl ScenarioManager {
    /// Create manager
    #[must_use]
    pub fn new(
        repository: Arc<dyn Repository<Scenario>>,
        cycles: Arc<CycleManager>,
        pipelines: Arc<PipelineManager>,
        tasks: Arc<TaskManager>,
        data: Arc<DataManager>,
    ) -> Self {
        Self {
            store: EntityManager::new(repository),
            cycles,
            pipelines,
            tasks,
            data,
        }
    }

    /// Create a scenario from `config`.
    ///
    /// `creation_date` defaults to now and selects the cycle when the config
    /// has a frequency.
    ///
    /// # Errors
    /// Cycle, pipeline or store failures
    pub fn create(
        &self,
        config: &ScenarioConfig,
        creation_date: Option<DateTime<Utc>>,
        name: Option<String>,
    ) -> Result<Scenario> {
        let creation_date = creation_date.unwrap_or_else(Utc::now);
        let cycle = config
            .frequency()
            .map(|frequency| self.cycles.get_or_create(frequency, creation_date))
            .transpose()?;

        let id = ScenarioId::generate(config.id());
        let mut context = ExecutionContext::new().with_scenario(id.clone());
        if let Some(cycle) = &cycle {
            context = context.with_cycle(cycle.id().clone());
        }

        let pipelines = config
            .pipelines()
            .iter()
            .map(|pc| {
                self.pipelines
                    .get_or_create(pc, &context)
                    .map(|p| p.id().clone())
            })
            .collect::<Result<Vec<PipelineId>>>()?;

        let scenario = Scenario::new(id, config.id(), creation_date)
            .with_pipelines(pipelines)
            .with_cycle(cycle.map(|c| c.id().clone()))
            .with_name(name)
            .with_properties(config.properties().clone());
        self.store.set(&scenario)?;

        tracing::info!(
            scenario_id = %scenario.id(),
            config_id = config.id(),
            pipelines = scenario.pipelines().len(),
            cycle_id = ?scenario.cycle_id(),
            "scenario created"
        );
        Ok(scenario)
    }

    /// Submit every pipeline of the scenario in order
    ///
    /// # Errors
    /// `NonExistingScenario`, or the first pipeline submission failure
    pub fn submit(&self, id: &ScenarioId, callbacks: &[JobCallback]) -> Result<Vec<Job>> {
        let _span = orchestration_span("submit_scenario", id.as_str()).entered();
        let scenario = self.get(id)?;
        let mut jobs = Vec::new();
        for pipeline_id in scenario.pipelines() {
            jobs.extend(self.pipelines.submit(pipeline_id, callbacks)?);
        }
        Ok(jobs)
    }

    /// Subscribe `name` to every pipeline of the scenario
    ///
    /// # Errors
    /// `NonExistingScenario`, `UnknownSubscriber` or `NonExistingPipeline`
    pub fn subscribe(&self, name: &str, id: &ScenarioId) -> Result<()> {
        let scenario = self.get(id)?;
        for pipeline_id in scenario.pipelines() {
            self.pipelines.subscribe(name, Some(pipeline_id))?;
        }
        Ok(())
    }

    /// Unsubscribe `name` from every pipeline of the scenario having it
    ///
    /// # Errors
    /// `SubscriptionNotFound` if no pipeline of the scenario had it
    pub fn unsubscribe(&self, name: &str, id: &ScenarioId) -> Result<()> {
        let scenario = self.get(id)?;
        let mut removed = false;
        for pipeline_id in scenario.pipelines() {
            match self.pipelines.unsubscribe(name, Some(pipeline_id)) {
                Ok(()) => removed = true,
                Err(OrchestratorError::SubscriptionNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if removed {
            Ok(())
        } else {
            Err(OrchestratorError::SubscriptionNotFound {
                subscriber: name.to_string(),
                pipeline: None,
            })
        }
    }

    /// Tag scenario, returning the saved copy
    ///
    /// # Errors
    /// `NonExistingScenario` if not stored
    pub fn add_tag(&self, id: &ScenarioId, tag: &str) -> Result<Scenario> {
        let mut scenario = self.get(id)?;
        if scenario.add_tag(tag) {
            self.store.set(&scenario)?;
        }
        Ok(scenario)
    }

    /// Remove tag, returning the saved copy
    ///
    /// # Errors
    /// `NonExistingScenario` if not stored
    pub fn remove_tag(&self, id: &ScenarioId, tag: &str) -> Result<Scenario> {
        let mut scenario = self.get(id)?;
        if scenario.remove_tag(tag) {
            self.store.set(&scenario)?;
        }
        Ok(scenario)
    }

    /// Delete the scenario and what it exclusively owns.
    ///
    /// Pipelines of `PIPELINE` or `SCENARIO` scope are hard deleted, then
    /// tasks and data nodes owned by the scenario. Cycle and global scoped
    /// entities stay.
    ///
    /// # Errors
    /// `NonExistingScenario` if not stored
    pub fn hard_delete(&self, id: &ScenarioId) -> Result<()> {
        let scenario = self.get(id)?;

        let mut pipelines = 0;
        for pipeline_id in scenario.pipelines() {
            match self.pipelines.find(pipeline_id)? {
                Some(pipeline) if pipeline.scope() >= Scope::Scenario => {
                    self.pipelines.hard_delete(pipeline_id)?;
                    pipelines += 1;
                }
                _ => {}
            }
        }
        let tasks = self.delete_owned(id.as_str())?;
        self.store.delete(id.as_str())?;

        tracing::info!(scenario_id = %id, pipelines, tasks, "scenario hard deleted");
        Ok(())
    }

    /// Delete the cycle, hard deleting its scenarios and the entities the
    /// cycle owns
    ///
    /// # Errors
    /// `NonExistingCycle` if not stored
    pub fn hard_delete_cycle(&self, id: &CycleId) -> Result<()> {
        self.cycles.get(id)?;

        let scenarios = self.get_all_by_cycle(id)?;
        for scenario in &scenarios {
            self.hard_delete(scenario.id())?;
        }
        for pipeline in self.pipelines.get_all_by_owner(id.as_str())? {
            self.pipelines.hard_delete(pipeline.id())?;
        }
        self.delete_owned(id.as_str())?;
        self.cycles.delete(id)?;

        tracing::info!(cycle_id = %id, scenarios = scenarios.len(), "cycle hard deleted");
        Ok(())
    }

    fn delete_owned(&self, owner_id: &str) -> Result<usize> {
        let tasks = self.tasks.get_all_by_owner(owner_id)?;
        for task in &tasks {
            self.tasks.hard_delete(task.id())?;
        }
        self.data.delete_by_owner(owner_id)?;
        Ok(tasks.len())
    }

    /// Load scenario
    ///
    /// # Errors
    /// `NonExistingScenario` if not stored
    pub fn get(&self, id: &ScenarioId) -> Result<Scenario> {
        self.store.get(id.as_str())
    }

    /// Load scenario, `None` if absent
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn find(&self, id: &ScenarioId) -> Result<Option<Scenario>> {
        self.store.find(id.as_str())
    }

    /// Check if stored
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn exists(&self, id: &ScenarioId) -> Result<bool> {
        self.store.exists(id.as_str())
    }

    /// Every scenario
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all(&self) -> Result<Vec<Scenario>> {
        self.store.get_all()
    }

    /// Scenarios created from `config_id`
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all_by_config_id(&self, config_id: &str) -> Result<Vec<Scenario>> {
        self.store.get_all_by_config_id(config_id)
    }

    /// Scenarios attached to the cycle
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all_by_cycle(&self, cycle_id: &CycleId) -> Result<Vec<Scenario>> {
        self.store.get_all_by_owner(cycle_id.as_str())
    }

    /// Scenarios carrying `tag`
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all_by_tag(&self, tag: &str) -> Result<Vec<Scenario>> {
        self.store.get_all_by(&|s: &Scenario| s.has_tag(tag))
    }

    /// Save, replacing the stored copy
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn set(&self, scenario: &Scenario) -> Result<()> {
        self.store.set(scenario)
    }

    /// Delete the scenario entity only
    ///
    /// # Errors
    /// `NonExistingScenario` if not stored
    pub fn delete(&self, id: &ScenarioId) -> Result<()> {
        self.store.delete(id.as_str())
    }

    /// Delete several scenarios, returning how many existed
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn delete_many(&self, ids: &[ScenarioId]) -> Result<usize> {
        let ids: Vec<&str> = ids.iter().map(ScenarioId::as_str).collect();
        self.store.delete_many(&ids)
    }

    /// Clear the store
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn delete_all(&self) -> Result<()> {
        self.store.delete_all()
    }
}
