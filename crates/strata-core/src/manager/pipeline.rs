//! Pipeline manager
//!
//! Realizes pipeline configs, submits pipelines in dependency order, keeps
//! their subscriber lists and performs the pipeline-level hard delete.

use crate::config::PipelineConfig;
use crate::dispatch::{Dispatcher, JobCallback};
use crate::entities::{DataNode, Job, Pipeline, Task};
use crate::error::{OrchestratorError, Result};
use crate::ids::PipelineId;
use crate::manager::{realize, Created, DataManager, EntityManager, TaskManager};
use crate::observability::orchestration_span;
use crate::registry::SubscriberRegistry;
use crate::scheduler;
use crate::scope::{self, ContextKey, ExecutionContext, Scope};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use strata_store::KeyIndex;

/// Pipeline realization, submission and subscription
#[derive(Debug)]
pub struct PipelineManager {
    store: Arc<EntityManager<Pipeline>>,
    keys: KeyIndex<ContextKey>,
    tasks: Arc<TaskManager>,
    data: Arc<DataManager>,
    dispatcher: Arc<Dispatcher>,
    subscribers: Arc<SubscriberRegistry>,
    subscriptions: Mutex<()>,
}

impl PipelineManager {
    /// Create manager over a pipeline store shared with the dispatcher
    #[must_use]
    pub fn new(
        store: Arc<EntityManager<Pipeline>>,
        tasks: Arc<TaskManager>,
        data: Arc<DataManager>,
        dispatcher: Arc<Dispatcher>,
        subscribers: Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            store,
            keys: KeyIndex::new(),
            tasks,
            data,
            dispatcher,
            subscribers,
            subscriptions: Mutex::new(()),
        }
    }

    /// Reuse or create the pipeline for `config` in `context`.
    ///
    /// The pipeline's scope is the narrowest scope its task configs reach.
    /// A reused pipeline is returned as stored; a new one realizes its tasks
    /// with the new pipeline id in context, so `PIPELINE` scoped tasks and
    /// data nodes are owned by it. If the pipeline cannot be realized, the
    /// tasks and data nodes created for it are deleted again.
    ///
    /// # Errors
    /// Task or data node realization and store failures
    pub fn get_or_create(
        &self,
        config: &PipelineConfig,
        context: &ExecutionContext,
    ) -> Result<Pipeline> {
        let scope = config.effective_scope();
        let resolution = scope::resolve(config.id(), scope, context);
        let owner = match scope {
            Scope::Pipeline | Scope::Scenario => context.scenario_id().map(ToString::to_string),
            Scope::Cycle => context.cycle_id().map(ToString::to_string),
            Scope::Global => None,
        };

        let mut created = Created::default();
        let result = realize(&self.store, &self.keys, resolution, || {
            let id = PipelineId::generate(config.id());
            let task_context = context.clone().with_pipeline(id.clone());
            let tasks = self
                .tasks
                .realize_many(config.tasks(), &task_context, &mut created)?;
            Ok(Pipeline::new(id, config.id())
                .with_scope(scope)
                .with_owner(owner)
                .with_tasks(tasks.iter().map(|t| t.id().clone()).collect()))
        });
        let realized = match result {
            Ok(realized) => realized,
            Err(e) => {
                self.tasks.discard(&created);
                return Err(e);
            }
        };

        tracing::debug!(
            pipeline_id = %realized.entity.id(),
            config_id = config.id(),
            scope = %scope,
            reused = realized.reused,
            "resolved pipeline"
        );
        Ok(realized.entity)
    }

    /// Run every task of the pipeline in dependency order
    ///
    /// # Errors
    /// `NonExistingPipeline`, `NonExistingTask`, `NonExistingDataNode`, or
    /// `GraphHasCycle`; nothing is dispatched on error
    pub fn submit(&self, id: &PipelineId, callbacks: &[JobCallback]) -> Result<Vec<Job>> {
        let _span = orchestration_span("submit_pipeline", id.as_str()).entered();
        let pipeline = self.get(id)?;
        let tasks = self.load_tasks(&pipeline)?;
        let ordered = scheduler::order(tasks)?;

        tracing::info!(pipeline_id = %id, tasks = ordered.len(), "submitting pipeline");
        self.dispatcher.dispatch(ordered, Some(pipeline.id()), callbacks)
    }

    /// Pipeline tasks grouped by dependency level
    ///
    /// # Errors
    /// Same as [`PipelineManager::submit`]
    pub fn sorted_tasks(&self, id: &PipelineId) -> Result<Vec<Vec<Task>>> {
        let pipeline = self.get(id)?;
        scheduler::levels(self.load_tasks(&pipeline)?)
    }

    /// Data nodes of the pipeline's tasks keyed by config id
    ///
    /// # Errors
    /// `NonExistingPipeline`, `NonExistingTask` or `NonExistingDataNode`
    pub fn data_nodes(&self, id: &PipelineId) -> Result<IndexMap<String, DataNode>> {
        let pipeline = self.get(id)?;
        let mut nodes = IndexMap::new();
        for task in self.load_tasks(&pipeline)? {
            for node_id in task.data_node_ids() {
                let node = self.data.get(node_id)?;
                nodes.insert(node.config_id().to_string(), node);
            }
        }
        Ok(nodes)
    }

    fn load_tasks(&self, pipeline: &Pipeline) -> Result<Vec<Task>> {
        pipeline.tasks().iter().map(|id| self.tasks.get(id)).collect()
    }

    /// Register subscriber `name` on one pipeline, or on every pipeline
    /// stored right now when `pipeline` is `None`
    ///
    /// # Errors
    /// `UnknownSubscriber` if `name` is not registered, `NonExistingPipeline`
    /// if the target is missing
    pub fn subscribe(&self, name: &str, pipeline: Option<&PipelineId>) -> Result<()> {
        if !self.subscribers.contains(name) {
            return Err(OrchestratorError::UnknownSubscriber {
                name: name.to_string(),
            });
        }

        let _guard = self.subscriptions.lock();
        let targets = match pipeline {
            Some(id) => vec![self.get(id)?],
            None => self.store.get_all()?,
        };
        for mut target in targets {
            if target.subscribe(name) {
                self.store.set(&target)?;
            }
        }
        tracing::debug!(subscriber = name, pipeline_id = ?pipeline, "subscribed");
        Ok(())
    }

    /// Remove subscriber `name` from one pipeline, or from every stored
    /// pipeline when `pipeline` is `None`
    ///
    /// # Errors
    /// `SubscriptionNotFound` if the target pipeline (or, for `None`, every
    /// pipeline) lacks the subscriber
    pub fn unsubscribe(&self, name: &str, pipeline: Option<&PipelineId>) -> Result<()> {
        let _guard = self.subscriptions.lock();
        let targets = match pipeline {
            Some(id) => vec![self.get(id)?],
            None => self.store.get_all()?,
        };

        let mut removed = false;
        for mut target in targets {
            if target.unsubscribe(name) {
                self.store.set(&target)?;
                removed = true;
            }
        }
        if !removed {
            return Err(OrchestratorError::SubscriptionNotFound {
                subscriber: name.to_string(),
                pipeline: pipeline.map(ToString::to_string),
            });
        }
        tracing::debug!(subscriber = name, pipeline_id = ?pipeline, "unsubscribed");
        Ok(())
    }

    /// Delete the pipeline, then every `PIPELINE` scoped task it references
    /// together with the task's jobs and `PIPELINE` scoped data nodes.
    ///
    /// Broader-scoped tasks and data nodes are left for their owners.
    ///
    /// # Errors
    /// `NonExistingPipeline` if not stored
    pub fn hard_delete(&self, id: &PipelineId) -> Result<()> {
        let pipeline = self.get(id)?;
        self.delete(id)?;

        let mut deleted = 0;
        for task_id in pipeline.tasks() {
            match self.tasks.find(task_id)? {
                Some(task) if task.scope() == Scope::Pipeline => {
                    self.tasks.hard_delete(task_id)?;
                    deleted += 1;
                }
                _ => {}
            }
        }
        tracing::info!(pipeline_id = %id, tasks = deleted, "pipeline hard deleted");
        Ok(())
    }

    /// Load pipeline
    ///
    /// # Errors
    /// `NonExistingPipeline` if not stored
    pub fn get(&self, id: &PipelineId) -> Result<Pipeline> {
        self.store.get(id.as_str())
    }

    /// Load pipeline, `None` if absent
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn find(&self, id: &PipelineId) -> Result<Option<Pipeline>> {
        self.store.find(id.as_str())
    }

    /// Check if stored
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn exists(&self, id: &PipelineId) -> Result<bool> {
        self.store.exists(id.as_str())
    }

    /// Every pipeline
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all(&self) -> Result<Vec<Pipeline>> {
        self.store.get_all()
    }

    /// Pipelines realized from `config_id`
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all_by_config_id(&self, config_id: &str) -> Result<Vec<Pipeline>> {
        self.store.get_all_by_config_id(config_id)
    }

    /// Pipelines owned by `owner_id`
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all_by_owner(&self, owner_id: &str) -> Result<Vec<Pipeline>> {
        self.store.get_all_by_owner(owner_id)
    }

    /// Save, replacing the stored copy
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn set(&self, pipeline: &Pipeline) -> Result<()> {
        self.store.set(pipeline)
    }

    /// Delete the pipeline entity and its key registration only
    ///
    /// # Errors
    /// `NonExistingPipeline` if not stored
    pub fn delete(&self, id: &PipelineId) -> Result<()> {
        self.keys.remove_id(id.as_str());
        self.store.delete(id.as_str())
    }

    /// Delete several pipelines, returning how many existed
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn delete_many(&self, ids: &[PipelineId]) -> Result<usize> {
        for id in ids {
            self.keys.remove_id(id.as_str());
        }
        let ids: Vec<&str> = ids.iter().map(PipelineId::as_str).collect();
        self.store.delete_many(&ids)
    }

    /// Clear the store
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn delete_all(&self) -> Result<()> {
        self.keys.clear();
        self.store.delete_all()
    }
}
