//! Task manager

use crate::config::{DataNodeConfig, TaskConfig};
use crate::dispatch::{Dispatcher, JobCallback};
use crate::entities::{DataNode, Job, Task};
use crate::error::{OrchestratorError, Result};
use crate::ids::{DataNodeId, TaskId};
use crate::manager::{realize, Created, DataManager, EntityManager, JobManager, Realized};
use crate::scope::{self, ContextKey, ExecutionContext, Scope};
use indexmap::IndexMap;
use std::sync::Arc;
use strata_store::{KeyIndex, Repository};

/// Realizes task configs into tasks bound to concrete data nodes
#[derive(Debug)]
pub struct TaskManager {
    store: EntityManager<Task>,
    keys: KeyIndex<ContextKey>,
    data: Arc<DataManager>,
    jobs: Arc<JobManager>,
    dispatcher: Arc<Dispatcher>,
}

impl TaskManager {
    /// Create manager
    #[must_use]
    pub fn new(
        repository: Arc<dyn Repository<Task>>,
        data: Arc<DataManager>,
        jobs: Arc<JobManager>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            store: EntityManager::new(repository),
            keys: KeyIndex::new(),
            data,
            jobs,
            dispatcher,
        }
    }

    /// Reuse or create the task for `config` in `context`, realizing its
    /// data nodes first
    ///
    /// # Errors
    /// Data node realization or store failures
    pub fn get_or_create(&self, config: &TaskConfig, context: &ExecutionContext) -> Result<Task> {
        let mut created = Created::default();
        let result = self
            .data
            .realize_many(config.data_node_configs(), context, &mut created.data_nodes)
            .and_then(|nodes| self.bind(config, context, &nodes));
        match result {
            Ok(realized) => Ok(realized.entity),
            Err(e) => {
                self.discard(&created);
                Err(e)
            }
        }
    }

    /// Realize several task configs.
    ///
    /// The union of their data node configs is realized once, so a data node
    /// produced by one task and consumed by another is the same instance.
    /// Either every task is realized or nothing this call created is kept.
    ///
    /// # Errors
    /// Data node realization or store failures
    pub fn get_or_create_many(
        &self,
        configs: &[Arc<TaskConfig>],
        context: &ExecutionContext,
    ) -> Result<Vec<Task>> {
        let mut created = Created::default();
        match self.realize_many(configs, context, &mut created) {
            Ok(tasks) => Ok(tasks),
            Err(e) => {
                self.discard(&created);
                Err(e)
            }
        }
    }

    /// [`TaskManager::get_or_create_many`] without the rollback; what it
    /// creates is recorded in `created`
    pub(crate) fn realize_many(
        &self,
        configs: &[Arc<TaskConfig>],
        context: &ExecutionContext,
        created: &mut Created,
    ) -> Result<Vec<Task>> {
        let nodes = self.data.realize_many(
            configs.iter().flat_map(|c| c.data_node_configs()),
            context,
            &mut created.data_nodes,
        )?;
        let mut tasks = Vec::with_capacity(configs.len());
        for config in configs {
            let realized = self.bind(config, context, &nodes)?;
            if !realized.reused {
                created.tasks.push(realized.entity.id().clone());
            }
            tasks.push(realized.entity);
        }
        Ok(tasks)
    }

    /// Delete tasks and data nodes created by a failed realization
    pub(crate) fn discard(&self, created: &Created) {
        for id in &created.tasks {
            self.keys.remove_id(id.as_str());
            match self.store.remove(id.as_str()) {
                Ok(_) => tracing::debug!(task_id = %id, "discarded task"),
                Err(e) => tracing::warn!(task_id = %id, error = %e, "cannot discard task"),
            }
        }
        self.data.discard(&created.data_nodes);
    }

    fn bind(
        &self,
        config: &TaskConfig,
        context: &ExecutionContext,
        nodes: &IndexMap<String, DataNode>,
    ) -> Result<Realized<Task>> {
        let scope = config.effective_scope();
        let resolution = scope::resolve(config.id(), scope, context);

        let realized = realize(&self.store, &self.keys, resolution, || {
            let lookup = |configs: &[Arc<DataNodeConfig>]| {
                configs
                    .iter()
                    .map(|dn| {
                        nodes.get(dn.id()).map(|n| n.id().clone()).ok_or_else(|| {
                            OrchestratorError::NonExistingDataNode {
                                id: dn.id().to_string(),
                            }
                        })
                    })
                    .collect::<Result<Vec<DataNodeId>>>()
            };
            Ok(
                Task::new(TaskId::generate(config.id()), config.id(), config.function())
                    .with_scope(scope)
                    .with_owner(context.owner_for(scope))
                    .with_inputs(lookup(config.inputs())?)
                    .with_outputs(lookup(config.outputs())?),
            )
        })?;

        tracing::debug!(
            task_id = %realized.entity.id(),
            config_id = config.id(),
            scope = %scope,
            reused = realized.reused,
            "resolved task"
        );
        Ok(realized)
    }

    /// Load a task whose data nodes are all stored
    ///
    /// # Errors
    /// `NonExistingTask` if not stored, `NonExistingDataNode` if a
    /// referenced data node is missing
    pub fn get(&self, id: &TaskId) -> Result<Task> {
        let task = self.store.get(id.as_str())?;
        for node_id in task.data_node_ids() {
            if !self.data.exists(node_id)? {
                return Err(OrchestratorError::NonExistingDataNode {
                    id: node_id.to_string(),
                });
            }
        }
        Ok(task)
    }

    /// Load task without checking its data nodes, `None` if absent
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn find(&self, id: &TaskId) -> Result<Option<Task>> {
        self.store.find(id.as_str())
    }

    /// Check if stored
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn exists(&self, id: &TaskId) -> Result<bool> {
        self.store.exists(id.as_str())
    }

    /// Every task
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all(&self) -> Result<Vec<Task>> {
        self.store.get_all()
    }

    /// Tasks realized from `config_id`
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all_by_config_id(&self, config_id: &str) -> Result<Vec<Task>> {
        self.store.get_all_by_config_id(config_id)
    }

    /// Tasks owned by `owner_id`
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all_by_owner(&self, owner_id: &str) -> Result<Vec<Task>> {
        self.store.get_all_by_owner(owner_id)
    }

    /// Save, replacing the stored copy
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn set(&self, task: &Task) -> Result<()> {
        self.store.set(task)
    }

    /// Run the task as a single job
    ///
    /// # Errors
    /// `NonExistingTask`/`NonExistingDataNode` if it cannot be loaded
    pub fn submit(&self, id: &TaskId, callbacks: &[JobCallback]) -> Result<Job> {
        let task = self.get(id)?;
        tracing::info!(task_id = %id, "submitting task");
        self.dispatcher.dispatch_task(task, callbacks)
    }

    /// Delete the task entity and its key registration only
    ///
    /// # Errors
    /// `NonExistingTask` if not stored
    pub fn delete(&self, id: &TaskId) -> Result<()> {
        self.keys.remove_id(id.as_str());
        self.store.delete(id.as_str())
    }

    /// Delete several tasks, returning how many existed
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn delete_many(&self, ids: &[TaskId]) -> Result<usize> {
        for id in ids {
            self.keys.remove_id(id.as_str());
        }
        let ids: Vec<&str> = ids.iter().map(TaskId::as_str).collect();
        self.store.delete_many(&ids)
    }

    /// Delete the task, its jobs and the data nodes it exclusively owns
    /// (`PIPELINE` scoped)
    ///
    /// # Errors
    /// `NonExistingTask` if not stored
    pub fn hard_delete(&self, id: &TaskId) -> Result<()> {
        let task = self
            .find(id)?
            .ok_or_else(|| OrchestratorError::NonExistingTask { id: id.to_string() })?;

        let jobs = self.jobs.delete_for_task(id)?;
        let mut nodes = Vec::new();
        for node_id in task.data_node_ids() {
            if let Some(node) = self.data.find(node_id)? {
                if node.scope() == Scope::Pipeline && !nodes.contains(node_id) {
                    nodes.push(node_id.clone());
                }
            }
        }
        let nodes = self.data.delete_many(&nodes)?;
        self.delete(id)?;

        tracing::debug!(task_id = %id, jobs, data_nodes = nodes, "task hard deleted");
        Ok(())
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
