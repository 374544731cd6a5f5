//! Orchestration context
//!
//! Owns the registries, the dispatcher and one manager per entity kind.
//! Everything is built once by [`OrchestratorBuilder::build`]; independent
//! orchestrators share nothing, so each test can build its own.

use crate::connector::{Connector, InMemoryConnector, IN_MEMORY};
use crate::dispatch::{Dispatcher, FunctionExecutor, JobRunner, TaskExecutor};
use crate::entities::Pipeline;
use crate::error::Result;
use crate::observability;
use crate::manager::{
    CycleManager, DataManager, EntityManager, JobManager, PipelineManager, ScenarioManager,
    TaskManager,
};
use crate::registry::{
    ConnectorRegistry, FunctionRegistry, Subscriber, SubscriberRegistry, TaskFunction,
};
use crate::settings::{OrchestratorConfig, RepositorySettings};
use std::fmt;
use std::sync::Arc;
use strata_store::{Entity, FsRepository, InMemoryRepository, Repository};

/// Store, registries and managers of one orchestration context
#[derive(Debug)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    functions: Arc<FunctionRegistry>,
    subscribers: Arc<SubscriberRegistry>,
    connectors: Arc<ConnectorRegistry>,
    dispatcher: Arc<Dispatcher>,
    data: Arc<DataManager>,
    jobs: Arc<JobManager>,
    tasks: Arc<TaskManager>,
    pipelines: Arc<PipelineManager>,
    cycles: Arc<CycleManager>,
    scenarios: Arc<ScenarioManager>,
}

impl Orchestrator {
    /// Start building an orchestrator with default settings
    #[inline]
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Build with `config` and nothing registered besides the in-memory
    /// connector
    ///
    /// # Errors
    /// Returns error if a repository or the worker pool cannot be created
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        Self::builder().with_config(config).build()
    }

    /// Settings the orchestrator was built with
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Data node manager
    #[inline]
    #[must_use]
    pub fn data(&self) -> &DataManager {
        &self.data
    }

    /// Job manager
    #[inline]
    #[must_use]
    pub fn jobs(&self) -> &JobManager {
        &self.jobs
    }

    /// Task manager
    #[inline]
    #[must_use]
    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    /// Pipeline manager
    #[inline]
    #[must_use]
    pub fn pipelines(&self) -> &PipelineManager {
        &self.pipelines
    }

    /// Cycle manager
    #[inline]
    #[must_use]
    pub fn cycles(&self) -> &CycleManager {
        &self.cycles
    }

    /// Scenario manager
    #[inline]
    #[must_use]
    pub fn scenarios(&self) -> &ScenarioManager {
        &self.scenarios
    }

    /// Job dispatcher
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Task functions
    #[inline]
    #[must_use]
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Pipeline subscribers
    #[inline]
    #[must_use]
    pub fn subscribers(&self) -> &SubscriberRegistry {
        &self.subscribers
    }

    /// Storage connectors
    #[inline]
    #[must_use]
    pub fn connectors(&self) -> &ConnectorRegistry {
        &self.connectors
    }

    /// Register a task function, replacing any function of the same name
    pub fn register_function(&self, name: impl Into<String>, function: TaskFunction) {
        self.functions.register(name, function);
    }

    /// Register a subscriber, replacing any subscriber of the same name
    pub fn register_subscriber(&self, name: impl Into<String>, subscriber: Subscriber) {
        self.subscribers.register(name, subscriber);
    }

    /// Install the global `tracing` subscriber in the configured format
    pub fn init_logging(&self) {
        observability::init_logging(self.config.log_format);
    }

    /// Block until every standalone submission has finished
    pub fn wait_for_all(&self) {
        self.dispatcher.wait_for_all();
    }

    /// Clear every store
    ///
    /// # Errors
    /// First store failure
    pub fn delete_all(&self) -> Result<()> {
        self.scenarios.delete_all()?;
        self.cycles.delete_all()?;
        self.pipelines.delete_all()?;
        self.tasks.delete_all()?;
        self.jobs.delete_all()?;
        self.data.delete_all()?;
        tracing::info!("all stores cleared");
        Ok(())
    }
}

/// Builder for [`Orchestrator`]
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    functions: Vec<(String, TaskFunction)>,
    subscribers: Vec<(String, Subscriber)>,
    connectors: Vec<(String, Arc<dyn Connector>)>,
    executor: Option<Arc<dyn TaskExecutor>>,
}

impl OrchestratorBuilder {
    /// With settings
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// With a task function
    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>, function: TaskFunction) -> Self {
        self.functions.push((name.into(), function));
        self
    }

    /// With a pipeline subscriber
    #[must_use]
    pub fn with_subscriber(mut self, name: impl Into<String>, subscriber: Subscriber) -> Self {
        self.subscribers.push((name.into(), subscriber));
        self
    }

    /// With a connector for `storage_type`; may replace the in-memory one
    #[must_use]
    pub fn with_connector(
        mut self,
        storage_type: impl Into<String>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        self.connectors.push((storage_type.into(), connector));
        self
    }

    /// Run tasks with `executor` instead of the function registry
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    /// Returns error if a repository or the worker pool cannot be created
    pub fn build(self) -> Result<Orchestrator> {
        let functions = Arc::new(FunctionRegistry::new());
        for (name, function) in self.functions {
            functions.register(name, function);
        }
        let subscribers = Arc::new(SubscriberRegistry::new());
        for (name, subscriber) in self.subscribers {
            subscribers.register(name, subscriber);
        }
        let connectors = Arc::new(ConnectorRegistry::new());
        connectors.register(IN_MEMORY, Arc::new(InMemoryConnector::new()) as Arc<dyn Connector>);
        for (storage_type, connector) in self.connectors {
            connectors.register(storage_type, connector);
        }

        let settings = &self.config.repository;
        let data = Arc::new(DataManager::new(
            repository(settings)?,
            Arc::clone(&connectors),
        ));
        let jobs = Arc::new(JobManager::new(repository(settings)?));
        let pipeline_store: Arc<EntityManager<Pipeline>> =
            Arc::new(EntityManager::new(repository(settings)?));

        let executor: Arc<dyn TaskExecutor> = match self.executor {
            Some(executor) => executor,
            None => Arc::new(FunctionExecutor::new(
                Arc::clone(&functions),
                Arc::clone(&data),
            )),
        };
        let runner = JobRunner::new(
            executor,
            Arc::clone(&jobs),
            Arc::clone(&pipeline_store),
            Arc::clone(&subscribers),
        );
        let dispatcher = Arc::new(Dispatcher::new(runner, &self.config.job)?);

        let tasks = Arc::new(TaskManager::new(
            repository(settings)?,
            Arc::clone(&data),
            Arc::clone(&jobs),
            Arc::clone(&dispatcher),
        ));
        let pipelines = Arc::new(PipelineManager::new(
            pipeline_store,
            Arc::clone(&tasks),
            Arc::clone(&data),
            Arc::clone(&dispatcher),
            Arc::clone(&subscribers),
        ));
        let cycles = Arc::new(CycleManager::new(repository(settings)?));
        let scenarios = Arc::new(ScenarioManager::new(
            repository(settings)?,
            Arc::clone(&cycles),
            Arc::clone(&pipelines),
            Arc::clone(&tasks),
            Arc::clone(&data),
        ));

        tracing::info!(
            repository = ?self.config.repository,
            job_mode = ?self.config.job,
            functions = functions.len(),
            "orchestrator ready"
        );
        Ok(Orchestrator {
            config: self.config,
            functions,
            subscribers,
            connectors,
            dispatcher,
            data,
            jobs,
            tasks,
            pipelines,
            cycles,
            scenarios,
        })
    }
}

impl fmt::Debug for OrchestratorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorBuilder")
            .field("config", &self.config)
            .field("functions", &self.functions.len())
            .field("subscribers", &self.subscribers.len())
            .field("connectors", &self.connectors.len())
            .field("custom_executor", &self.executor.is_some())
            .finish()
    }
}

fn repository<E: Entity>(settings: &RepositorySettings) -> Result<Arc<dyn Repository<E>>> {
    let repository: Arc<dyn Repository<E>> = match settings {
        RepositorySettings::InMemory => Arc::new(InMemoryRepository::new()),
        RepositorySettings::Filesystem { storage_folder } => {
            Arc::new(FsRepository::new(storage_folder)?)
        }
    };
    Ok(repository)
}
