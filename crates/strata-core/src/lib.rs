//! Strata Core
//!
//! Turns declarative pipeline configuration into concrete, store-backed
//! entities, orders their tasks and dispatches jobs.
//!
//! # Overview
//!
//! - **Scope resolution**: decides whether a data node, task or pipeline is
//!   reused or freshly created for an [`ExecutionContext`]
//! - **Managers**: one per entity kind, all built on [`EntityManager`]
//! - **Scheduling**: dependency graph over a pipeline's tasks, ordered by the kernel
//! - **Dispatch**: job lifecycle with job callbacks and pipeline subscribers
//! - **Hard delete**: cascading deletion of exclusively owned entities
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::Value;
//! use std::sync::Arc;
//! use strata_core::prelude::*;
//!
//! fn double(inputs: &[Value]) -> anyhow::Result<Vec<Value>> {
//!     let n = inputs[0].as_i64().unwrap_or_default();
//!     Ok(vec![Value::from(n * 2)])
//! }
//!
//! let orchestrator = Orchestrator::builder()
//!     .with_function("double", Arc::new(double))
//!     .build()?;
//!
//! let input = Arc::new(DataNodeConfig::new("input").with_default_data(1.into()));
//! let output = Arc::new(DataNodeConfig::new("output"));
//! let task = Arc::new(TaskConfig::new("double", "double").with_input(input).with_output(output));
//! let config = PipelineConfig::new("by_two", vec![task]);
//!
//! let pipeline = orchestrator.pipelines().get_or_create(&config, &ExecutionContext::new())?;
//! orchestrator.pipelines().submit(pipeline.id(), &[])?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod connector;
pub mod dispatch;
pub mod entities;
pub mod error;
pub mod ids;
pub mod manager;
pub mod observability;
pub mod orchestrator;
pub mod registry;
pub mod scheduler;
pub mod scope;
pub mod settings;

// Re-exports
pub use config::{DataNodeConfig, Frequency, PipelineConfig, ScenarioConfig, TaskConfig};
pub use connector::{Connector, InMemoryConnector};
pub use dispatch::{Dispatcher, FunctionExecutor, JobCallback, TaskExecutor};
pub use entities::{Cycle, DataNode, Edit, Job, Pipeline, Scenario, Task};
pub use error::{OrchestratorError, Result};
pub use ids::{CycleId, DataNodeId, JobId, PipelineId, ScenarioId, TaskId};
pub use manager::{
    CycleManager, DataManager, EntityManager, JobManager, ManagedEntity, PipelineManager,
    ScenarioManager, TaskManager,
};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use registry::{
    ConnectorRegistry, FunctionRegistry, Registry, Subscriber, SubscriberRegistry, TaskFunction,
};
pub use scope::{ContextKey, ExecutionContext, Resolution, Scope};
pub use settings::{ConfigError, JobMode, OrchestratorConfig, RepositorySettings};
pub use strata_kernel::JobStatus;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for orchestration
    pub use crate::{
        DataNodeConfig, ExecutionContext, Frequency, JobCallback, JobStatus, Orchestrator,
        OrchestratorConfig, OrchestratorError, PipelineConfig, ScenarioConfig, Scope, TaskConfig,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
