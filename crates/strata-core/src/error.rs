//! Error types for Strata Core
//!
//! One taxonomy for every orchestration operation:
//! - Missing entities (`NonExisting*`)
//! - Unschedulable pipelines (`Graph`)
//! - Subscription and registry misses
//! - Data access and persistence failures

use crate::settings::ConfigError;
use strata_kernel::{GraphError, StateMachineError};
use strata_store::StoreError;

/// Main orchestration error type
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Pipeline id not in the store
    #[error("pipeline `{id}` does not exist")]
    NonExistingPipeline {
        /// Requested id
        id: String,
    },

    /// Task id not in the store
    #[error("task `{id}` does not exist")]
    NonExistingTask {
        /// Requested id
        id: String,
    },

    /// Data node id not in the store
    #[error("data node `{id}` does not exist")]
    NonExistingDataNode {
        /// Requested id
        id: String,
    },

    /// Scenario id not in the store
    #[error("scenario `{id}` does not exist")]
    NonExistingScenario {
        /// Requested id
        id: String,
    },

    /// Cycle id not in the store
    #[error("cycle `{id}` does not exist")]
    NonExistingCycle {
        /// Requested id
        id: String,
    },

    /// Job id not in the store
    #[error("job `{id}` does not exist")]
    NonExistingJob {
        /// Requested id
        id: String,
    },

    /// Dependency graph cannot be ordered
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Unsubscribe of a subscriber that is not registered on the target
    #[error("subscriber `{subscriber}` is not subscribed to {}", pipeline.as_deref().unwrap_or("any pipeline"))]
    SubscriptionNotFound {
        /// Subscriber name
        subscriber: String,
        /// Target pipeline, `None` when every pipeline was targeted
        pipeline: Option<String>,
    },

    /// Task function name missing from the function registry
    #[error("unknown task function `{name}`")]
    UnknownFunction {
        /// Function name
        name: String,
    },

    /// Subscriber name missing from the subscriber registry
    #[error("unknown subscriber `{name}`")]
    UnknownSubscriber {
        /// Subscriber name
        name: String,
    },

    /// No connector registered for a storage type
    #[error("no connector registered for storage type `{storage_type}`")]
    UnknownConnector {
        /// Storage type
        storage_type: String,
    },

    /// Data node read before any value was written
    #[error("data node `{id}` has no data")]
    NoData {
        /// Data node id
        id: String,
    },

    /// Connector read, write or remove failed
    #[error("{storage_type} connector failed for data node `{id}`: {message}")]
    Connector {
        /// Storage type
        storage_type: String,
        /// Data node id
        id: String,
        /// Connector error chain
        message: String,
    },

    /// Date outside the representable calendar
    #[error("cannot derive cycle period for {date}")]
    InvalidCycleDate {
        /// Offending date
        date: String,
    },

    /// Illegal job status transition
    #[error("state machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    /// Repository failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Settings could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker runtime could not be started
    #[error("cannot start job runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl OrchestratorError {
    /// Check if the error reports a missing entity
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NonExistingPipeline { .. }
                | Self::NonExistingTask { .. }
                | Self::NonExistingDataNode { .. }
                | Self::NonExistingScenario { .. }
                | Self::NonExistingCycle { .. }
                | Self::NonExistingJob { .. }
        )
    }

    /// Check if the error is a dependency cycle
    #[inline]
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Graph(GraphError::GraphHasCycle { .. }))
    }
}

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;
