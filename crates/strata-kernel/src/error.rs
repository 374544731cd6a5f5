//! Kernel error types

use crate::types::JobStatus;

/// Dependency graph failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Tasks depend on each other through produced and consumed artifacts
    #[error("dependency graph has a cycle through: {}", nodes.join(", "))]
    GraphHasCycle {
        /// Nodes left unscheduled when ordering stalled
        nodes: Vec<String>,
    },

    /// Edge endpoint outside the arena
    #[error("node index {index} out of bounds for graph of {len} nodes")]
    NodeOutOfBounds {
        /// Offending index
        index: usize,
        /// Number of nodes in the graph
        len: usize,
    },
}

/// Illegal job status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not in the lifecycle table
    #[error("illegal job transition {from} -> {to}")]
    IllegalTransition {
        /// Current status
        from: JobStatus,
        /// Requested status
        to: JobStatus,
    },
}
