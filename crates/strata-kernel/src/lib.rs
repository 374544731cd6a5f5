//! Strata Kernel
//!
//! Entity-agnostic scheduling primitives.
//!
//! # Overview
//!
//! - **TaskGraph**: arena-indexed dependency graph with deterministic Kahn ordering
//! - **JobStatus**: job lifecycle states and the transition table guarding them
//!
//! Nothing here knows about data nodes or repositories; callers map their
//! entities onto node indices and back.

#![warn(missing_docs)]

pub mod error;
pub mod graph;
pub mod state_machine;
pub mod types;

// Re-exports
pub use error::{GraphError, StateMachineError};
pub use graph::TaskGraph;
pub use state_machine::{allowed_transitions, validate_transition};
pub use types::JobStatus;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
