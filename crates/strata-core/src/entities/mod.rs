//! Runtime entities
//!
//! Every entity is a plain serializable value identified by a generated id.
//! Managers load, mutate and save whole entities; saving under an existing id
//! replaces the stored copy.

pub mod cycle;
pub mod data_node;
pub mod job;
pub mod pipeline;
pub mod scenario;
pub mod task;

pub use cycle::Cycle;
pub use data_node::{DataNode, Edit};
pub use job::Job;
pub use pipeline::Pipeline;
pub use scenario::Scenario;
pub use task::Task;
