//! Kernel value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created and handed to the dispatcher
    Submitted,
    /// Executor picked it up
    Running,
    /// Finished successfully
    Completed,
    /// Task raised or returned an error
    Failed,
}

impl JobStatus {
    /// Every status, in lifecycle order
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Submitted,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    /// No further transition is permitted
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Upper-case status name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
