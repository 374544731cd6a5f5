//! Job entity

use crate::entities::Task;
use crate::ids::{JobId, PipelineId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_kernel::{validate_transition, JobStatus, StateMachineError};
use strata_store::Entity;

/// One execution attempt of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    task_id: TaskId,
    config_id: String,
    pipeline_id: Option<PipelineId>,
    status: JobStatus,
    creation_date: DateTime<Utc>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    errors: Vec<String>,
}

impl Job {
    /// Create `SUBMITTED` job for `task`
    #[must_use]
    pub fn new(task: &Task, pipeline_id: Option<PipelineId>) -> Self {
        Self {
            id: JobId::generate(task.config_id()),
            task_id: task.id().clone(),
            config_id: task.config_id().to_string(),
            pipeline_id,
            status: JobStatus::Submitted,
            creation_date: Utc::now(),
            start_date: None,
            end_date: None,
            errors: Vec::new(),
        }
    }

    /// Move to `status`, stamping start and end dates.
    ///
    /// # Errors
    /// Returns error if the lifecycle forbids the transition
    pub fn transition(&mut self, status: JobStatus) -> Result<(), StateMachineError> {
        validate_transition(self.status, status)?;
        match status {
            JobStatus::Running => self.start_date = Some(Utc::now()),
            JobStatus::Completed | JobStatus::Failed => self.end_date = Some(Utc::now()),
            JobStatus::Submitted => {}
        }
        self.status = status;
        Ok(())
    }

    pub(crate) fn push_error(&mut self, error: String) {
        self.errors.push(error);
    }

    /// Id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Executed task
    #[inline]
    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Submitting pipeline
    #[inline]
    #[must_use]
    pub fn pipeline_id(&self) -> Option<&PipelineId> {
        self.pipeline_id.as_ref()
    }

    /// Current status
    #[inline]
    #[must_use]
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Check if job reached a terminal status
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Creation time
    #[inline]
    #[must_use]
    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    /// Time execution started
    #[inline]
    #[must_use]
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    /// Time execution ended
    #[inline]
    #[must_use]
    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    /// Errors raised by the task
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

impl Entity for Job {
    const KIND: &'static str = "job";

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn config_id(&self) -> &str {
        &self.config_id
    }
}
