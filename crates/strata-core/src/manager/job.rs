//! Job manager

use crate::entities::{Job, Task};
use crate::error::Result;
use crate::ids::{JobId, PipelineId, TaskId};
use crate::manager::EntityManager;
use std::sync::Arc;
use strata_store::Repository;

/// Creates and tracks jobs
#[derive(Debug)]
pub struct JobManager {
    store: EntityManager<Job>,
}

impl JobManager {
    /// Create manager
    #[must_use]
    pub fn new(repository: Arc<dyn Repository<Job>>) -> Self {
        Self {
            store: EntityManager::new(repository),
        }
    }

    /// Create and save a `SUBMITTED` job for `task`
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn create(&self, task: &Task, pipeline_id: Option<&PipelineId>) -> Result<Job> {
        let job = Job::new(task, pipeline_id.cloned());
        self.store.set(&job)?;
        Ok(job)
    }

    /// Load job
    ///
    /// # Errors
    /// `NonExistingJob` if not stored
    pub fn get(&self, id: &JobId) -> Result<Job> {
        self.store.get(id.as_str())
    }

    /// Every job
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_all(&self) -> Result<Vec<Job>> {
        self.store.get_all()
    }

    /// Jobs of `task_id`, oldest first
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_jobs_for_task(&self, task_id: &TaskId) -> Result<Vec<Job>> {
        let mut jobs = self.store.get_all_by(&|j: &Job| j.task_id() == task_id)?;
        jobs.sort_by_key(Job::creation_date);
        Ok(jobs)
    }

    /// Most recently created job of `task_id`
    ///
    /// # Errors
    /// Returns error if the repository cannot be read
    pub fn get_latest_for_task(&self, task_id: &TaskId) -> Result<Option<Job>> {
        Ok(self.get_jobs_for_task(task_id)?.pop())
    }

    /// Save, replacing the stored copy
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn set(&self, job: &Job) -> Result<()> {
        self.store.set(job)
    }

    /// Delete job
    ///
    /// # Errors
    /// `NonExistingJob` if not stored
    pub fn delete(&self, id: &JobId) -> Result<()> {
        self.store.delete(id.as_str())
    }

    /// Delete every job of `task_id`, returning how many existed
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn delete_for_task(&self, task_id: &TaskId) -> Result<usize> {
        let jobs = self.get_jobs_for_task(task_id)?;
        let ids: Vec<&str> = jobs.iter().map(|j| j.id().as_str()).collect();
        self.store.delete_many(&ids)
    }

    /// Clear the store
    ///
    /// # Errors
    /// Returns error if the repository cannot be written
    pub fn delete_all(&self) -> Result<()> {
        self.store.delete_all()
    }
}
