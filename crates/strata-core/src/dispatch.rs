//! Job dispatch
//!
//! The dispatcher creates one job per task in the order it is given and
//! drives each job through its lifecycle. On every transition the job's
//! callbacks run first, then the subscribers registered on the owning
//! pipeline at that moment. Callback and subscriber failures, including
//! panics, are logged and never reach the job or other subscribers.

use crate::entities::{Job, Pipeline, Task};
use crate::error::{OrchestratorError, Result};
use crate::ids::{JobId, PipelineId};
use crate::manager::{DataManager, EntityManager, JobManager};
use crate::registry::{FunctionRegistry, SubscriberRegistry};
use crate::settings::JobMode;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use strata_kernel::JobStatus;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;

/// One-shot callback attached to the jobs of a single submission
pub type JobCallback = Arc<dyn Fn(&Job) -> anyhow::Result<()> + Send + Sync>;

/// Runs the body of a task
pub trait TaskExecutor: Send + Sync {
    /// Execute `task` on behalf of job `job_id`
    ///
    /// # Errors
    /// Any error marks the job `FAILED`
    fn execute(&self, task: &Task, job_id: &JobId) -> anyhow::Result<()>;
}

/// Executor calling registered task functions.
///
/// Inputs are read in position order, the function is called, and each
/// returned value is written to the output at the same position.
pub struct FunctionExecutor {
    functions: Arc<FunctionRegistry>,
    data: Arc<DataManager>,
}

impl FunctionExecutor {
    /// Create executor
    #[must_use]
    pub fn new(functions: Arc<FunctionRegistry>, data: Arc<DataManager>) -> Self {
        Self { functions, data }
    }
}

impl TaskExecutor for FunctionExecutor {
    fn execute(&self, task: &Task, job_id: &JobId) -> anyhow::Result<()> {
        let function =
            self.functions
                .get(task.function())
                .ok_or_else(|| OrchestratorError::UnknownFunction {
                    name: task.function().to_string(),
                })?;

        let inputs = task
            .inputs()
            .iter()
            .map(|id| self.data.read(id))
            .collect::<Result<Vec<_>>>()?;
        let outputs = function(&inputs)?;

        anyhow::ensure!(
            outputs.len() == task.outputs().len(),
            "function `{}` returned {} values for {} outputs",
            task.function(),
            outputs.len(),
            task.outputs().len()
        );
        for (id, value) in task.outputs().iter().zip(outputs) {
            self.data.write(id, value, Some(job_id))?;
        }
        Ok(())
    }
}

impl fmt::Debug for FunctionExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionExecutor")
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

/// Drives single jobs through their lifecycle
pub(crate) struct JobRunner {
    executor: Arc<dyn TaskExecutor>,
    jobs: Arc<JobManager>,
    pipelines: Arc<EntityManager<Pipeline>>,
    subscribers: Arc<SubscriberRegistry>,
}

impl JobRunner {
    pub(crate) fn new(
        executor: Arc<dyn TaskExecutor>,
        jobs: Arc<JobManager>,
        pipelines: Arc<EntityManager<Pipeline>>,
        subscribers: Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            executor,
            jobs,
            pipelines,
            subscribers,
        }
    }

    fn submit(
        &self,
        task: &Task,
        pipeline_id: Option<&PipelineId>,
        callbacks: &[JobCallback],
    ) -> Result<Job> {
        let job = self.jobs.create(task, pipeline_id)?;
        tracing::debug!(job_id = %job.id(), task_id = %task.id(), "job submitted");
        self.notify(&job, callbacks);
        Ok(job)
    }

    /// Delete the jobs of a submission that could not be completed
    fn withdraw<'a>(&self, jobs: impl IntoIterator<Item = &'a Job>) {
        for job in jobs {
            match self.jobs.delete(job.id()) {
                Ok(()) => tracing::debug!(job_id = %job.id(), "job withdrawn"),
                Err(e) => tracing::warn!(job_id = %job.id(), error = %e, "cannot withdraw job"),
            }
        }
    }

    fn run(&self, mut job: Job, task: &Task, callbacks: &[JobCallback]) -> Result<Job> {
        self.transition(&mut job, JobStatus::Running, callbacks)?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.executor.execute(task, job.id())
        }));
        let status = match outcome {
            Ok(Ok(())) => JobStatus::Completed,
            Ok(Err(e)) => {
                tracing::warn!(job_id = %job.id(), task_id = %task.id(), error = %format!("{e:#}"), "task failed");
                job.push_error(format!("{e:#}"));
                JobStatus::Failed
            }
            Err(_) => {
                tracing::warn!(job_id = %job.id(), task_id = %task.id(), "task panicked");
                job.push_error("task panicked".to_string());
                JobStatus::Failed
            }
        };

        self.transition(&mut job, status, callbacks)?;
        Ok(job)
    }

    fn transition(&self, job: &mut Job, status: JobStatus, callbacks: &[JobCallback]) -> Result<()> {
        job.transition(status)?;
        self.jobs.set(job)?;
        tracing::debug!(job_id = %job.id(), status = %status, "job transition");
        self.notify(job, callbacks);
        Ok(())
    }

    fn notify(&self, job: &Job, callbacks: &[JobCallback]) {
        for callback in callbacks {
            isolate("job callback", job, || callback(job));
        }

        let Some(pipeline_id) = job.pipeline_id() else {
            return;
        };
        let pipeline = match self.pipelines.find(pipeline_id.as_str()) {
            Ok(Some(pipeline)) => pipeline,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(job_id = %job.id(), pipeline_id = %pipeline_id, error = %e, "cannot load subscribers");
                return;
            }
        };
        for name in pipeline.subscribers() {
            match self.subscribers.get(name) {
                Some(subscriber) => isolate(name, job, || subscriber(&pipeline, job)),
                None => {
                    tracing::warn!(job_id = %job.id(), subscriber = %name, "subscriber not registered");
                }
            }
        }
    }
}

fn isolate(name: &str, job: &Job, f: impl FnOnce() -> anyhow::Result<()>) {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(job_id = %job.id(), subscriber = %name, error = %format!("{e:#}"), "subscriber failed");
        }
        Err(_) => {
            tracing::warn!(job_id = %job.id(), subscriber = %name, "subscriber panicked");
        }
    }
}

enum Mode {
    Synchronous,
    Standalone {
        runtime: Runtime,
        in_flight: Mutex<Vec<JoinHandle<()>>>,
    },
}

/// Hands ordered tasks to the executor, one job each
pub struct Dispatcher {
    runner: Arc<JobRunner>,
    mode: Mode,
}

impl Dispatcher {
    pub(crate) fn new(runner: JobRunner, mode: &JobMode) -> Result<Self> {
        let mode = match mode {
            JobMode::Synchronous => Mode::Synchronous,
            JobMode::Standalone { workers } => {
                let runtime = Builder::new_multi_thread()
                    .worker_threads((*workers).max(1))
                    .max_blocking_threads((*workers).max(1))
                    .thread_name("strata-worker")
                    .enable_all()
                    .build()
                    .map_err(OrchestratorError::Runtime)?;
                Mode::Standalone {
                    runtime,
                    in_flight: Mutex::new(Vec::new()),
                }
            }
        };
        Ok(Self {
            runner: Arc::new(runner),
            mode,
        })
    }

    /// Whether jobs run inline in the submitting thread
    #[inline]
    #[must_use]
    pub fn is_synchronous(&self) -> bool {
        matches!(self.mode, Mode::Synchronous)
    }

    /// Create one job per task, in the given order, and run them.
    ///
    /// Synchronous mode returns finished jobs. Standalone mode returns the
    /// `SUBMITTED` jobs and runs them in order on a worker thread; a failed
    /// job does not stop the ones after it. If a standalone submission fails
    /// partway, the jobs it already created are deleted and none of them runs.
    ///
    /// # Errors
    /// Store failures while creating or updating jobs
    pub fn dispatch(
        &self,
        tasks: Vec<Task>,
        pipeline_id: Option<&PipelineId>,
        callbacks: &[JobCallback],
    ) -> Result<Vec<Job>> {
        match &self.mode {
            Mode::Synchronous => {
                let mut jobs = Vec::with_capacity(tasks.len());
                for task in &tasks {
                    let job = self.runner.submit(task, pipeline_id, callbacks)?;
                    jobs.push(self.runner.run(job, task, callbacks)?);
                }
                Ok(jobs)
            }
            Mode::Standalone { runtime, in_flight } => {
                let mut batch = Vec::with_capacity(tasks.len());
                for task in tasks {
                    match self.runner.submit(&task, pipeline_id, callbacks) {
                        Ok(job) => batch.push((job, task)),
                        Err(e) => {
                            self.runner.withdraw(batch.iter().map(|(job, _)| job));
                            return Err(e);
                        }
                    }
                }
                let submitted: Vec<Job> = batch.iter().map(|(job, _)| job.clone()).collect();

                let runner = Arc::clone(&self.runner);
                let callbacks = callbacks.to_vec();
                let handle = runtime.spawn_blocking(move || {
                    for (job, task) in batch {
                        let job_id = job.id().clone();
                        if let Err(e) = runner.run(job, &task, &callbacks) {
                            tracing::error!(job_id = %job_id, error = %e, "job bookkeeping failed");
                        }
                    }
                });
                in_flight.lock().push(handle);
                Ok(submitted)
            }
        }
    }

    /// Dispatch a single task outside any pipeline
    ///
    /// # Errors
    /// Store failures while creating or updating the job
    pub fn dispatch_task(&self, task: Task, callbacks: &[JobCallback]) -> Result<Job> {
        let task_id = task.id().clone();
        self.dispatch(vec![task], None, callbacks)?
            .pop()
            .ok_or_else(|| OrchestratorError::NonExistingTask {
                id: task_id.into_inner(),
            })
    }

    /// Block until every standalone submission has finished.
    ///
    /// Must be called from outside the dispatcher's runtime. A no-op in
    /// synchronous mode.
    pub fn wait_for_all(&self) {
        let Mode::Standalone { runtime, in_flight } = &self.mode else {
            return;
        };
        let handles: Vec<_> = in_flight.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = runtime.block_on(handle) {
                tracing::error!(error = %e, "submission worker panicked");
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("synchronous", &self.is_synchronous())
            .finish_non_exhaustive()
    }
}
