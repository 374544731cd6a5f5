//! Testing utilities for the Strata workspace
//!
//! Shared task functions, config fixtures, and recording doubles.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strata_core::{
    DataNodeConfig, Job, JobId, JobStatus, Orchestrator, OrchestratorConfig, Pipeline,
    PipelineConfig, Scope, Subscriber, Task, TaskConfig, TaskExecutor,
};

fn number(inputs: &[Value]) -> anyhow::Result<i64> {
    inputs
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| anyhow::anyhow!("expected one integer input, got {inputs:?}"))
}

pub fn mult_by_2(inputs: &[Value]) -> anyhow::Result<Vec<Value>> {
    Ok(vec![Value::from(number(inputs)? * 2)])
}

pub fn mult_by_3(inputs: &[Value]) -> anyhow::Result<Vec<Value>> {
    Ok(vec![Value::from(number(inputs)? * 3)])
}

pub fn identity(inputs: &[Value]) -> anyhow::Result<Vec<Value>> {
    Ok(inputs.to_vec())
}

pub fn fail(_inputs: &[Value]) -> anyhow::Result<Vec<Value>> {
    anyhow::bail!("always fails")
}

/// Orchestrator with the sample functions registered
pub fn setup_orchestrator() -> Orchestrator {
    setup_orchestrator_with(OrchestratorConfig::default())
}

pub fn setup_orchestrator_with(config: OrchestratorConfig) -> Orchestrator {
    Orchestrator::builder()
        .with_config(config)
        .with_function("mult_by_2", Arc::new(mult_by_2))
        .with_function("mult_by_3", Arc::new(mult_by_3))
        .with_function("identity", Arc::new(identity))
        .with_function("fail", Arc::new(fail))
        .build()
        .unwrap()
}

/// Orchestrator running every task through `executor`
pub fn setup_recording_orchestrator(executor: Arc<RecordingExecutor>) -> Orchestrator {
    Orchestrator::builder()
        .with_executor(executor)
        .build()
        .unwrap()
}

pub fn data_node(id: &str, scope: Scope) -> Arc<DataNodeConfig> {
    Arc::new(DataNodeConfig::new(id).with_scope(scope))
}

pub fn task(
    id: &str,
    function: &str,
    inputs: &[&Arc<DataNodeConfig>],
    outputs: &[&Arc<DataNodeConfig>],
) -> Arc<TaskConfig> {
    Arc::new(
        TaskConfig::new(id, function)
            .with_inputs(inputs.iter().map(|c| Arc::clone(*c)))
            .with_outputs(outputs.iter().map(|c| Arc::clone(*c))),
    )
}

/// `foo` (default 1) -> `mult_by_2` -> `bar` -> `mult_by_3` -> `baz`
pub fn by_six_pipeline_config(scope: Scope) -> PipelineConfig {
    let foo = Arc::new(
        DataNodeConfig::new("foo")
            .with_scope(scope)
            .with_default_data(Value::from(1)),
    );
    let bar = data_node("bar", scope);
    let baz = data_node("baz", scope);
    PipelineConfig::new(
        "by_6",
        vec![
            task("mult_by_2", "mult_by_2", &[&foo], &[&bar]),
            task("mult_by_3", "mult_by_3", &[&bar], &[&baz]),
        ],
    )
}

/// Four tasks listed as `[t4, t2, t1, t3]`:
/// t1(d1, d2 -> d3, d4), t2(d3 -> d5), t3(d5, d4 -> d6), t4(d4 -> d7)
pub fn four_task_pipeline_config() -> PipelineConfig {
    let d: Vec<Arc<DataNodeConfig>> = (1..=7)
        .map(|i| data_node(&format!("d{i}"), Scope::Pipeline))
        .collect();
    let t1 = task("t1", "identity", &[&d[0], &d[1]], &[&d[2], &d[3]]);
    let t2 = task("t2", "identity", &[&d[2]], &[&d[4]]);
    let t3 = task("t3", "identity", &[&d[4], &d[3]], &[&d[5]]);
    let t4 = task("t4", "identity", &[&d[3]], &[&d[6]]);
    PipelineConfig::new("four_tasks", vec![t4, t2, t1, t3])
}

/// Executor that records the config id of each executed task
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    executed: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

impl TaskExecutor for RecordingExecutor {
    fn execute(&self, task: &Task, _job_id: &JobId) -> anyhow::Result<()> {
        self.executed.lock().push(task.config_id().to_string());
        Ok(())
    }
}

/// Subscriber counting notifications and recording the statuses seen
#[derive(Debug, Default)]
pub struct NotifyCounter {
    calls: AtomicUsize,
    statuses: Mutex<Vec<JobStatus>>,
}

impl NotifyCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscriber(self: &Arc<Self>) -> Subscriber {
        let counter = Arc::clone(self);
        Arc::new(move |_pipeline: &Pipeline, job: &Job| -> anyhow::Result<()> {
            counter.calls.fetch_add(1, Ordering::SeqCst);
            counter.statuses.lock().push(job.status());
            Ok(())
        })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn statuses(&self) -> Vec<JobStatus> {
        self.statuses.lock().clone()
    }
}
