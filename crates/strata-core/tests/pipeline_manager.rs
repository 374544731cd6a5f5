//! Pipeline realization, submission, subscription and hard delete

use pretty_assertions::assert_eq;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use strata_core::{
    Connector, DataNode, DataNodeConfig, DataNodeId, ExecutionContext, Job, JobCallback, JobStatus, Orchestrator,
    OrchestratorError, Pipeline, PipelineConfig, PipelineId, ScenarioId, Scope, Task, TaskId,
};
use strata_test_utils::{
    by_six_pipeline_config, data_node, four_task_pipeline_config, mult_by_2, setup_orchestrator,
    setup_recording_orchestrator, task, NotifyCounter, RecordingExecutor,
};

fn one_task_config() -> PipelineConfig {
    let foo = Arc::new(DataNodeConfig::new("foo").with_default_data(json!(1)));
    let bar = data_node("bar", Scope::Pipeline);
    PipelineConfig::new("one_task", vec![task("double", "mult_by_2", &[&foo], &[&bar])])
}

fn config_ids(jobs: &[Job], orchestrator: &Orchestrator) -> Vec<String> {
    jobs.iter()
        .map(|job| {
            orchestrator
                .tasks()
                .get(job.task_id())
                .unwrap()
                .config_id()
                .to_string()
        })
        .collect()
}

#[test]
fn reference_pipeline_dispatches_in_reference_order() {
    let executor = RecordingExecutor::new();
    let orchestrator = setup_recording_orchestrator(Arc::clone(&executor));
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&four_task_pipeline_config(), &ExecutionContext::new())
        .unwrap();

    let jobs = orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap();

    assert_eq!(executor.executed(), vec!["t1", "t2", "t4", "t3"]);
    assert_eq!(config_ids(&jobs, &orchestrator), vec!["t1", "t2", "t4", "t3"]);
    assert!(jobs.iter().all(|j| j.status() == JobStatus::Completed));
    assert!(jobs.iter().all(|j| j.pipeline_id() == Some(pipeline.id())));
}

#[test]
fn sorted_tasks_groups_by_level() {
    let orchestrator = setup_recording_orchestrator(RecordingExecutor::new());
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&four_task_pipeline_config(), &ExecutionContext::new())
        .unwrap();

    let levels: Vec<Vec<String>> = orchestrator
        .pipelines()
        .sorted_tasks(pipeline.id())
        .unwrap()
        .into_iter()
        .map(|level| level.iter().map(|t| t.config_id().to_string()).collect())
        .collect();
    assert_eq!(
        levels,
        vec![vec!["t1"], vec!["t2", "t4"], vec!["t3"]]
            .into_iter()
            .map(|l| l.into_iter().map(String::from).collect::<Vec<_>>())
            .collect::<Vec<_>>()
    );
}

#[test]
fn by_six_pipeline_computes_values() {
    let orchestrator = setup_orchestrator();
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&by_six_pipeline_config(Scope::Pipeline), &ExecutionContext::new())
        .unwrap();

    let jobs = orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap();
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|j| j.status() == JobStatus::Completed));

    let nodes = orchestrator.pipelines().data_nodes(pipeline.id()).unwrap();
    let keys: Vec<&str> = nodes.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["foo", "bar", "baz"]);
    assert_eq!(orchestrator.data().read(nodes["bar"].id()).unwrap(), json!(2));
    assert_eq!(orchestrator.data().read(nodes["baz"].id()).unwrap(), json!(6));

    let bar = orchestrator.data().get(nodes["bar"].id()).unwrap();
    assert_eq!(bar.edits().len(), 1);
    assert_eq!(bar.edits()[0].job_id.as_ref(), Some(jobs[0].id()));
}

#[test]
fn tasks_of_one_pipeline_share_intermediate_nodes() {
    let orchestrator = setup_orchestrator();
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&by_six_pipeline_config(Scope::Pipeline), &ExecutionContext::new())
        .unwrap();

    let tasks: Vec<Task> = pipeline
        .tasks()
        .iter()
        .map(|id| orchestrator.tasks().get(id).unwrap())
        .collect();
    assert_eq!(tasks[0].outputs(), tasks[1].inputs());
    assert!(tasks
        .iter()
        .all(|t| t.owner_id() == Some(pipeline.id().as_str())));
}

#[test]
fn pipeline_scope_is_never_reused() {
    let orchestrator = setup_orchestrator();
    let config = by_six_pipeline_config(Scope::Pipeline);
    let context = ExecutionContext::new();
    let a = orchestrator.pipelines().get_or_create(&config, &context).unwrap();
    let b = orchestrator.pipelines().get_or_create(&config, &context).unwrap();

    assert_ne!(a.id(), b.id());
    assert_eq!(orchestrator.tasks().get_all().unwrap().len(), 4);
    assert_eq!(orchestrator.data().get_all().unwrap().len(), 6);
}

#[test]
fn scenario_scope_is_reused_within_a_scenario() {
    let orchestrator = setup_orchestrator();
    let config = by_six_pipeline_config(Scope::Scenario);
    let s1 = ExecutionContext::new().with_scenario(ScenarioId::from("s1"));
    let s2 = ExecutionContext::new().with_scenario(ScenarioId::from("s2"));

    let a = orchestrator.pipelines().get_or_create(&config, &s1).unwrap();
    let b = orchestrator.pipelines().get_or_create(&config, &s1).unwrap();
    let c = orchestrator.pipelines().get_or_create(&config, &s2).unwrap();

    assert_eq!(a.id(), b.id());
    assert_ne!(a.id(), c.id());
    assert_eq!(a.scope(), Scope::Scenario);
    assert_eq!(a.owner_id(), Some("s1"));
    assert_eq!(orchestrator.tasks().get_all().unwrap().len(), 4);
}

#[test]
fn global_scope_ignores_context() {
    let orchestrator = setup_orchestrator();
    let config = by_six_pipeline_config(Scope::Global);
    let a = orchestrator
        .pipelines()
        .get_or_create(&config, &ExecutionContext::new().with_scenario(ScenarioId::from("s1")))
        .unwrap();
    let b = orchestrator
        .pipelines()
        .get_or_create(&config, &ExecutionContext::new())
        .unwrap();

    assert_eq!(a.id(), b.id());
    assert_eq!(a.owner_id(), None);
}

#[test]
fn one_submit_notifies_subscriber_three_times() {
    let counter = NotifyCounter::new();
    let orchestrator = setup_orchestrator();
    orchestrator.register_subscriber("counter", counter.subscriber());
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&one_task_config(), &ExecutionContext::new())
        .unwrap();

    orchestrator
        .pipelines()
        .subscribe("counter", Some(pipeline.id()))
        .unwrap();
    orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap();

    assert_eq!(counter.count(), 3);
    assert_eq!(
        counter.statuses(),
        vec![JobStatus::Submitted, JobStatus::Running, JobStatus::Completed]
    );
}

#[test]
fn job_callbacks_run_on_every_transition() {
    let orchestrator = setup_orchestrator();
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&one_task_config(), &ExecutionContext::new())
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: JobCallback = Arc::new(move |job: &Job| -> anyhow::Result<()> {
        sink.lock().push(job.status());
        Ok(())
    });
    orchestrator
        .pipelines()
        .submit(pipeline.id(), &[callback])
        .unwrap();

    assert_eq!(
        *seen.lock(),
        vec![JobStatus::Submitted, JobStatus::Running, JobStatus::Completed]
    );
}

#[test]
fn subscribe_all_only_reaches_existing_pipelines() {
    let counter = NotifyCounter::new();
    let orchestrator = setup_orchestrator();
    orchestrator.register_subscriber("counter", counter.subscriber());

    let first = orchestrator
        .pipelines()
        .get_or_create(&one_task_config(), &ExecutionContext::new())
        .unwrap();
    orchestrator.pipelines().subscribe("counter", None).unwrap();
    let second = orchestrator
        .pipelines()
        .get_or_create(&one_task_config(), &ExecutionContext::new())
        .unwrap();

    orchestrator.pipelines().submit(second.id(), &[]).unwrap();
    assert_eq!(counter.count(), 0);

    orchestrator.pipelines().submit(first.id(), &[]).unwrap();
    assert_eq!(counter.count(), 3);
}

#[test]
fn unsubscribe_stops_notifications() {
    let counter = NotifyCounter::new();
    let orchestrator = setup_orchestrator();
    orchestrator.register_subscriber("counter", counter.subscriber());
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&one_task_config(), &ExecutionContext::new())
        .unwrap();

    orchestrator
        .pipelines()
        .subscribe("counter", Some(pipeline.id()))
        .unwrap();
    orchestrator
        .pipelines()
        .unsubscribe("counter", Some(pipeline.id()))
        .unwrap();
    orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap();

    assert_eq!(counter.count(), 0);
    assert!(orchestrator
        .pipelines()
        .get(pipeline.id())
        .unwrap()
        .subscribers()
        .is_empty());
}

#[test]
fn unsubscribe_without_subscription_fails() {
    let counter = NotifyCounter::new();
    let orchestrator = setup_orchestrator();
    orchestrator.register_subscriber("counter", counter.subscriber());
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&one_task_config(), &ExecutionContext::new())
        .unwrap();

    let err = orchestrator
        .pipelines()
        .unsubscribe("counter", Some(pipeline.id()))
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::SubscriptionNotFound { .. }));

    let err = orchestrator.pipelines().unsubscribe("counter", None).unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::SubscriptionNotFound { pipeline: None, .. }
    ));
}

#[test]
fn subscribing_unknown_name_fails() {
    let orchestrator = setup_orchestrator();
    let err = orchestrator.pipelines().subscribe("ghost", None).unwrap_err();
    assert!(matches!(err, OrchestratorError::UnknownSubscriber { .. }));
}

#[test]
fn failing_subscribers_are_isolated() {
    let counter = NotifyCounter::new();
    let orchestrator = setup_orchestrator();
    orchestrator.register_subscriber(
        "erroring",
        Arc::new(|_: &Pipeline, _: &Job| -> anyhow::Result<()> { anyhow::bail!("boom") }),
    );
    orchestrator.register_subscriber(
        "panicking",
        Arc::new(|_: &Pipeline, _: &Job| -> anyhow::Result<()> { panic!("boom") }),
    );
    orchestrator.register_subscriber("counter", counter.subscriber());
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&one_task_config(), &ExecutionContext::new())
        .unwrap();
    for name in ["erroring", "panicking", "counter"] {
        orchestrator
            .pipelines()
            .subscribe(name, Some(pipeline.id()))
            .unwrap();
    }

    let jobs = orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap();
    assert_eq!(jobs[0].status(), JobStatus::Completed);
    assert_eq!(counter.count(), 3);
}

#[test]
fn failed_job_does_not_stop_later_jobs() {
    let orchestrator = setup_orchestrator();
    let seed = Arc::new(DataNodeConfig::new("seed").with_default_data(json!(4)));
    let broken = data_node("broken", Scope::Pipeline);
    let doubled = data_node("doubled", Scope::Pipeline);
    let config = PipelineConfig::new(
        "partial",
        vec![
            task("first", "fail", &[&seed], &[&broken]),
            task("second", "mult_by_2", &[&seed], &[&doubled]),
        ],
    );
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&config, &ExecutionContext::new())
        .unwrap();

    let jobs = orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap();
    let statuses: Vec<JobStatus> = jobs.iter().map(Job::status).collect();
    assert_eq!(statuses, vec![JobStatus::Failed, JobStatus::Completed]);
    assert!(jobs[0].errors()[0].contains("always fails"));

    let nodes = orchestrator.pipelines().data_nodes(pipeline.id()).unwrap();
    assert_eq!(orchestrator.data().read(nodes["doubled"].id()).unwrap(), json!(8));
    assert!(matches!(
        orchestrator.data().read(nodes["broken"].id()),
        Err(OrchestratorError::NoData { .. })
    ));
}

#[test]
fn submitting_unknown_pipeline_fails() {
    let orchestrator = setup_orchestrator();
    let err = orchestrator
        .pipelines()
        .submit(&PipelineId::from("PIPELINE_missing"), &[])
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::NonExistingPipeline { .. }));
}

#[test]
fn submitting_pipeline_with_unregistered_tasks_fails() {
    let orchestrator = setup_orchestrator();
    let pipeline = Pipeline::new(PipelineId::from("p"), "p")
        .with_tasks(vec![TaskId::from("t1"), TaskId::from("t2")]);
    orchestrator.pipelines().set(&pipeline).unwrap();

    let err = orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap_err();
    assert!(matches!(err, OrchestratorError::NonExistingTask { ref id } if id == "t1"));

    let input = DataNodeId::from("dn_in");
    let output = DataNodeId::from("dn_out");
    for id in ["t1", "t2"] {
        let task = Task::new(TaskId::from(id), id, "identity")
            .with_inputs(vec![input.clone()])
            .with_outputs(vec![output.clone()]);
        orchestrator.tasks().set(&task).unwrap();
    }
    let err = orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap_err();
    assert!(matches!(err, OrchestratorError::NonExistingDataNode { .. }));

    for id in [&input, &output] {
        orchestrator
            .data()
            .set(&DataNode::new(id.clone(), id.as_str(), Scope::Pipeline, "in_memory"))
            .unwrap();
    }
    orchestrator.data().write(&input, json!("x"), None).unwrap();
    let jobs = orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(orchestrator.data().read(&output).unwrap(), json!("x"));
}

#[test]
fn cyclic_pipeline_is_rejected_before_dispatch() {
    let orchestrator = setup_orchestrator();
    let x = data_node("x", Scope::Pipeline);
    let y = data_node("y", Scope::Pipeline);
    let config = PipelineConfig::new(
        "loop",
        vec![
            task("a", "identity", &[&x], &[&y]),
            task("b", "identity", &[&y], &[&x]),
        ],
    );
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&config, &ExecutionContext::new())
        .unwrap();

    let err = orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap_err();
    assert!(err.is_cycle());
    assert!(orchestrator.jobs().get_all().unwrap().is_empty());
}

#[test]
fn hard_delete_of_pipeline_scope_removes_everything() {
    let orchestrator = setup_orchestrator();
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&by_six_pipeline_config(Scope::Pipeline), &ExecutionContext::new())
        .unwrap();
    orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap();

    orchestrator.pipelines().hard_delete(pipeline.id()).unwrap();

    assert!(orchestrator.pipelines().get_all().unwrap().is_empty());
    assert!(orchestrator.tasks().get_all().unwrap().is_empty());
    assert!(orchestrator.data().get_all().unwrap().is_empty());
    assert!(orchestrator.jobs().get_all().unwrap().is_empty());
}

#[test]
fn hard_delete_keeps_broader_scoped_entities() {
    for scope in [Scope::Scenario, Scope::Cycle, Scope::Global] {
        let orchestrator = setup_orchestrator();
        let pipeline = orchestrator
            .pipelines()
            .get_or_create(&one_task_config_scoped(scope), &ExecutionContext::new())
            .unwrap();
        orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap();

        orchestrator.pipelines().hard_delete(pipeline.id()).unwrap();

        assert!(orchestrator.pipelines().get_all().unwrap().is_empty());
        assert_eq!(orchestrator.tasks().get_all().unwrap().len(), 1, "{scope}");
        assert_eq!(orchestrator.data().get_all().unwrap().len(), 2, "{scope}");
        assert_eq!(orchestrator.jobs().get_all().unwrap().len(), 1, "{scope}");
    }
}

fn one_task_config_scoped(scope: Scope) -> PipelineConfig {
    let foo = Arc::new(
        DataNodeConfig::new("foo")
            .with_scope(scope)
            .with_default_data(json!(1)),
    );
    let bar = data_node("bar", scope);
    PipelineConfig::new("one_task", vec![task("double", "mult_by_2", &[&foo], &[&bar])])
}

#[test]
fn hard_delete_with_mixed_scopes_keeps_global_output() {
    let orchestrator = setup_orchestrator();
    let foo = Arc::new(DataNodeConfig::new("foo").with_default_data(json!(1)));
    let bar = data_node("bar", Scope::Global);
    let config = PipelineConfig::new("mixed", vec![task("double", "mult_by_2", &[&foo], &[&bar])]);
    let pipeline = orchestrator
        .pipelines()
        .get_or_create(&config, &ExecutionContext::new())
        .unwrap();
    orchestrator.pipelines().submit(pipeline.id(), &[]).unwrap();

    orchestrator.pipelines().hard_delete(pipeline.id()).unwrap();

    assert!(orchestrator.pipelines().get_all().unwrap().is_empty());
    assert!(orchestrator.tasks().get_all().unwrap().is_empty());
    assert!(orchestrator.jobs().get_all().unwrap().is_empty());
    let remaining = orchestrator.data().get_all().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].config_id(), "bar");
    assert_eq!(orchestrator.data().read(remaining[0].id()).unwrap(), json!(2));
}

#[test]
fn hard_delete_of_unknown_pipeline_fails() {
    let orchestrator = setup_orchestrator();
    let err = orchestrator
        .pipelines()
        .hard_delete(&PipelineId::from("PIPELINE_missing"))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn delete_all_clears_store() {
    let orchestrator = setup_orchestrator();
    for _ in 0..3 {
        orchestrator
            .pipelines()
            .get_or_create(&one_task_config(), &ExecutionContext::new())
            .unwrap();
    }
    assert_eq!(orchestrator.pipelines().get_all().unwrap().len(), 3);

    orchestrator.pipelines().delete_all().unwrap();
    assert!(orchestrator.pipelines().get_all().unwrap().is_empty());
}

#[test]
fn direct_function_still_usable() {
    assert_eq!(mult_by_2(&[Value::from(21)]).unwrap(), vec![json!(42)]);
}

/// Accepts reads and removals but refuses every write
struct WriteRefusingConnector;

impl Connector for WriteRefusingConnector {
    fn read(&self, _id: &DataNodeId) -> anyhow::Result<Option<Value>> {
        Ok(None)
    }

    fn write(&self, id: &DataNodeId, _value: Value) -> anyhow::Result<()> {
        anyhow::bail!("read-only volume, cannot write {id}")
    }

    fn remove(&self, _id: &DataNodeId) -> anyhow::Result<()> {
        Ok(())
    }
}

fn assert_nothing_stored(orchestrator: &Orchestrator) {
    assert!(orchestrator.pipelines().get_all().unwrap().is_empty());
    assert!(orchestrator.tasks().get_all().unwrap().is_empty());
    assert!(orchestrator.data().get_all().unwrap().is_empty());
}

#[test]
fn unknown_storage_type_creates_nothing() {
    let orchestrator = setup_orchestrator();
    let first = data_node("first", Scope::Pipeline);
    let second = Arc::new(DataNodeConfig::new("second").with_storage_type("csv"));
    let config = PipelineConfig::new(
        "broken",
        vec![
            task("t1", "identity", &[&first], &[&first]),
            task("t2", "identity", &[&first], &[&second]),
        ],
    );

    let err = orchestrator
        .pipelines()
        .get_or_create(&config, &ExecutionContext::new())
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::UnknownConnector { .. }));
    assert_nothing_stored(&orchestrator);
}

#[test]
fn failed_default_write_rolls_back_pipeline() {
    let orchestrator = Orchestrator::builder()
        .with_connector("readonly", Arc::new(WriteRefusingConnector) as Arc<dyn Connector>)
        .build()
        .unwrap();
    let shared = Arc::new(
        DataNodeConfig::new("shared")
            .with_scope(Scope::Global)
            .with_default_data(json!(1)),
    );
    let local = data_node("local", Scope::Pipeline);
    let sealed = Arc::new(
        DataNodeConfig::new("sealed")
            .with_storage_type("readonly")
            .with_default_data(json!(0)),
    );
    let config = PipelineConfig::new(
        "half_written",
        vec![
            task("t1", "identity", &[&shared], &[&local]),
            task("t2", "identity", &[&local], &[&sealed]),
        ],
    );

    let err = orchestrator
        .pipelines()
        .get_or_create(&config, &ExecutionContext::new())
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Connector { .. }));
    assert_nothing_stored(&orchestrator);

    // The global key was released with its node
    let node = orchestrator
        .data()
        .get_or_create(&shared, &ExecutionContext::new())
        .unwrap();
    assert_eq!(orchestrator.data().read(node.id()).unwrap(), json!(1));
    assert_eq!(orchestrator.data().get_all().unwrap().len(), 1);
}

#[test]
fn concurrent_realization_of_global_pipeline_creates_one() {
    let orchestrator = setup_orchestrator();
    let config = by_six_pipeline_config(Scope::Global);

    let ids: Vec<PipelineId> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    orchestrator
                        .pipelines()
                        .get_or_create(&config, &ExecutionContext::new())
                        .unwrap()
                        .id()
                        .clone()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(orchestrator.pipelines().get_all().unwrap().len(), 1);
    assert_eq!(orchestrator.tasks().get_all().unwrap().len(), 2);
    assert_eq!(orchestrator.data().get_all().unwrap().len(), 3);
}
