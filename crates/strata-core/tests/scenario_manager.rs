//! Scenarios, cycles and their cascading deletion

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use strata_core::{
    DataNodeConfig, Frequency, JobStatus, OrchestratorError, PipelineConfig, ScenarioConfig,
    ScenarioId, Scope,
};
use strata_test_utils::{by_six_pipeline_config, data_node, setup_orchestrator, task, NotifyCounter};

fn by_six_scenario(scope: Scope) -> ScenarioConfig {
    ScenarioConfig::new("forecast", vec![Arc::new(by_six_pipeline_config(scope))])
}

/// Pipeline reading a global input and writing a scenario scoped output
fn mixed_scenario() -> ScenarioConfig {
    let rates = Arc::new(
        DataNodeConfig::new("rates")
            .with_scope(Scope::Global)
            .with_default_data(json!(5)),
    );
    let plan = data_node("plan", Scope::Scenario);
    let pipeline = PipelineConfig::new("planning", vec![task("plan", "mult_by_2", &[&rates], &[&plan])]);
    ScenarioConfig::new("mixed", vec![Arc::new(pipeline)])
}

#[test]
fn create_realizes_pipelines_under_the_scenario() {
    let orchestrator = setup_orchestrator();
    let scenario = orchestrator
        .scenarios()
        .create(&by_six_scenario(Scope::Scenario), None, Some("baseline".into()))
        .unwrap();

    assert_eq!(scenario.config_id(), "forecast");
    assert_eq!(scenario.name(), Some("baseline"));
    assert_eq!(scenario.pipelines().len(), 1);
    assert_eq!(scenario.cycle_id(), None);

    let pipeline = orchestrator.pipelines().get(&scenario.pipelines()[0]).unwrap();
    assert_eq!(pipeline.owner_id(), Some(scenario.id().as_str()));
    let owned = orchestrator.data().get_all_by_owner(scenario.id().as_str()).unwrap();
    assert_eq!(owned.len(), 3);
}

#[test]
fn every_create_is_a_new_scenario() {
    let orchestrator = setup_orchestrator();
    let config = by_six_scenario(Scope::Scenario);
    let a = orchestrator.scenarios().create(&config, None, None).unwrap();
    let b = orchestrator.scenarios().create(&config, None, None).unwrap();

    assert_ne!(a.id(), b.id());
    assert_ne!(a.pipelines(), b.pipelines());
    assert_eq!(orchestrator.scenarios().get_all_by_config_id("forecast").unwrap().len(), 2);
}

#[test]
fn global_entities_are_shared_between_scenarios() {
    let orchestrator = setup_orchestrator();
    let config = by_six_scenario(Scope::Global);
    let a = orchestrator.scenarios().create(&config, None, None).unwrap();
    let b = orchestrator.scenarios().create(&config, None, None).unwrap();

    assert_eq!(a.pipelines(), b.pipelines());
    assert_eq!(orchestrator.data().get_all().unwrap().len(), 3);
}

#[test]
fn frequency_attaches_scenarios_to_cycles() {
    let orchestrator = setup_orchestrator();
    let config = by_six_scenario(Scope::Cycle).with_frequency(Frequency::Monthly);
    let march_1 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let march_31 = Utc.with_ymd_and_hms(2024, 3, 31, 20, 0, 0).unwrap();
    let april = Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap();

    let a = orchestrator.scenarios().create(&config, Some(march_1), None).unwrap();
    let b = orchestrator.scenarios().create(&config, Some(march_31), None).unwrap();
    let c = orchestrator.scenarios().create(&config, Some(april), None).unwrap();

    let march = a.cycle_id().unwrap();
    assert_eq!(b.cycle_id(), Some(march));
    assert_ne!(c.cycle_id(), Some(march));
    assert_eq!(a.pipelines(), b.pipelines());
    assert_ne!(a.pipelines(), c.pipelines());

    let cycle = orchestrator.cycles().get(march).unwrap();
    assert_eq!(cycle.frequency(), Frequency::Monthly);
    assert_eq!(cycle.start_date(), Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    assert_eq!(cycle.end_date(), Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
    assert_eq!(orchestrator.scenarios().get_all_by_cycle(march).unwrap().len(), 2);
    assert_eq!(orchestrator.cycles().get_all().unwrap().len(), 2);
}

#[test]
fn submit_runs_every_pipeline() {
    let counter = NotifyCounter::new();
    let orchestrator = setup_orchestrator();
    orchestrator.register_subscriber("counter", counter.subscriber());
    let scenario = orchestrator
        .scenarios()
        .create(&by_six_scenario(Scope::Scenario), None, None)
        .unwrap();
    orchestrator.scenarios().subscribe("counter", scenario.id()).unwrap();

    let jobs = orchestrator.scenarios().submit(scenario.id(), &[]).unwrap();
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|j| j.status() == JobStatus::Completed));
    assert_eq!(counter.count(), 6);

    let nodes = orchestrator.pipelines().data_nodes(&scenario.pipelines()[0]).unwrap();
    assert_eq!(orchestrator.data().read(nodes["baz"].id()).unwrap(), json!(6));

    orchestrator.scenarios().unsubscribe("counter", scenario.id()).unwrap();
    let err = orchestrator
        .scenarios()
        .unsubscribe("counter", scenario.id())
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::SubscriptionNotFound { .. }));
}

#[test]
fn tags_are_saved() {
    let orchestrator = setup_orchestrator();
    let scenario = orchestrator
        .scenarios()
        .create(&by_six_scenario(Scope::Scenario), None, None)
        .unwrap();

    orchestrator.scenarios().add_tag(scenario.id(), "official").unwrap();
    orchestrator.scenarios().add_tag(scenario.id(), "q1").unwrap();
    let tagged = orchestrator.scenarios().remove_tag(scenario.id(), "q1").unwrap();

    assert!(tagged.has_tag("official"));
    assert!(!tagged.has_tag("q1"));
    assert_eq!(
        orchestrator.scenarios().get(scenario.id()).unwrap().tags(),
        tagged.tags()
    );
    assert_eq!(orchestrator.scenarios().get_all_by_tag("official").unwrap().len(), 1);
}

#[test]
fn unknown_scenario_fails() {
    let orchestrator = setup_orchestrator();
    let id = ScenarioId::from("SCENARIO_missing");
    assert!(matches!(
        orchestrator.scenarios().submit(&id, &[]),
        Err(OrchestratorError::NonExistingScenario { .. })
    ));
    assert!(orchestrator.scenarios().hard_delete(&id).unwrap_err().is_not_found());
}

#[test]
fn hard_delete_removes_what_the_scenario_owns() {
    let orchestrator = setup_orchestrator();
    let config = mixed_scenario();
    let doomed = orchestrator.scenarios().create(&config, None, None).unwrap();
    let survivor = orchestrator.scenarios().create(&config, None, None).unwrap();
    orchestrator.scenarios().submit(doomed.id(), &[]).unwrap();

    orchestrator.scenarios().hard_delete(doomed.id()).unwrap();

    assert!(!orchestrator.scenarios().exists(doomed.id()).unwrap());
    assert!(orchestrator.scenarios().exists(survivor.id()).unwrap());
    assert_eq!(orchestrator.pipelines().get_all().unwrap().len(), 1);
    assert_eq!(orchestrator.tasks().get_all().unwrap().len(), 1);
    assert!(orchestrator.jobs().get_all().unwrap().is_empty());

    let mut remaining: Vec<String> = orchestrator
        .data()
        .get_all()
        .unwrap()
        .iter()
        .map(|n| n.config_id().to_string())
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec!["plan", "rates"]);
}

#[test]
fn hard_delete_cycle_cascades_to_its_scenarios() {
    let orchestrator = setup_orchestrator();
    let config = by_six_scenario(Scope::Cycle).with_frequency(Frequency::Daily);
    let day = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
    let next_day = Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap();

    let a = orchestrator.scenarios().create(&config, Some(day), None).unwrap();
    let b = orchestrator.scenarios().create(&config, Some(day), None).unwrap();
    let other = orchestrator.scenarios().create(&config, Some(next_day), None).unwrap();
    orchestrator.scenarios().submit(a.id(), &[]).unwrap();

    let cycle_id = a.cycle_id().unwrap().clone();
    orchestrator.scenarios().hard_delete_cycle(&cycle_id).unwrap();

    assert!(!orchestrator.cycles().exists(&cycle_id).unwrap());
    assert!(!orchestrator.scenarios().exists(a.id()).unwrap());
    assert!(!orchestrator.scenarios().exists(b.id()).unwrap());
    assert!(orchestrator.scenarios().exists(other.id()).unwrap());

    assert_eq!(orchestrator.pipelines().get_all().unwrap().len(), 1);
    assert_eq!(orchestrator.tasks().get_all().unwrap().len(), 2);
    assert_eq!(orchestrator.data().get_all().unwrap().len(), 3);
    assert!(orchestrator.jobs().get_all().unwrap().is_empty());
}
