//! 통합 테스트 -- 신호등 시뮬레이션 위에서 시나리오 전체 실행
//!
//! 자동 주기, 수동 제어, never 검사, unordered 그룹, 테스트 이벤트 병합 체인을 검증합니다.

use std::time::Duration;

use stepwise_core::config::{ScenarioConfig, TrafficConfig};
use stepwise_core::error::StepError;
use stepwise_core::types::StepState;
use stepwise_scenario::{ScenarioError, ScenarioFailure, ScenarioOutcome, ThenStepFamily};
use stepwise_sim::{LightColour, TrafficSettings, TrafficStory};

fn story(name: &str) -> TrafficStory {
    TrafficStory::new(name, ScenarioConfig::default(), TrafficSettings::default())
}

fn green_first(run_for_secs: u64) -> TrafficSettings {
    TrafficSettings {
        initial_traffic: LightColour::Green,
        initial_pedestrian: LightColour::Red,
        run_for: Duration::from_secs(run_for_secs),
        ..TrafficSettings::default()
    }
}

#[test]
fn red_then_green_passes() {
    let mut story = story("red-then-green");
    story.when.simulation.starts();
    story.then.traffic_light.changes_traffic_light_to(LightColour::Red);
    story.then.traffic_light.changes_traffic_light_to(LightColour::Green);

    let report = story.run().unwrap();
    assert_eq!(report.outcome, ScenarioOutcome::Passed);
    assert_eq!(report.simulated_time, Duration::from_secs(30));
    assert!(report.steps.iter().all(|s| s.state == StepState::Finished));
    // 통과 즉시 시뮬레이션 정지
    assert!(story.api().is_started());
    assert_eq!(story.api().events_processed(), 2);
}

/// GREEN으로 출발하면 RED 검사는 60초에 만족되고, 실행이 80초에 끝나
/// GREEN 검사가 남습니다. 실패는 RED 단계가 아니라 미충족인 GREEN 단계를 가리킵니다.
/// 순서 있는 헤드는 일치하지 않는 알림을 무시하므로, 0초의 GREEN 알림은 RED 검사를
/// 실패시키지 않습니다.
#[test]
fn green_then_red_names_the_unmet_step() {
    let mut story = TrafficStory::new("green-then-red", ScenarioConfig::default(), green_first(80));
    story.when.simulation.starts();
    story.then.traffic_light.changes_traffic_light_to(LightColour::Red);
    story.then.traffic_light.changes_traffic_light_to(LightColour::Green);

    let report = story.run().unwrap();
    match report.failure() {
        Some(ScenarioFailure::Unsatisfied { step, .. }) => {
            assert_eq!(step.description, "traffic light changes to GREEN");
        }
        other => panic!("expected unsatisfied step, got {other:?}"),
    }
    assert_eq!(report.simulated_time, Duration::from_secs(80));
    assert_eq!(report.steps[1].state, StepState::Finished);
}

#[test]
fn manual_mode_keeps_lights_steady_until_the_end() {
    let mut story = story("manual-mode-never-changes");
    story.when.simulation.starts();
    story.when.traffic_light.placed_under_manual_control();
    story.then.traffic_light.never().changes_traffic_light_to(LightColour::Green);
    story.then.traffic_light.never().changes_pedestrian_light_to(LightColour::Red);
    story.then.simulation.has_finished();

    let report = story.run().unwrap();
    assert!(report.is_passed(), "{}", report.outcome);
    assert_eq!(report.simulated_time, Duration::from_secs(300));
    assert_eq!(story.api().traffic_light(), LightColour::Red);
    assert!(story.api().is_manual());
}

#[test]
fn automatic_cycle_trips_never_step() {
    let mut story = story("auto-mode-pedestrian-red");
    story.when.simulation.starts();
    story.then.traffic_light.never().changes_pedestrian_light_to(LightColour::Red);
    story.then.simulation.has_finished();

    let report = story.run().unwrap();
    match report.failure() {
        Some(ScenarioFailure::ForbiddenNotification { step, at, .. }) => {
            assert_eq!(step.description, "pedestrian light changes to RED");
            assert_eq!(*at, Duration::from_secs(30));
        }
        other => panic!("expected forbidden notification, got {other:?}"),
    }
    assert_eq!(report.simulated_time, Duration::from_secs(30));
}

#[test]
fn unordered_group_accepts_either_arrival_order() {
    let mut story = story("unordered-lights");
    story.when.simulation.starts();
    story
        .then
        .traffic_light
        .unordered("switch")
        .changes_pedestrian_light_to(LightColour::Red);
    story
        .then
        .traffic_light
        .unordered("switch")
        .changes_traffic_light_to(LightColour::Green);

    let report = story.run().unwrap();
    assert!(report.is_passed(), "{}", report.outcome);
    assert_eq!(report.simulated_time, Duration::from_secs(30));
}

#[test]
fn manual_change_is_observed_by_following_check() {
    let mut story = story("manual-change");
    story.when.simulation.starts();
    story.when.traffic_light.placed_under_manual_control();
    story.when.traffic_light.is_changed_to(LightColour::Green);
    story.then.traffic_light.changes_pedestrian_light_to(LightColour::Red);

    let report = story.run().unwrap();
    assert!(report.is_passed(), "{}", report.outcome);
    assert_eq!(report.events_processed, 0);
    assert_eq!(story.api().pedestrian_light(), LightColour::Red);
}

#[test]
fn broadcast_chain_delivers_events_in_order() {
    let mut story = story("test-events");
    let first = story.when.test_event.broadcasts("alpha");
    let second = story.when.test_event.broadcasts("beta");
    let third = story.when.test_event.broadcasts("gamma");
    story.then.test_event.received("alpha");
    story.then.test_event.received("beta");
    story.then.test_event.received("gamma");

    let report = story.run().unwrap();
    assert!(report.is_passed(), "{}", report.outcome);
    assert!(first.is_finished() && second.is_finished() && third.is_finished());
    assert_eq!(report.notifications_observed, 3);
}

#[test]
fn metadata_must_match() {
    let mut story = story("metadata");
    story
        .when
        .test_event
        .broadcasts_with_metadata("deploy", [("zone", "north")]);
    story.then.test_event.received_with_metadata("deploy", "zone", "south");

    let report = story.run().unwrap();
    assert!(matches!(
        report.failure(),
        Some(ScenarioFailure::Unsatisfied { .. })
    ));
}

#[test]
fn within_bound_fails_slow_light_change() {
    let mut story = story("slow-green");
    story.when.simulation.starts();
    story
        .then
        .traffic_light
        .within(Duration::from_secs(20))
        .changes_traffic_light_to(LightColour::Green);

    let report = story.run().unwrap();
    assert!(matches!(
        report.failure(),
        Some(ScenarioFailure::DeadlineExceeded { .. })
    ));
}

#[test]
fn event_limit_aborts_with_pending_step() {
    let config = ScenarioConfig {
        max_events: 1,
        ..ScenarioConfig::default()
    };
    let mut story = TrafficStory::new("event-limit", config, TrafficSettings::default());
    story.when.simulation.starts();
    story.then.traffic_light.changes_traffic_light_to(LightColour::Green);

    let report = story.run().unwrap();
    match &report.outcome {
        ScenarioOutcome::Aborted { pending_step, .. } => {
            let pending = pending_step.as_ref().unwrap();
            assert_eq!(pending.description, "traffic light changes to GREEN");
        }
        other => panic!("expected abort, got {other:?}"),
    }
}

#[test]
fn story_from_config_rejects_unknown_colour() {
    let traffic = TrafficConfig {
        initial_pedestrian_state: "AMBER".to_owned(),
        ..TrafficConfig::default()
    };
    let err = TrafficStory::from_config("bad", ScenarioConfig::default(), &traffic).unwrap_err();
    assert!(err.to_string().contains("AMBER"));
}

#[test]
fn report_serializes_for_json_output() {
    let mut story = story("json");
    story.when.simulation.starts();
    story.then.traffic_light.changes_traffic_light_to(LightColour::Red);

    let report = story.run().unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["name"], "json");
    assert_eq!(json["outcome"]["result"], "passed");
    assert_eq!(json["steps"].as_array().unwrap().len(), 2);
}

#[test]
fn failed_when_action_stops_the_scenario() {
    let mut story = story("change-before-start");
    story.when.traffic_light.is_changed_to(LightColour::Green);
    story.when.simulation.starts();
    story.when.simulation.starts();
    story.then.traffic_light.changes_traffic_light_to(LightColour::Red);

    let err = story.run().unwrap_err();
    match err {
        ScenarioError::Step(StepError::ActionFailed { step, reason }) => {
            assert_eq!(step, "TrafficLightWhenSteps: traffic light is changed to GREEN");
            assert_eq!(reason, "simulation not started");
        }
        other => panic!("expected failed action, got {other:?}"),
    }

    let manager = story.scenario().step_manager();
    let states: Vec<StepState> = manager.step_reports().iter().map(|r| r.state).collect();
    assert_eq!(
        states,
        vec![
            StepState::Failed,
            StepState::Pending,
            StepState::Pending,
            StepState::Pending
        ]
    );
    assert!(matches!(
        manager.outcome(),
        Some(ScenarioOutcome::Aborted { .. })
    ));
    assert!(!story.api().is_started());
}

#[test]
fn starting_twice_fails_the_second_start_step() {
    let mut story = story("start-twice");
    story.when.simulation.starts();
    story.when.simulation.starts();
    story.then.traffic_light.changes_traffic_light_to(LightColour::Red);

    let err = story.run().unwrap_err();
    assert!(err.to_string().contains("simulation already started"));
    let states: Vec<StepState> = story
        .scenario()
        .step_manager()
        .step_reports()
        .iter()
        .map(|r| r.state)
        .collect();
    assert_eq!(
        states,
        vec![StepState::Finished, StepState::Failed, StepState::Pending]
    );
}
