//! 통합 테스트 -- 알림 버스, 리스너, 매니저, 러너 전체 흐름 검증
//!
//! 동작 안에서 알림을 동기 발행하는 When 스텝, 브로드캐스트 병합 체인,
//! failing/unordered/observed 검사가 함께 쓰이는 시나리오를 실행합니다.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stepwise_core::bus::NotificationBus;
use stepwise_core::config::ScenarioConfig;
use stepwise_core::notification::Notification;
use stepwise_core::simulation::SimulationControl;
use stepwise_core::types::StepState;
use stepwise_scenario::{
    Scenario, ScenarioFailure, ScenarioOutcome, ThenStepFamily, ThenSteps, WhenSteps,
};

#[derive(Debug, Clone, PartialEq)]
struct Announcement {
    topic: String,
}

impl Notification for Announcement {}

#[derive(Debug)]
struct Alarm;

impl Notification for Alarm {}

/// 예약된 알림을 1초 간격으로 하나씩 발행하는 시뮬레이션
#[derive(Clone)]
struct ScriptedSim {
    inner: Arc<Mutex<ScriptState>>,
    bus: NotificationBus,
}

struct ScriptState {
    now: Duration,
    script: VecDeque<Arc<dyn Notification>>,
    stopped: bool,
}

impl ScriptedSim {
    fn new(bus: NotificationBus) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScriptState {
                now: Duration::ZERO,
                script: VecDeque::new(),
                stopped: false,
            })),
            bus,
        }
    }

    fn enqueue(&self, notification: impl Notification) {
        self.inner
            .lock()
            .unwrap()
            .script
            .push_back(Arc::new(notification));
    }

    fn publish_now(&self, notification: impl Notification) {
        let now = self.inner.lock().unwrap().now;
        self.bus.publish(now, notification);
    }
}

impl SimulationControl for ScriptedSim {
    fn run_next_event(&mut self) -> bool {
        let (at, next) = {
            let mut state = self.inner.lock().unwrap();
            if state.stopped {
                return false;
            }
            let Some(next) = state.script.pop_front() else {
                return false;
            };
            state.now += Duration::from_secs(1);
            (state.now, next)
        };
        self.bus.publish_arc(at, next);
        true
    }

    fn now(&self) -> Duration {
        self.inner.lock().unwrap().now
    }

    fn stop(&mut self) {
        self.inner.lock().unwrap().stopped = true;
    }

    fn is_stopped(&self) -> bool {
        self.inner.lock().unwrap().stopped
    }
}

struct AnnouncementWhenSteps {
    steps: WhenSteps,
    sim: ScriptedSim,
}

impl AnnouncementWhenSteps {
    fn announces(&self, topic: &str) {
        let sim = self.sim.clone();
        let topic = topic.to_owned();
        self.steps
            .add_broadcast_step(format!("announces {topic}"), move || {
                sim.publish_now(Announcement { topic });
                Ok(())
            });
    }

    fn schedules(&self, topic: &str) {
        let sim = self.sim.clone();
        let topic = topic.to_owned();
        self.steps
            .add_execute_step(format!("schedules {topic}"), move || {
                sim.enqueue(Announcement { topic });
                Ok(())
            });
    }
}

struct AnnouncementThenSteps(ThenSteps);

impl ThenStepFamily for AnnouncementThenSteps {
    fn create(steps: ThenSteps) -> Self {
        Self(steps)
    }

    fn steps(&self) -> &ThenSteps {
        &self.0
    }
}

impl AnnouncementThenSteps {
    fn hears(&self, topic: &'static str) {
        self.0
            .add_check_step::<Announcement, _>(format!("hears {topic}"), move |a| a.topic == topic);
    }

    fn heard_at_some_point(&self, topic: &'static str) {
        self.0.add_observed_check_step::<Announcement, _>(
            format!("heard {topic} at some point"),
            move |a| a.topic == topic,
        );
    }

    fn alarm_sounds(&self) {
        self.0.add_check_step::<Alarm, _>("alarm sounds", |_| true);
    }

    fn finished(&self) {
        self.0.add_simulation_end_step("simulation has finished");
    }
}

fn setup(name: &str) -> (Scenario, ScriptedSim, AnnouncementWhenSteps, AnnouncementThenSteps) {
    let bus = NotificationBus::new();
    let scenario = Scenario::new(name, ScenarioConfig::default());
    scenario.attach(&bus);
    let sim = ScriptedSim::new(bus);
    let when = AnnouncementWhenSteps {
        steps: scenario.when::<AnnouncementWhenSteps>(),
        sim: sim.clone(),
    };
    let then = scenario.then_family::<AnnouncementThenSteps>();
    (scenario, sim, when, then)
}

#[test]
fn broadcast_chain_notifications_reach_following_checks() {
    let (mut scenario, mut sim, when, then) = setup("broadcast-chain");
    when.announces("first");
    when.announces("second");
    then.unordered("both").hears("second");
    then.unordered("both").hears("first");

    let report = scenario.run(&mut sim).unwrap();
    assert!(report.is_passed(), "{:?}", report.outcome);
    assert_eq!(report.events_processed, 0);
    assert_eq!(report.notifications_observed, 2);
    assert!(report.steps.iter().all(|s| s.state == StepState::Finished));
}

#[test]
fn scheduled_notifications_are_matched_in_order() {
    let (mut scenario, mut sim, when, then) = setup("scheduled");
    when.schedules("alpha");
    when.schedules("beta");
    then.hears("alpha");
    then.hears("beta");

    let report = scenario.run(&mut sim).unwrap();
    assert!(report.is_passed());
    assert_eq!(report.simulated_time, Duration::from_secs(2));
}

#[test]
fn never_step_catches_forbidden_alarm() {
    let (mut scenario, mut sim, when, then) = setup("no-alarm");
    when.schedules("alpha");
    then.never().alarm_sounds();
    then.finished();

    sim.enqueue(Alarm);
    let report = scenario.run(&mut sim).unwrap();
    match report.failure() {
        Some(ScenarioFailure::ForbiddenNotification { step, at, .. }) => {
            assert_eq!(step.description, "alarm sounds");
            assert_eq!(*at, Duration::from_secs(1));
        }
        other => panic!("expected forbidden notification, got {other:?}"),
    }
    assert!(sim.is_stopped());
}

#[test]
fn never_step_passes_when_simulation_ends_quietly() {
    let (mut scenario, mut sim, when, then) = setup("quiet");
    when.schedules("alpha");
    then.never().alarm_sounds();
    then.finished();

    let report = scenario.run(&mut sim).unwrap();
    assert_eq!(report.outcome, ScenarioOutcome::Passed);
    assert_eq!(report.steps.len(), 3);
}

#[test]
fn observed_check_accepts_earlier_notification() {
    let (mut scenario, mut sim, when, then) = setup("observed");
    when.schedules("alpha");
    when.schedules("beta");
    then.hears("beta");
    then.heard_at_some_point("alpha");

    let report = scenario.run(&mut sim).unwrap();
    assert!(report.is_passed());
}

#[test]
fn out_of_order_arrival_names_unsatisfied_step() {
    let (mut scenario, mut sim, when, then) = setup("out-of-order");
    when.schedules("beta");
    when.schedules("alpha");
    then.hears("alpha");
    then.hears("beta");

    let report = scenario.run(&mut sim).unwrap();
    assert!(matches!(
        report.failure(),
        Some(ScenarioFailure::Unsatisfied { .. })
    ));
    assert_eq!(report.failing_step().unwrap().description, "hears beta");
}

#[test]
fn within_bound_fails_slow_notification() {
    let (mut scenario, mut sim, when, then) = setup("deadline");
    when.schedules("filler");
    when.schedules("alpha");
    then.within(Duration::from_secs(1)).hears("alpha");

    let report = scenario.run(&mut sim).unwrap();
    assert!(matches!(
        report.failure(),
        Some(ScenarioFailure::DeadlineExceeded { .. })
    ));
}
