//! 시뮬레이션 스텝 어휘 — 신호등 시뮬레이션용 When/Then family
//!
//! When family는 [`SimulationApi`]를 캡처하는 실행 스텝을 추가하고,
//! Then family는 [`ThenStepFamily`]를 구현해 `never()`, `unordered()` 등의
//! 변형을 그대로 물려받습니다.

use stepwise_scenario::manager::StepManager;
use stepwise_scenario::step::StepHandle;
use stepwise_scenario::steps::{ThenStepFamily, ThenSteps, WhenSteps};

use crate::api::SimulationApi;
use crate::events::TestEventNotification;
use crate::traffic::{Light, LightColour, TrafficLightChangedNotification};

/// 시뮬레이션 수명 주기 When 스텝
#[derive(Debug, Clone)]
pub struct SimulationWhenSteps {
    steps: WhenSteps,
    api: SimulationApi,
}

impl SimulationWhenSteps {
    pub fn new(manager: StepManager, api: SimulationApi) -> Self {
        Self {
            steps: WhenSteps::new::<Self>(manager),
            api,
        }
    }

    /// 시뮬레이션을 시작합니다.
    pub fn starts(&self) -> StepHandle {
        let api = self.api.clone();
        self.steps
            .add_execute_step("simulation starts", move || Ok(api.start()?))
    }
}

/// 시뮬레이션 수명 주기 Then 스텝
#[derive(Debug)]
pub struct SimulationThenSteps(ThenSteps);

impl ThenStepFamily for SimulationThenSteps {
    fn create(steps: ThenSteps) -> Self {
        Self(steps)
    }

    fn steps(&self) -> &ThenSteps {
        &self.0
    }
}

impl SimulationThenSteps {
    /// 시뮬레이션이 끝날 때까지 기다립니다.
    ///
    /// 앞선 "never" 스텝을 시뮬레이션 끝까지 유지할 때 사용합니다.
    pub fn has_finished(&self) -> StepHandle {
        self.0.add_simulation_end_step("simulation has finished")
    }
}

/// 신호등 When 스텝
#[derive(Debug, Clone)]
pub struct TrafficLightWhenSteps {
    steps: WhenSteps,
    api: SimulationApi,
}

impl TrafficLightWhenSteps {
    pub fn new(manager: StepManager, api: SimulationApi) -> Self {
        Self {
            steps: WhenSteps::new::<Self>(manager),
            api,
        }
    }

    /// 차량 신호를 `colour`로 바꿉니다.
    pub fn is_changed_to(&self, colour: LightColour) -> StepHandle {
        let api = self.api.clone();
        self.steps
            .add_execute_step(format!("traffic light is changed to {colour}"), move || {
                Ok(api.change_traffic_light(colour)?)
            })
    }

    /// 자동 전환을 멈춥니다.
    pub fn placed_under_manual_control(&self) -> StepHandle {
        let api = self.api.clone();
        self.steps
            .add_execute_step("traffic light is placed under manual control", move || {
                api.place_under_manual_control();
                Ok(())
            })
    }
}

/// 신호등 Then 스텝
#[derive(Debug)]
pub struct TrafficLightThenSteps(ThenSteps);

impl ThenStepFamily for TrafficLightThenSteps {
    fn create(steps: ThenSteps) -> Self {
        Self(steps)
    }

    fn steps(&self) -> &ThenSteps {
        &self.0
    }
}

impl TrafficLightThenSteps {
    pub fn changes_traffic_light_to(&self, colour: LightColour) -> StepHandle {
        self.changes_to(Light::Traffic, colour)
    }

    pub fn changes_pedestrian_light_to(&self, colour: LightColour) -> StepHandle {
        self.changes_to(Light::Pedestrian, colour)
    }

    fn changes_to(&self, light: Light, colour: LightColour) -> StepHandle {
        self.0.add_check_step::<TrafficLightChangedNotification, _>(
            format!("{light} light changes to {colour}"),
            move |n| n.light == light && n.colour == colour,
        )
    }
}

/// 테스트 이벤트 When 스텝
///
/// 연속된 발행은 브로드캐스트 스텝으로 묶여 한 번에 실행됩니다.
#[derive(Debug, Clone)]
pub struct TestEventWhenSteps {
    steps: WhenSteps,
    api: SimulationApi,
}

impl TestEventWhenSteps {
    pub fn new(manager: StepManager, api: SimulationApi) -> Self {
        Self {
            steps: WhenSteps::new::<Self>(manager),
            api,
        }
    }

    pub fn broadcasts(&self, name: &str) -> StepHandle {
        self.broadcast(TestEventNotification::new(name))
    }

    pub fn broadcasts_with_metadata<K, V>(
        &self,
        name: &str,
        metadata: impl IntoIterator<Item = (K, V)>,
    ) -> StepHandle
    where
        K: Into<String>,
        V: Into<String>,
    {
        let event = metadata
            .into_iter()
            .fold(TestEventNotification::new(name), |event, (k, v)| {
                event.with_metadata(k, v)
            });
        self.broadcast(event)
    }

    fn broadcast(&self, event: TestEventNotification) -> StepHandle {
        let api = self.api.clone();
        self.steps
            .add_broadcast_step(format!("broadcasts {event}"), move || {
                api.broadcast(event);
                Ok(())
            })
    }
}

/// 테스트 이벤트 Then 스텝
#[derive(Debug)]
pub struct TestEventThenSteps(ThenSteps);

impl ThenStepFamily for TestEventThenSteps {
    fn create(steps: ThenSteps) -> Self {
        Self(steps)
    }

    fn steps(&self) -> &ThenSteps {
        &self.0
    }
}

impl TestEventThenSteps {
    pub fn received(&self, name: &str) -> StepHandle {
        let expected = name.to_owned();
        self.0.add_check_step::<TestEventNotification, _>(
            format!("receives {name}"),
            move |e| e.name == expected,
        )
    }

    pub fn received_with_metadata(&self, name: &str, key: &str, value: &str) -> StepHandle {
        let (expected, key_owned, value_owned) = (name.to_owned(), key.to_owned(), value.to_owned());
        self.0.add_check_step::<TestEventNotification, _>(
            format!("receives {name} with {key}={value}"),
            move |e| e.name == expected && e.has_metadata(&key_owned, &value_owned),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::bus::NotificationBus;
    use stepwise_core::error::StepError;
    use stepwise_core::types::StepKind;
    use stepwise_scenario::NotificationCache;

    use crate::traffic::{TrafficSettings, TrafficSimulation};

    fn wiring() -> (StepManager, NotificationCache, SimulationApi) {
        let cache = NotificationCache::new();
        let manager = StepManager::new(cache.clone());
        let api = SimulationApi::new(TrafficSimulation::new(
            TrafficSettings::default(),
            NotificationBus::new(),
        ));
        (manager, cache, api)
    }

    #[test]
    fn when_steps_are_named_after_family() {
        let (manager, _, api) = wiring();
        let when = TrafficLightWhenSteps::new(manager, api);
        let handle = when.is_changed_to(LightColour::Green);
        assert_eq!(handle.name().family, "TrafficLightWhenSteps");
        assert_eq!(handle.name().description, "traffic light is changed to GREEN");
        assert_eq!(handle.kind(), StepKind::Execute);
    }

    #[test]
    fn changing_light_before_start_fails_the_step() {
        let (manager, _, api) = wiring();
        let when = TrafficLightWhenSteps::new(manager.clone(), api);
        let handle = when.is_changed_to(LightColour::Green);

        let err = manager.advance().unwrap_err();
        assert!(matches!(err, StepError::ActionFailed { .. }));
        assert!(err.to_string().contains("simulation not started"));
        assert!(!handle.is_finished());
    }

    #[test]
    fn test_event_broadcasts_are_broadcast_steps() {
        let (manager, _, api) = wiring();
        let when = TestEventWhenSteps::new(manager, api);
        let handle = when.broadcasts_with_metadata("deploy", [("zone", "north")]);
        assert_eq!(handle.kind(), StepKind::Broadcast);
        assert_eq!(handle.name().description, "broadcasts deploy {zone=north}");
    }

    #[test]
    fn then_variants_keep_vocabulary() {
        let (manager, cache, _) = wiring();
        let then = TrafficLightThenSteps::create(ThenSteps::new::<TrafficLightThenSteps>(
            manager.clone(),
            cache,
        ));
        let handle = then.never().changes_pedestrian_light_to(LightColour::Red);
        assert_eq!(handle.kind(), StepKind::FailingCheck);
        assert_eq!(handle.name().description, "pedestrian light changes to RED");
        assert_eq!(manager.step_count(), 1);
    }

    #[test]
    fn has_finished_is_required_ordered_check() {
        let (manager, cache, _) = wiring();
        let then = SimulationThenSteps::create(ThenSteps::new::<SimulationThenSteps>(manager, cache));
        let handle = then.optional().has_finished();
        assert!(handle.is_required());
        assert_eq!(handle.kind(), StepKind::SimulationEnd);
    }
}
