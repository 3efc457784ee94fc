//! 신호등 스토리 — 시나리오, 시뮬레이션, 스텝 어휘를 한 번에 연결
//!
//! ```
//! use stepwise_core::config::ScenarioConfig;
//! use stepwise_sim::{LightColour, TrafficSettings, TrafficStory};
//!
//! let mut story = TrafficStory::new("red-then-green", ScenarioConfig::default(), TrafficSettings::default());
//! story.when.simulation.starts();
//! story.then.traffic_light.changes_traffic_light_to(LightColour::Red);
//! story.then.traffic_light.changes_traffic_light_to(LightColour::Green);
//!
//! let report = story.run().unwrap();
//! assert!(report.is_passed());
//! ```

use stepwise_core::bus::NotificationBus;
use stepwise_core::config::{ScenarioConfig, TrafficConfig};
use stepwise_core::error::SimulationError;
use stepwise_scenario::{Scenario, ScenarioError, ScenarioReport};

use crate::api::SimulationApi;
use crate::steps::{
    SimulationThenSteps, SimulationWhenSteps, TestEventThenSteps, TestEventWhenSteps,
    TrafficLightThenSteps, TrafficLightWhenSteps,
};
use crate::traffic::{TrafficSettings, TrafficSimulation};

/// When 어휘 모음
#[derive(Debug, Clone)]
pub struct When {
    pub simulation: SimulationWhenSteps,
    pub traffic_light: TrafficLightWhenSteps,
    pub test_event: TestEventWhenSteps,
}

/// Then 어휘 모음
#[derive(Debug)]
pub struct Then {
    pub simulation: SimulationThenSteps,
    pub traffic_light: TrafficLightThenSteps,
    pub test_event: TestEventThenSteps,
}

/// 신호등 시뮬레이션 위에서 실행되는 시나리오 하나
#[derive(Debug)]
pub struct TrafficStory {
    scenario: Scenario,
    api: SimulationApi,
    pub when: When,
    pub then: Then,
}

impl TrafficStory {
    /// 새 시뮬레이션과 시나리오를 만들고 리스너를 버스에 연결합니다.
    pub fn new(name: impl Into<String>, config: ScenarioConfig, settings: TrafficSettings) -> Self {
        let bus = NotificationBus::new();
        let scenario = Scenario::new(name, config);
        scenario.attach(&bus);
        let api = SimulationApi::new(TrafficSimulation::new(settings, bus));

        let manager = scenario.step_manager().clone();
        let when = When {
            simulation: SimulationWhenSteps::new(manager.clone(), api.clone()),
            traffic_light: TrafficLightWhenSteps::new(manager.clone(), api.clone()),
            test_event: TestEventWhenSteps::new(manager, api.clone()),
        };
        let then = Then {
            simulation: scenario.then_family(),
            traffic_light: scenario.then_family(),
            test_event: scenario.then_family(),
        };
        Self {
            scenario,
            api,
            when,
            then,
        }
    }

    /// 설정 파일 섹션으로 스토리를 만듭니다.
    ///
    /// # Errors
    ///
    /// `[traffic]` 색상 값을 해석할 수 없으면 [`SimulationError::UnknownColour`]를 반환합니다.
    pub fn from_config(
        name: impl Into<String>,
        scenario: ScenarioConfig,
        traffic: &TrafficConfig,
    ) -> Result<Self, SimulationError> {
        Ok(Self::new(name, scenario, TrafficSettings::try_from(traffic)?))
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn api(&self) -> &SimulationApi {
        &self.api
    }

    /// 시나리오를 실행합니다.
    pub fn run(&mut self) -> Result<ScenarioReport, ScenarioError> {
        let mut sim = self.api.clone();
        self.scenario.run(&mut sim)
    }
}
