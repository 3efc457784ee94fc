//! 신호등 시뮬레이션
//!
//! 차량 신호와 보행자 신호는 항상 반대 색상을 유지합니다.
//! 시작하면 설정된 적색/녹색 유지 시간에 따라 자동으로 전환되고,
//! 수동 제어로 전환하면 자동 전환 예약이 모두 취소됩니다.
//! 어느 신호든 색상이 바뀌면 [`TrafficLightChangedNotification`]을 발행합니다.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stepwise_core::bus::NotificationBus;
use stepwise_core::config::TrafficConfig;
use stepwise_core::error::SimulationError;
use stepwise_core::notification::Notification;
use stepwise_core::types::format_sim_time;
use tracing::{debug, info};

use crate::scheduler::EventScheduler;

/// 신호 색상
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LightColour {
    Red,
    Green,
}

impl LightColour {
    /// 반대 색상
    pub fn opposite(self) -> Self {
        match self {
            Self::Red => Self::Green,
            Self::Green => Self::Red,
        }
    }
}

impl fmt::Display for LightColour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => write!(f, "RED"),
            Self::Green => write!(f, "GREEN"),
        }
    }
}

impl FromStr for LightColour {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RED" => Ok(Self::Red),
            "GREEN" => Ok(Self::Green),
            _ => Err(SimulationError::UnknownColour {
                value: s.to_owned(),
            }),
        }
    }
}

/// 신호 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Light {
    /// 차량 신호
    Traffic,
    /// 보행자 신호
    Pedestrian,
}

impl fmt::Display for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Traffic => write!(f, "traffic"),
            Self::Pedestrian => write!(f, "pedestrian"),
        }
    }
}

/// 신호 색상 변경 알림
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrafficLightChangedNotification {
    pub light: Light,
    pub colour: LightColour,
}

impl Notification for TrafficLightChangedNotification {}

/// 검증된 신호등 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrafficSettings {
    pub initial_traffic: LightColour,
    pub initial_pedestrian: LightColour,
    pub red_duration: Duration,
    pub green_duration: Duration,
    pub run_for: Duration,
}

impl TrafficSettings {
    /// 차량 신호가 `colour`를 유지하는 시간
    pub fn duration_of(&self, colour: LightColour) -> Duration {
        match colour {
            LightColour::Red => self.red_duration,
            LightColour::Green => self.green_duration,
        }
    }
}

impl TryFrom<&TrafficConfig> for TrafficSettings {
    type Error = SimulationError;

    fn try_from(config: &TrafficConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            initial_traffic: config.initial_traffic_state.parse()?,
            initial_pedestrian: config.initial_pedestrian_state.parse()?,
            red_duration: Duration::from_secs(config.red_duration_secs),
            green_duration: Duration::from_secs(config.green_duration_secs),
            run_for: Duration::from_secs(config.run_for_secs),
        })
    }
}

impl Default for TrafficSettings {
    fn default() -> Self {
        Self {
            initial_traffic: LightColour::Red,
            initial_pedestrian: LightColour::Green,
            red_duration: Duration::from_secs(30),
            green_duration: Duration::from_secs(60),
            run_for: Duration::from_secs(300),
        }
    }
}

/// 시뮬레이션 내부 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TrafficEvent {
    /// 초기 신호 상태 발행
    Initialise,
    /// 자동 신호 전환
    Cycle,
    /// 실행 길이 도달
    EndOfRun,
}

/// 신호등 시뮬레이션
pub struct TrafficSimulation {
    settings: TrafficSettings,
    scheduler: EventScheduler<TrafficEvent>,
    bus: NotificationBus,
    traffic: LightColour,
    pedestrian: LightColour,
    started: bool,
    manual: bool,
    stopped: bool,
    end_at: Duration,
    events_processed: u64,
}

impl TrafficSimulation {
    /// 설정과 알림 버스로 시뮬레이션을 생성합니다.
    pub fn new(settings: TrafficSettings, bus: NotificationBus) -> Self {
        Self {
            traffic: settings.initial_traffic,
            pedestrian: settings.initial_pedestrian,
            settings,
            scheduler: EventScheduler::new(),
            bus,
            started: false,
            manual: false,
            stopped: false,
            end_at: settings.run_for,
            events_processed: 0,
        }
    }

    /// 설정 파일의 `[traffic]` 섹션으로 시뮬레이션을 생성합니다.
    ///
    /// # Errors
    ///
    /// 색상 값을 해석할 수 없으면 [`SimulationError::UnknownColour`]를 반환합니다.
    pub fn from_config(config: &TrafficConfig, bus: NotificationBus) -> Result<Self, SimulationError> {
        Ok(Self::new(TrafficSettings::try_from(config)?, bus))
    }

    /// 시뮬레이션을 시작합니다.
    ///
    /// 현재 시각에 초기 상태 발행을, 실행 길이 끝에 종료 이벤트를 예약하고
    /// 첫 자동 전환을 예약합니다.
    ///
    /// # Errors
    ///
    /// 이미 시작했으면 [`SimulationError::AlreadyStarted`]를 반환합니다.
    pub fn start(&mut self) -> Result<(), SimulationError> {
        if self.started {
            return Err(SimulationError::AlreadyStarted);
        }
        self.started = true;
        let now = self.scheduler.now();
        self.end_at = now + self.settings.run_for;
        self.scheduler.schedule_at(now, TrafficEvent::Initialise)?;
        self.scheduler.schedule_at(self.end_at, TrafficEvent::EndOfRun)?;
        self.schedule_cycle();
        info!(
            traffic = %self.traffic,
            pedestrian = %self.pedestrian,
            run_for = %format_sim_time(self.settings.run_for),
            "traffic simulation started"
        );
        Ok(())
    }

    /// 자동 전환을 멈추고 수동 제어로 전환합니다.
    pub fn place_under_manual_control(&mut self) {
        if self.manual {
            return;
        }
        self.manual = true;
        let cancelled = self
            .scheduler
            .cancel_where(|event| *event == TrafficEvent::Cycle);
        info!(cancelled, "traffic light placed under manual control");
    }

    /// 차량 신호를 `colour`로 바꾸고 보행자 신호를 반대로 맞춥니다.
    ///
    /// 실제로 바뀐 신호에 대해서만 알림을 발행합니다.
    ///
    /// # Errors
    ///
    /// 시작 전이면 [`SimulationError::NotStarted`]를 반환합니다.
    pub fn change_state(&mut self, colour: LightColour) -> Result<(), SimulationError> {
        if !self.started {
            return Err(SimulationError::NotStarted);
        }
        self.set_lights(colour);
        Ok(())
    }

    /// 다음 예약 이벤트 하나를 처리합니다. 처리한 이벤트가 없으면 `false`.
    pub fn run_next_event(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        let Some((at, event)) = self.scheduler.pop_next() else {
            return false;
        };
        debug!(?event, at = %format_sim_time(at), "processing traffic event");
        self.events_processed += 1;
        match event {
            TrafficEvent::Initialise => {
                self.publish(Light::Traffic, self.traffic);
                self.publish(Light::Pedestrian, self.pedestrian);
            }
            TrafficEvent::Cycle => {
                self.set_lights(self.traffic.opposite());
                self.schedule_cycle();
            }
            TrafficEvent::EndOfRun => {
                debug!("traffic simulation reached end of run");
            }
        }
        true
    }

    /// 현재 시뮬레이션 시각
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// 시뮬레이션을 정지합니다.
    pub fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            debug!(pending = self.scheduler.len(), "traffic simulation stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    /// 차량 신호 색상
    pub fn traffic_light(&self) -> LightColour {
        self.traffic
    }

    /// 보행자 신호 색상
    pub fn pedestrian_light(&self) -> LightColour {
        self.pedestrian
    }

    /// 지금까지 처리한 이벤트 수
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// 아직 처리되지 않은 예약 이벤트 수
    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    pub fn settings(&self) -> &TrafficSettings {
        &self.settings
    }

    /// 시뮬레이션이 알림을 발행하는 버스
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    fn schedule_cycle(&mut self) {
        if self.manual {
            return;
        }
        let delay = self.settings.duration_of(self.traffic);
        if self.scheduler.now() + delay >= self.end_at {
            return;
        }
        self.scheduler.schedule_after(delay, TrafficEvent::Cycle);
    }

    fn set_lights(&mut self, traffic: LightColour) {
        let pedestrian = traffic.opposite();
        if self.traffic != traffic {
            self.traffic = traffic;
            self.publish(Light::Traffic, traffic);
        }
        if self.pedestrian != pedestrian {
            self.pedestrian = pedestrian;
            self.publish(Light::Pedestrian, pedestrian);
        }
    }

    fn publish(&self, light: Light, colour: LightColour) {
        debug!(%light, %colour, at = %format_sim_time(self.now()), "light changed");
        self.bus.publish(
            self.now(),
            TrafficLightChangedNotification { light, colour },
        );
    }
}

impl fmt::Debug for TrafficSimulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrafficSimulation")
            .field("now", &self.now())
            .field("traffic", &self.traffic)
            .field("pedestrian", &self.pedestrian)
            .field("started", &self.started)
            .field("manual", &self.manual)
            .field("stopped", &self.stopped)
            .finish()
    }
}
