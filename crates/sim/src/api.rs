//! 시뮬레이션 API — 스텝 동작과 시나리오 러너가 공유하는 핸들

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use stepwise_core::bus::NotificationBus;
use stepwise_core::error::SimulationError;
use stepwise_core::notification::Notification;
use stepwise_core::simulation::SimulationControl;

use crate::traffic::{LightColour, TrafficSimulation};

/// 신호등 시뮬레이션 핸들
///
/// 복제해도 같은 시뮬레이션을 가리킵니다. When 스텝의 동작은 핸들 복제본을
/// 캡처하고, 러너는 [`SimulationControl`] 구현을 통해 이벤트를 진행시킵니다.
/// 잠금은 호출 하나 동안만 유지됩니다.
#[derive(Clone)]
pub struct SimulationApi {
    simulation: Arc<Mutex<TrafficSimulation>>,
    bus: NotificationBus,
}

impl SimulationApi {
    pub fn new(simulation: TrafficSimulation) -> Self {
        let bus = simulation.bus().clone();
        Self {
            simulation: Arc::new(Mutex::new(simulation)),
            bus,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrafficSimulation> {
        self.simulation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 시뮬레이션이 알림을 발행하는 버스
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// 시뮬레이션을 시작합니다.
    pub fn start(&self) -> Result<(), SimulationError> {
        self.lock().start()
    }

    /// 현재 시각에 임의의 알림을 발행합니다.
    pub fn broadcast<N: Notification>(&self, notification: N) {
        let now = self.lock().now();
        self.bus.publish(now, notification);
    }

    /// 신호등을 수동 제어로 전환합니다.
    pub fn place_under_manual_control(&self) {
        self.lock().place_under_manual_control();
    }

    /// 차량 신호를 바꿉니다.
    pub fn change_traffic_light(&self, colour: LightColour) -> Result<(), SimulationError> {
        self.lock().change_state(colour)
    }

    pub fn traffic_light(&self) -> LightColour {
        self.lock().traffic_light()
    }

    pub fn pedestrian_light(&self) -> LightColour {
        self.lock().pedestrian_light()
    }

    pub fn is_started(&self) -> bool {
        self.lock().is_started()
    }

    pub fn is_manual(&self) -> bool {
        self.lock().is_manual()
    }

    pub fn events_processed(&self) -> u64 {
        self.lock().events_processed()
    }
}

impl SimulationControl for SimulationApi {
    fn run_next_event(&mut self) -> bool {
        self.lock().run_next_event()
    }

    fn now(&self) -> Duration {
        self.lock().now()
    }

    fn stop(&mut self) {
        self.lock().stop();
    }

    fn is_stopped(&self) -> bool {
        self.lock().is_stopped()
    }
}

impl std::fmt::Debug for SimulationApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SimulationApi").field(&*self.lock()).finish()
    }
}
