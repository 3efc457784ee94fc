//! 시뮬레이션 제어 trait — 엔진이 테스트 대상 시뮬레이션에 요구하는 최소 계약
//!
//! 엔진은 시뮬레이션 로직을 수행하지 않습니다. 시나리오 러너는
//! "다음 이벤트 하나 처리", "현재 시각", "정지" 세 가지만 사용합니다.

use std::time::Duration;

/// 테스트 대상 시뮬레이션의 제어 진입점
///
/// 시뮬레이션은 이벤트 하나를 처리하는 동안 발생한 모든 알림을
/// [`NotificationBus`](crate::bus::NotificationBus)로 동기 발행해야 합니다.
pub trait SimulationControl {
    /// 다음으로 예약된 이벤트 하나를 처리합니다.
    ///
    /// 처리할 이벤트가 없거나(idle) 정지된 상태면 `false`를 반환합니다.
    fn run_next_event(&mut self) -> bool;

    /// 현재 시뮬레이션 시각
    fn now(&self) -> Duration;

    /// 시뮬레이션을 정지합니다. 이후 `run_next_event`는 `false`를 반환합니다.
    fn stop(&mut self);

    /// 정지 여부
    fn is_stopped(&self) -> bool;

    /// idle 상태가 되거나 정지될 때까지 이벤트를 처리하고, 처리한 이벤트 수를 반환합니다.
    fn run_until_idle(&mut self) -> u64 {
        let mut processed = 0;
        while self.run_next_event() {
            processed += 1;
        }
        processed
    }
}
