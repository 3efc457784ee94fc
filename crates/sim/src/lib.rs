#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`scheduler`]: 논리 시계와 예약 이벤트 큐
//! - [`traffic`]: 신호등 시뮬레이션과 색상 변경 알림
//! - [`api`]: 스텝 동작과 러너가 공유하는 시뮬레이션 핸들
//! - [`events`]: 시나리오가 직접 발행하는 테스트 이벤트
//! - [`steps`]: When/Then 스텝 어휘
//! - [`story`]: 시나리오와 시뮬레이션을 연결하는 하네스

pub mod api;
pub mod events;
pub mod scheduler;
pub mod steps;
pub mod story;
pub mod traffic;

pub use api::SimulationApi;
pub use events::TestEventNotification;
pub use scheduler::EventScheduler;
pub use steps::{
    SimulationThenSteps, SimulationWhenSteps, TestEventThenSteps, TestEventWhenSteps,
    TrafficLightThenSteps, TrafficLightWhenSteps,
};
pub use story::{Then, TrafficStory, When};
pub use traffic::{
    Light, LightColour, TrafficLightChangedNotification, TrafficSettings, TrafficSimulation,
};
