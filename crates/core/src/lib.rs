#![doc = include_str!("../README.md")]

pub mod bus;
pub mod config;
pub mod error;
pub mod metrics;
pub mod notification;
pub mod simulation;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, SimulationError, StepError, StepwiseError};

// 설정
pub use config::StepwiseConfig;

// 알림
pub use bus::{NotificationBus, NotificationSubscriber};
pub use notification::Notification;

// 시뮬레이션 제어 trait
pub use simulation::SimulationControl;

// 도메인 타입
pub use types::{StepKind, StepName, StepState};
