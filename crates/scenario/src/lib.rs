#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`step`]: 실행 스텝 (`ExecuteStep`, `BroadcastStep`), 완료 플래그, 스텝 핸들
//! - [`check`]: 검사 스텝, 실행 타입 (ordered/unordered x normal/failing), 알림 매처
//! - [`cache`]: 시나리오 동안 관찰된 알림 기록
//! - [`manager`]: 스텝 큐 상태 머신 (pass/fail 판정)
//! - [`listener`]: 알림 버스 구독자 (캐시 기록 + 매니저 inbox)
//! - [`steps`]: When/Then family 빌더
//! - [`scenario`]: 시나리오 러너와 보고서
//! - [`outcome`]: 시나리오 결과와 실패 사유
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! Simulation --publish--> NotificationBus --> ScenarioNotificationListener
//!                                                 |            |
//!                                          NotificationCache  StepManager.inbox
//!                                                              |
//! Scenario::run --run_next_event / tick / advance-------------> StepManager
//! ```

pub mod cache;
pub mod check;
pub mod error;
pub mod listener;
pub mod manager;
pub mod outcome;
pub mod scenario;
pub mod step;
pub mod steps;

// --- 주요 타입 re-export ---

// 러너
pub use scenario::{Scenario, ScenarioReport};

// 결과
pub use outcome::{ScenarioFailure, ScenarioOutcome};

// 에러
pub use error::ScenarioError;

// 엔진
pub use cache::{NotificationCache, RecordedNotification};
pub use listener::ScenarioNotificationListener;
pub use manager::{StepManager, StepReport};

// 스텝
pub use check::{CheckCondition, CheckStep, CheckStepExecutionType, NotificationMatcher, TypedMatcher};
pub use step::{ActionError, BroadcastStep, Executable, ExecuteStep, FinishedFlag, Step, StepHandle, StepInfo};

// family
pub use steps::{CheckStepOptions, ThenStepFamily, ThenSteps, WhenSteps};
