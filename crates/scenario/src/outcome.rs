//! 시나리오 결과 — pass, fail, abort
//!
//! 시나리오는 정확히 한 번 결과가 결정되며, 결정된 결과는 바뀌지 않습니다.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use stepwise_core::types::StepName;

/// 시나리오 실패 사유
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioFailure {
    /// 시뮬레이션이 끝날 때까지 필수 스텝이 만족되지 않음
    #[error("step '{step}' was never satisfied: expected {expected}")]
    Unsatisfied { step: StepName, expected: String },

    /// failing 스텝이 금지한 알림이 관찰됨
    #[error("step '{step}' observed a forbidden notification {notification} at {at:?}")]
    ForbiddenNotification {
        step: StepName,
        notification: String,
        at: Duration,
    },

    /// exclusive 스텝이 큐 헤드에 있는 동안 같은 타입의 다른 알림이 도착함
    #[error("step '{step}' received unexpected notification {notification} at {at:?}")]
    UnexpectedNotification {
        step: StepName,
        notification: String,
        at: Duration,
    },

    /// within 기한 안에 만족되지 않음
    #[error("step '{step}' was not satisfied by its deadline {deadline:?} (now {now:?})")]
    DeadlineExceeded {
        step: StepName,
        deadline: Duration,
        now: Duration,
    },
}

impl ScenarioFailure {
    /// 실패를 일으킨 스텝
    pub fn step(&self) -> &StepName {
        match self {
            Self::Unsatisfied { step, .. }
            | Self::ForbiddenNotification { step, .. }
            | Self::UnexpectedNotification { step, .. }
            | Self::DeadlineExceeded { step, .. } => step,
        }
    }

    /// 메트릭 레이블용 사유
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unsatisfied { .. } => "unsatisfied",
            Self::ForbiddenNotification { .. } => "forbidden",
            Self::UnexpectedNotification { .. } => "unexpected",
            Self::DeadlineExceeded { .. } => "deadline",
        }
    }
}

/// 시나리오 최종 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    /// 모든 필수 스텝이 만족됨
    Passed,
    /// 검증 실패
    Failed { failure: ScenarioFailure },
    /// 외부 요청 또는 실행 한도로 중단됨
    Aborted {
        reason: String,
        pending_step: Option<StepName>,
    },
}

impl ScenarioOutcome {
    /// 통과 여부
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// 실패 사유
    pub fn failure(&self) -> Option<&ScenarioFailure> {
        match self {
            Self::Failed { failure } => Some(failure),
            _ => None,
        }
    }

    /// 실패했거나 중단 시점에 대기 중이던 스텝
    pub fn failing_step(&self) -> Option<&StepName> {
        match self {
            Self::Passed => None,
            Self::Failed { failure } => Some(failure.step()),
            Self::Aborted { pending_step, .. } => pending_step.as_ref(),
        }
    }

    /// 메트릭 레이블용 결과명
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed { .. } => "failed",
            Self::Aborted { .. } => "aborted",
        }
    }
}

impl From<ScenarioFailure> for ScenarioOutcome {
    fn from(failure: ScenarioFailure) -> Self {
        Self::Failed { failure }
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "PASSED"),
            Self::Failed { failure } => write!(f, "FAILED: {failure}"),
            Self::Aborted {
                reason,
                pending_step: Some(step),
            } => write!(f, "ABORTED: {reason} (pending step '{step}')"),
            Self::Aborted {
                reason,
                pending_step: None,
            } => write!(f, "ABORTED: {reason}"),
        }
    }
}
