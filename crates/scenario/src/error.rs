//! 시나리오 엔진 에러 타입
//!
//! 시나리오의 pass/fail 판정은 [`ScenarioOutcome`](crate::outcome::ScenarioOutcome)으로 보고되며,
//! 이 에러는 잘못된 호출 순서나 스텝 계약 위반처럼 엔진을 더 진행할 수 없는 경우에만 사용됩니다.

use stepwise_core::error::{StepError, StepwiseError};

/// 시나리오 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// 이미 실행이 끝난 시나리오를 다시 실행함
    #[error("scenario '{name}' has already run")]
    AlreadyRun { name: String },

    /// 스텝이 하나도 없는 시나리오를 실행함
    #[error("scenario '{name}' has no steps")]
    NoSteps { name: String },

    /// 스텝 실행/병합 계약 위반 또는 실행 스텝 동작 실패
    #[error("step execution failed: {0}")]
    Step(#[from] StepError),
}

impl From<ScenarioError> for StepwiseError {
    fn from(err: ScenarioError) -> Self {
        match err {
            ScenarioError::Step(step) => StepwiseError::Step(step),
            other => StepwiseError::Scenario(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_run_display() {
        let err = ScenarioError::AlreadyRun {
            name: "red-then-green".to_owned(),
        };
        assert!(err.to_string().contains("red-then-green"));
    }

    #[test]
    fn step_error_keeps_its_variant_at_top_level() {
        let err = ScenarioError::Step(StepError::NotMergeable {
            target: "When: starts".to_owned(),
        });
        let top: StepwiseError = err.into();
        assert!(matches!(top, StepwiseError::Step(_)));
    }

    #[test]
    fn other_errors_convert_to_scenario_variant() {
        let err = ScenarioError::NoSteps {
            name: "empty".to_owned(),
        };
        let top: StepwiseError = err.into();
        assert!(matches!(top, StepwiseError::Scenario(_)));
        assert!(top.to_string().contains("empty"));
    }
}
