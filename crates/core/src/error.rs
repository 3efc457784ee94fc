//! 에러 타입 — 도메인별 에러 정의
//!
//! 시나리오 실패(순서 위반, 금지 알림 수신)는 에러가 아니라 시나리오 결과로 보고됩니다.
//! 이 모듈의 에러는 설정 오류와 스텝 배선(wiring) 버그처럼 즉시 실패해야 하는 경우만 다룹니다.

/// Stepwise 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum StepwiseError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스텝 계약 위반
    #[error("step error: {0}")]
    Step(#[from] StepError),

    /// 시뮬레이션 제어 에러
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),

    /// 시나리오 실행 에러 (잘못된 호출 순서 등)
    #[error("scenario error: {0}")]
    Scenario(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 스텝 계약 위반 (배선 버그, 복구하지 않음)
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// 이미 다른 스텝이 병합된 스텝에 다시 병합을 시도함
    #[error("step '{target}' already has a merged step; cannot merge '{rejected}'")]
    AlreadyMerged { target: String, rejected: String },

    /// 병합을 지원하지 않는 스텝에 병합을 시도함
    #[error("step '{target}' is not mergeable")]
    NotMergeable { target: String },

    /// 이미 완료된 단발성 스텝을 다시 실행함
    #[error("step '{step}' has already been executed")]
    AlreadyExecuted { step: String },

    /// 실행 스텝의 동작이 실패함
    #[error("step '{step}' failed: {reason}")]
    ActionFailed { step: String, reason: String },
}

/// 시뮬레이션 제어 에러
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// 시작되지 않은 시뮬레이션에 대한 요청
    #[error("simulation not started")]
    NotStarted,

    /// 이미 시작된 시뮬레이션을 다시 시작함
    #[error("simulation already started")]
    AlreadyStarted,

    /// 알 수 없는 신호 색상
    #[error("unknown light colour '{value}' (expected RED or GREEN)")]
    UnknownColour { value: String },

    /// 과거 시각으로 이벤트 예약 시도
    #[error("cannot schedule event at {at:?}, simulation time is already {now:?}")]
    ScheduleInPast {
        at: std::time::Duration,
        now: std::time::Duration,
    },
}
