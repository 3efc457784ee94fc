//! 도메인 타입 — 엔진과 보고 계층이 공유하는 공통 타입
//!
//! 스텝 이름, 스텝 상태, 스텝 종류처럼 시나리오 보고서에 그대로 실리는
//! 값 타입을 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 타입의 모듈 경로를 제거한 짧은 이름을 반환합니다.
///
/// 제네릭 인자는 유지합니다. 예: `a::b::Steps<c::D>` → `Steps<c::D>`
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let generic_start = full.find('<').unwrap_or(full.len());
    let (path, _) = full.split_at(generic_start);
    match path.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// 보고 및 진단용 스텝 식별자
///
/// 스텝을 선언한 family 타입명과 사람이 읽을 수 있는 설명으로 구성됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepName {
    /// 스텝을 선언한 family (예: `"TrafficLightThenSteps"`)
    pub family: String,
    /// 스텝 설명 (예: `"traffic light changes to RED"`)
    pub description: String,
}

impl StepName {
    /// family 이름과 설명으로 스텝 이름을 생성합니다.
    pub fn new(family: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            description: description.into(),
        }
    }

    /// 선언 타입 `T`에서 family 이름을 유도합니다.
    pub fn of<T: ?Sized>(description: impl Into<String>) -> Self {
        Self::new(short_type_name::<T>(), description)
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.family, self.description)
    }
}

/// 스텝 진행 상태
///
/// 상태 전환 (단조 증가, 되돌아가지 않음):
/// - `Pending` → 큐 헤드 도달 → `Active`
/// - `Active` → 실행/매칭 → `Finished`
/// - 선택 스텝이 끝내 만족되지 않은 채 건너뛰어지면 → `Dropped`
/// - 실행 스텝의 동작이 에러를 반환하면 → `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// 선언됨, 아직 큐 헤드에 도달하지 않음
    Pending,
    /// 활성화되어 알림 또는 실행을 기다리는 중
    Active,
    /// 완료
    Finished,
    /// 선택 스텝이 만족되지 않은 채 제외됨
    Dropped,
    /// 실행 스텝의 동작이 실패함
    Failed,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Finished => write!(f, "finished"),
            Self::Dropped => write!(f, "dropped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 보고서에 표시되는 스텝 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// 동작을 수행하는 When 스텝
    Execute,
    /// 병합 가능한 브로드캐스트 스텝
    Broadcast,
    /// 선언 순서대로 매칭되는 Then 스텝
    OrderedCheck,
    /// 그룹 내에서 순서 없이 매칭되는 Then 스텝
    UnorderedCheck,
    /// "절대 발생하지 않아야 함" Then 스텝
    FailingCheck,
    /// 시뮬레이션 종료 신호를 기다리는 Then 스텝
    SimulationEnd,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execute => write!(f, "execute"),
            Self::Broadcast => write!(f, "broadcast"),
            Self::OrderedCheck => write!(f, "ordered-check"),
            Self::UnorderedCheck => write!(f, "unordered-check"),
            Self::FailingCheck => write!(f, "failing-check"),
            Self::SimulationEnd => write!(f, "simulation-end"),
        }
    }
}

/// 시뮬레이션 시각을 사람이 읽을 수 있는 형태로 변환합니다. 예: `12.500s`
pub fn format_sim_time(time: std::time::Duration) -> String {
    format!("{}.{:03}s", time.as_secs(), time.subsec_millis())
}
