//! 검사 스텝 — Then family가 선언하는 기대 조건
//!
//! 검사 스텝은 알림 타입과 predicate로 구성된 [`NotificationMatcher`]를 가지며,
//! [`CheckStepExecutionType`]에 따라 큐에서 평가되는 방식이 달라집니다.
//!
//! | 실행 타입 | 평가 방식 |
//! |-----------|-----------|
//! | ordered | 큐 헤드에 도달한 뒤 도착한 알림과 매칭 |
//! | unordered(group) | 같은 그룹의 연속된 스텝이 함께 활성화되어 어떤 순서로든 매칭 |
//! | failing | 큐 헤드에서 즉시 무장되며, 이후 매칭되는 알림이 오면 시나리오 실패 |

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use stepwise_core::notification::Notification;
use stepwise_core::types::{StepKind, StepName, short_type_name};

use crate::cache::RecordedNotification;
use crate::step::{FinishedFlag, StepInfo};

/// 검사 스텝의 순서 규칙
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepOrdering {
    /// 선언 순서대로 하나씩 평가
    Ordered,
    /// 같은 이름의 연속된 그룹 안에서 순서 없이 평가
    Unordered(Arc<str>),
}

/// 검사 스텝 실행 타입: 순서 규칙과 failing 여부의 조합
///
/// failing 스텝은 "이 조건은 절대 발생하지 않아야 한다"를 뜻합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckStepExecutionType {
    ordering: StepOrdering,
    failing: bool,
}

impl CheckStepExecutionType {
    /// 순서가 있는 일반 검사
    pub fn ordered() -> Self {
        Self {
            ordering: StepOrdering::Ordered,
            failing: false,
        }
    }

    /// 그룹 안에서 순서 없이 매칭되는 일반 검사
    pub fn unordered(group: impl Into<Arc<str>>) -> Self {
        Self {
            ordering: StepOrdering::Unordered(group.into()),
            failing: false,
        }
    }

    /// 같은 순서 규칙의 failing 버전
    pub fn failing(self) -> Self {
        self.with_failing(true)
    }

    /// failing 여부를 지정합니다.
    pub fn with_failing(mut self, failing: bool) -> Self {
        self.failing = failing;
        self
    }

    /// failing 스텝 여부
    pub fn is_failing_step(&self) -> bool {
        self.failing
    }

    /// 순서가 있는 검사 여부
    pub fn is_ordered(&self) -> bool {
        matches!(self.ordering, StepOrdering::Ordered)
    }

    /// unordered 그룹 이름
    pub fn group(&self) -> Option<&str> {
        match &self.ordering {
            StepOrdering::Ordered => None,
            StepOrdering::Unordered(group) => Some(group),
        }
    }

    /// 순서 규칙
    pub fn ordering(&self) -> &StepOrdering {
        &self.ordering
    }
}

impl Default for CheckStepExecutionType {
    fn default() -> Self {
        Self::ordered()
    }
}

impl fmt::Display for CheckStepExecutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.failing { "never " } else { "" };
        match &self.ordering {
            StepOrdering::Ordered => write!(f, "{prefix}ordered"),
            StepOrdering::Unordered(group) => write!(f, "{prefix}unordered({group})"),
        }
    }
}

/// 알림 타입과 predicate로 구성된 매처
pub trait NotificationMatcher: Send + Sync {
    /// 매칭 대상 알림 타입
    fn notification_type(&self) -> TypeId;

    /// 매칭 대상 알림 타입명 (진단용)
    fn type_name(&self) -> &'static str;

    /// 알림이 대상 타입이고 predicate를 만족하는지 확인합니다.
    fn matches(&self, notification: &dyn Notification) -> bool;

    /// 알림이 대상 타입인지 확인합니다.
    fn is_same_type(&self, notification: &dyn Notification) -> bool {
        notification.concrete_type_id() == self.notification_type()
    }
}

/// 구체 알림 타입 `N`에 대한 매처
pub struct TypedMatcher<N, F> {
    predicate: F,
    _notification: PhantomData<fn(&N)>,
}

impl<N, F> TypedMatcher<N, F>
where
    N: Notification,
    F: Fn(&N) -> bool + Send + Sync,
{
    /// predicate로 매처를 생성합니다.
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            _notification: PhantomData,
        }
    }
}

impl<N, F> NotificationMatcher for TypedMatcher<N, F>
where
    N: Notification,
    F: Fn(&N) -> bool + Send + Sync,
{
    fn notification_type(&self) -> TypeId {
        TypeId::of::<N>()
    }

    fn type_name(&self) -> &'static str {
        short_type_name::<N>()
    }

    fn matches(&self, notification: &dyn Notification) -> bool {
        notification
            .downcast_ref::<N>()
            .is_some_and(|n| (self.predicate)(n))
    }
}

/// 검사 스텝이 기다리는 조건
pub enum CheckCondition {
    /// 알림 매칭
    Notification {
        matcher: Box<dyn NotificationMatcher>,
        /// 활성화 시점에 캐시에 이미 있는 알림도 인정할지 여부
        consult_cache: bool,
    },
    /// 시뮬레이션 종료
    SimulationEnded,
}

impl CheckCondition {
    /// 활성화 이후 도착하는 알림을 기다리는 조건
    pub fn notification(matcher: impl NotificationMatcher + 'static) -> Self {
        Self::Notification {
            matcher: Box::new(matcher),
            consult_cache: false,
        }
    }

    /// 이미 관찰된 알림도 인정하는 조건
    pub fn observed(matcher: impl NotificationMatcher + 'static) -> Self {
        Self::Notification {
            matcher: Box::new(matcher),
            consult_cache: true,
        }
    }
}

/// 검사 스텝
pub struct CheckStep {
    info: StepInfo,
    finished: FinishedFlag,
    execution_type: CheckStepExecutionType,
    condition: CheckCondition,
    exclusive: bool,
    within: Option<Duration>,
    activated_at: Option<Duration>,
    watermark: u64,
}

impl CheckStep {
    /// 검사 스텝을 생성합니다.
    ///
    /// 스텝 종류는 실행 타입과 조건에서 결정됩니다. failing 스텝은 항상 필수입니다.
    pub fn new(
        name: StepName,
        execution_type: CheckStepExecutionType,
        condition: CheckCondition,
    ) -> Self {
        let kind = match (&condition, &execution_type) {
            (CheckCondition::SimulationEnded, _) => StepKind::SimulationEnd,
            (_, t) if t.is_failing_step() => StepKind::FailingCheck,
            (_, t) if t.is_ordered() => StepKind::OrderedCheck,
            _ => StepKind::UnorderedCheck,
        };
        Self {
            info: StepInfo::new(name, kind),
            finished: FinishedFlag::new(),
            execution_type,
            condition,
            exclusive: false,
            within: None,
            activated_at: None,
            watermark: 0,
        }
    }

    /// 선택 스텝으로 지정합니다. failing 스텝에는 적용되지 않습니다.
    pub fn with_optional(mut self, optional: bool) -> Self {
        if !self.execution_type.is_failing_step() {
            self.info.required = !optional;
        }
        self
    }

    /// 큐 헤드에 있는 동안 같은 타입의 다른 알림을 허용하지 않습니다.
    ///
    /// 선택 스텝은 큐 헤드를 막지 않으므로 이 옵션이 적용되지 않습니다.
    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// 활성화 후 주어진 시뮬레이션 시간 안에 만족되어야 합니다.
    pub fn with_within(mut self, within: Option<Duration>) -> Self {
        self.within = within;
        self
    }

    /// 스텝 메타데이터
    pub fn info(&self) -> &StepInfo {
        &self.info
    }

    /// 완료 플래그
    pub fn finished_flag(&self) -> &FinishedFlag {
        &self.finished
    }

    /// 완료 여부
    pub fn is_finished(&self) -> bool {
        self.finished.is_set()
    }

    /// 실행 타입
    pub fn execution_type(&self) -> &CheckStepExecutionType {
        &self.execution_type
    }

    /// exclusive 여부. 선택 스텝은 항상 `false`입니다.
    pub fn is_exclusive(&self) -> bool {
        self.exclusive && self.info.required
    }

    /// 필수 여부
    pub fn is_required(&self) -> bool {
        self.info.required
    }

    /// 시뮬레이션 종료를 기다리는 스텝 여부
    pub fn awaits_simulation_end(&self) -> bool {
        matches!(self.condition, CheckCondition::SimulationEnded)
    }

    /// 활성화된 시각
    pub fn activated_at(&self) -> Option<Duration> {
        self.activated_at
    }

    /// 활성화 시 기록한 캐시 시퀀스 경계
    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    /// 만족 기한 (활성화 시각 + within)
    pub fn deadline(&self) -> Option<Duration> {
        match (self.activated_at, self.within) {
            (Some(at), Some(within)) => Some(at + within),
            _ => None,
        }
    }

    /// 시간 제한
    pub fn within(&self) -> Option<Duration> {
        self.within
    }

    /// 알림 매처
    pub fn matcher(&self) -> Option<&dyn NotificationMatcher> {
        match &self.condition {
            CheckCondition::Notification { matcher, .. } => Some(matcher.as_ref()),
            CheckCondition::SimulationEnded => None,
        }
    }

    /// 활성화 시 캐시를 조회해야 하는지 여부
    pub fn consults_cache(&self) -> bool {
        matches!(
            self.condition,
            CheckCondition::Notification {
                consult_cache: true,
                ..
            }
        )
    }

    /// 스텝을 활성화합니다. 이번 호출로 처음 활성화되었으면 `true`를 반환합니다.
    pub(crate) fn activate(&mut self, now: Duration, watermark: u64) -> bool {
        if self.activated_at.is_some() {
            return false;
        }
        self.activated_at = Some(now);
        self.watermark = watermark;
        true
    }

    /// 기록된 알림이 이 스텝의 조건과 매칭되는지 확인합니다.
    pub fn matches(&self, recorded: &RecordedNotification) -> bool {
        self.matcher()
            .is_some_and(|m| m.matches(recorded.notification.as_ref()))
    }

    /// 기록된 알림이 매칭 대상 타입인지 확인합니다.
    pub fn is_same_type(&self, recorded: &RecordedNotification) -> bool {
        self.matcher()
            .is_some_and(|m| m.is_same_type(recorded.notification.as_ref()))
    }

    /// 완료로 표시합니다. 이번 호출이 전환시켰으면 `true`를 반환합니다.
    pub(crate) fn finish(&self) -> bool {
        self.finished.set()
    }

    /// 보고용 기대 조건 설명
    pub fn expectation(&self) -> String {
        match &self.condition {
            CheckCondition::SimulationEnded => "the simulation to finish".to_owned(),
            CheckCondition::Notification { matcher, .. } => {
                let verb = if self.execution_type.is_failing_step() {
                    "no"
                } else {
                    "a"
                };
                format!(
                    "{verb} {} matching '{}'",
                    matcher.type_name(),
                    self.info.name.description
                )
            }
        }
    }
}

impl fmt::Debug for CheckStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckStep")
            .field("name", &self.info.name)
            .field("execution_type", &self.execution_type)
            .field("required", &self.info.required)
            .field("exclusive", &self.exclusive)
            .field("within", &self.within)
            .field("finished", &self.is_finished())
            .finish()
    }
}
