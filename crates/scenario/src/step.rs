//! 스텝 — 시나리오 큐에 쌓이는 실행 단위
//!
//! 스텝은 두 부류로 나뉩니다.
//!
//! - **실행 스텝** ([`Executable`]): When family가 만드는 동작. [`ExecuteStep`]과
//!   뒤따르는 실행 스텝을 흡수할 수 있는 [`BroadcastStep`]이 있습니다.
//! - **검사 스텝** ([`CheckStep`](crate::check::CheckStep)): Then family가 만드는 기대 조건.
//!
//! 모든 스텝은 단조 증가하는 완료 플래그([`FinishedFlag`])를 가지며,
//! 등록 시 돌려받는 [`StepHandle`]로 외부에서 완료 여부를 관찰할 수 있습니다.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stepwise_core::error::StepError;
use stepwise_core::metrics::{LABEL_STEP_KIND, STEP_EXECUTIONS_TOTAL};
use stepwise_core::types::{StepKind, StepName};
use tracing::debug;

use crate::check::CheckStep;

/// 동작이 반환하는 실패 원인
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// 실행 스텝이 수행하는 동작
pub type Action = Box<dyn FnOnce() -> Result<(), ActionError> + Send>;

fn run_action(info: &StepInfo, action: Action) -> Result<(), StepError> {
    action().map_err(|e| StepError::ActionFailed {
        step: info.name.to_string(),
        reason: e.to_string(),
    })
}

/// 완료 플래그
///
/// `false` → `true` 전환만 가능합니다. 복제본은 같은 플래그를 공유합니다.
#[derive(Debug, Clone, Default)]
pub struct FinishedFlag(Arc<AtomicBool>);

impl FinishedFlag {
    /// 완료되지 않은 플래그를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 완료 여부
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// 완료로 표시합니다. 이번 호출이 실제로 전환시켰으면 `true`를 반환합니다.
    pub fn set(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }
}

/// 스텝 메타데이터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInfo {
    /// 보고용 이름
    pub name: StepName,
    /// 스텝 종류
    pub kind: StepKind,
    /// `false`면 만족되지 않아도 시나리오가 실패하지 않음
    pub required: bool,
}

impl StepInfo {
    /// 필수 스텝 메타데이터를 생성합니다.
    pub fn new(name: StepName, kind: StepKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    /// 필수 여부를 지정합니다.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// 등록된 스텝에 대한 관찰용 핸들
#[derive(Debug, Clone)]
pub struct StepHandle {
    info: StepInfo,
    finished: FinishedFlag,
}

impl StepHandle {
    pub(crate) fn new(info: StepInfo, finished: FinishedFlag) -> Self {
        Self { info, finished }
    }

    /// 스텝 이름
    pub fn name(&self) -> &StepName {
        &self.info.name
    }

    /// 스텝 종류
    pub fn kind(&self) -> StepKind {
        self.info.kind
    }

    /// 필수 스텝 여부
    pub fn is_required(&self) -> bool {
        self.info.required
    }

    /// 완료 여부
    pub fn is_finished(&self) -> bool {
        self.finished.is_set()
    }
}

/// When family가 만드는 실행 스텝의 공통 계약
///
/// 실행 스텝은 큐 헤드에 도달했을 때 엔진이 정확히 한 번 [`execute`](Self::execute)합니다.
/// 병합을 지원하는 스텝은 바로 뒤의 실행 스텝 하나를 흡수하여,
/// 자신의 동작이 끝난 직후 같은 호출 안에서 실행합니다.
pub trait Executable: Send {
    /// 스텝 메타데이터
    fn info(&self) -> &StepInfo;

    /// 완료 플래그
    fn finished_flag(&self) -> &FinishedFlag;

    /// 동작을 수행합니다.
    ///
    /// # Errors
    ///
    /// 이미 실행된 스텝을 다시 실행하면 [`StepError::AlreadyExecuted`]를,
    /// 동작이 에러를 반환하면 [`StepError::ActionFailed`]를 반환합니다.
    fn execute(&mut self) -> Result<(), StepError>;

    /// 뒤따르는 실행 스텝을 흡수할 수 있는지 여부
    fn is_mergeable(&self) -> bool {
        false
    }

    /// 실행 스텝 하나를 흡수합니다.
    ///
    /// # Errors
    ///
    /// 병합을 지원하지 않으면 [`StepError::NotMergeable`]을,
    /// 이미 흡수한 스텝이 있으면 [`StepError::AlreadyMerged`]를 반환합니다.
    fn merge(&mut self, other: Box<dyn Executable>) -> Result<(), StepError> {
        drop(other);
        Err(StepError::NotMergeable {
            target: self.info().name.to_string(),
        })
    }

    /// 완료 여부
    fn is_finished(&self) -> bool {
        self.finished_flag().is_set()
    }

    /// 로그와 메트릭을 남기고 실행합니다.
    fn execute_and_log(&mut self) -> Result<(), StepError> {
        let info = self.info();
        debug!(step = %info.name, kind = %info.kind, "executing step");
        metrics::counter!(STEP_EXECUTIONS_TOTAL, LABEL_STEP_KIND => info.kind.to_string())
            .increment(1);
        self.execute()
    }
}

impl fmt::Debug for dyn Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executable")
            .field("name", &self.info().name)
            .field("kind", &self.info().kind)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// 단발성 실행 스텝
pub struct ExecuteStep {
    info: StepInfo,
    finished: FinishedFlag,
    action: Option<Action>,
}

impl ExecuteStep {
    /// 동작을 감싼 실행 스텝을 생성합니다.
    pub fn new(
        name: StepName,
        action: impl FnOnce() -> Result<(), ActionError> + Send + 'static,
    ) -> Self {
        Self {
            info: StepInfo::new(name, StepKind::Execute),
            finished: FinishedFlag::new(),
            action: Some(Box::new(action)),
        }
    }
}

impl Executable for ExecuteStep {
    fn info(&self) -> &StepInfo {
        &self.info
    }

    fn finished_flag(&self) -> &FinishedFlag {
        &self.finished
    }

    fn execute(&mut self) -> Result<(), StepError> {
        let action = self.action.take().ok_or_else(|| StepError::AlreadyExecuted {
            step: self.info.name.to_string(),
        })?;
        run_action(&self.info, action)?;
        self.finished.set();
        Ok(())
    }
}

/// 브로드캐스트 스텝
///
/// 자신의 동작을 수행한 뒤, 흡수한 실행 스텝이 있으면 이어서 실행합니다.
/// 흡수는 최대 한 번만 허용됩니다. 연속된 여러 브로드캐스트는
/// 오른쪽부터 차례로 접혀 하나의 체인이 됩니다.
///
/// 완료 플래그는 동작을 수행하기 **전에** 설정됩니다. 동작이 유발한 재진입
/// 평가에서 이 스텝은 이미 완료된 것으로 보입니다. 동작이 실패하면 흡수한
/// 스텝은 실행되지 않습니다.
pub struct BroadcastStep {
    info: StepInfo,
    finished: FinishedFlag,
    action: Option<Action>,
    merged: Option<Box<dyn Executable>>,
}

impl BroadcastStep {
    /// 브로드캐스트 동작을 감싼 스텝을 생성합니다.
    pub fn new(
        name: StepName,
        action: impl FnOnce() -> Result<(), ActionError> + Send + 'static,
    ) -> Self {
        Self {
            info: StepInfo::new(name, StepKind::Broadcast),
            finished: FinishedFlag::new(),
            action: Some(Box::new(action)),
            merged: None,
        }
    }

    /// 흡수한 스텝의 메타데이터
    pub fn merged_step(&self) -> Option<&StepInfo> {
        self.merged.as_deref().map(Executable::info)
    }
}

impl Executable for BroadcastStep {
    fn info(&self) -> &StepInfo {
        &self.info
    }

    fn finished_flag(&self) -> &FinishedFlag {
        &self.finished
    }

    fn execute(&mut self) -> Result<(), StepError> {
        if !self.finished.set() {
            return Err(StepError::AlreadyExecuted {
                step: self.info.name.to_string(),
            });
        }
        if let Some(action) = self.action.take() {
            run_action(&self.info, action)?;
        }
        if let Some(merged) = self.merged.as_mut() {
            merged.execute_and_log()?;
        }
        Ok(())
    }

    fn is_mergeable(&self) -> bool {
        true
    }

    fn merge(&mut self, other: Box<dyn Executable>) -> Result<(), StepError> {
        if self.finished.is_set() {
            return Err(StepError::AlreadyExecuted {
                step: self.info.name.to_string(),
            });
        }
        if let Some(existing) = &self.merged {
            return Err(StepError::AlreadyMerged {
                target: format!("{} (holding {})", self.info.name, existing.info().name),
                rejected: other.info().name.to_string(),
            });
        }
        debug!(
            target_step = %self.info.name,
            merged_step = %other.info().name,
            "merged step into broadcast"
        );
        self.merged = Some(other);
        Ok(())
    }
}

/// 큐에 들어가는 스텝
pub enum Step {
    /// When family의 실행 스텝
    Execute(Box<dyn Executable>),
    /// Then family의 검사 스텝
    Check(CheckStep),
}

impl Step {
    /// 스텝 메타데이터
    pub fn info(&self) -> &StepInfo {
        match self {
            Self::Execute(step) => step.info(),
            Self::Check(step) => step.info(),
        }
    }

    /// 완료 여부
    pub fn is_finished(&self) -> bool {
        match self {
            Self::Execute(step) => step.is_finished(),
            Self::Check(step) => step.is_finished(),
        }
    }

    /// 외부 관찰용 핸들을 만듭니다.
    pub fn handle(&self) -> StepHandle {
        let flag = match self {
            Self::Execute(step) => step.finished_flag().clone(),
            Self::Check(step) => step.finished_flag().clone(),
        };
        StepHandle::new(self.info().clone(), flag)
    }
}

impl From<ExecuteStep> for Step {
    fn from(step: ExecuteStep) -> Self {
        Self::Execute(Box::new(step))
    }
}

impl From<BroadcastStep> for Step {
    fn from(step: BroadcastStep) -> Self {
        Self::Execute(Box::new(step))
    }
}

impl From<CheckStep> for Step {
    fn from(step: CheckStep) -> Self {
        Self::Check(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct When;

    fn recording(
        log: &Arc<Mutex<Vec<&'static str>>>,
        label: &'static str,
    ) -> impl FnOnce() -> Result<(), ActionError> + Send + 'static {
        let log = Arc::clone(log);
        move || {
            log.lock().unwrap().push(label);
            Ok(())
        }
    }

    fn noop() -> Result<(), ActionError> {
        Ok(())
    }

    #[test]
    fn finished_flag_transitions_once() {
        let flag = FinishedFlag::new();
        assert!(!flag.is_set());
        assert!(flag.set());
        assert!(!flag.set());
        assert!(flag.is_set());
    }

    #[test]
    fn cloned_flag_shares_state() {
        let flag = FinishedFlag::new();
        let observer = flag.clone();
        flag.set();
        assert!(observer.is_set());
    }

    #[test]
    fn execute_step_runs_action_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut step = ExecuteStep::new(StepName::of::<When>("starts"), recording(&log, "start"));

        step.execute().unwrap();
        assert!(step.is_finished());
        assert_eq!(*log.lock().unwrap(), vec!["start"]);

        let err = step.execute().unwrap_err();
        assert!(matches!(err, StepError::AlreadyExecuted { .. }));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn execute_step_is_not_mergeable() {
        let mut step = ExecuteStep::new(StepName::of::<When>("a"), noop);
        assert!(!step.is_mergeable());
        let other = Box::new(ExecuteStep::new(StepName::of::<When>("b"), noop));
        let err = step.merge(other).unwrap_err();
        assert!(matches!(err, StepError::NotMergeable { .. }));
    }

    #[test]
    fn broadcast_runs_merged_step_after_own_action() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut first = BroadcastStep::new(StepName::of::<When>("first"), recording(&log, "first"));
        let second = ExecuteStep::new(StepName::of::<When>("second"), recording(&log, "second"));
        let second_flag = second.finished_flag().clone();

        first.merge(Box::new(second)).unwrap();
        first.execute().unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        assert!(first.is_finished());
        assert!(second_flag.is_set());
    }

    #[test]
    fn broadcast_rejects_second_merge_and_keeps_first() {
        let mut step = BroadcastStep::new(StepName::of::<When>("a"), noop);
        step.merge(Box::new(ExecuteStep::new(StepName::of::<When>("b"), noop)))
            .unwrap();

        let err = step
            .merge(Box::new(ExecuteStep::new(StepName::of::<When>("c"), noop)))
            .unwrap_err();
        assert!(matches!(err, StepError::AlreadyMerged { .. }));
        assert!(err.to_string().contains("When: c"));

        let merged = step.merged_step().unwrap();
        assert_eq!(merged.name.description, "b");
    }

    #[test]
    fn broadcast_is_marked_finished_before_action_runs() {
        let mut step = BroadcastStep::new(StepName::of::<When>("a"), noop);
        let flag = step.finished_flag().clone();
        let observed = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&observed);
        step.action = Some(Box::new(move || {
            *seen.lock().unwrap() = Some(flag.is_set());
            Ok(())
        }));

        step.execute().unwrap();
        assert_eq!(*observed.lock().unwrap(), Some(true));
    }

    #[test]
    fn broadcast_cannot_run_twice() {
        let mut step = BroadcastStep::new(StepName::of::<When>("a"), noop);
        step.execute().unwrap();
        assert!(matches!(
            step.execute(),
            Err(StepError::AlreadyExecuted { .. })
        ));
    }

    #[test]
    fn failed_action_leaves_execute_step_unfinished() {
        let mut step = ExecuteStep::new(StepName::of::<When>("changes light"), || {
            Err("simulation not started".into())
        });

        let err = step.execute().unwrap_err();
        match err {
            StepError::ActionFailed { step: name, reason } => {
                assert_eq!(name, "When: changes light");
                assert_eq!(reason, "simulation not started");
            }
            other => panic!("expected action failure, got {other:?}"),
        }
        assert!(!step.is_finished());
    }

    #[test]
    fn failed_broadcast_does_not_run_merged_step() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut first = BroadcastStep::new(StepName::of::<When>("first"), || Err("boom".into()));
        let second = ExecuteStep::new(StepName::of::<When>("second"), recording(&log, "second"));
        let second_flag = second.finished_flag().clone();
        first.merge(Box::new(second)).unwrap();

        assert!(matches!(
            first.execute(),
            Err(StepError::ActionFailed { .. })
        ));
        assert!(log.lock().unwrap().is_empty());
        assert!(!second_flag.is_set());
    }

    #[test]
    fn handle_observes_completion() {
        let step: Step = ExecuteStep::new(StepName::of::<When>("a"), noop).into();
        let handle = step.handle();
        assert_eq!(handle.kind(), StepKind::Execute);
        assert!(handle.is_required());
        assert!(!handle.is_finished());

        let Step::Execute(mut exec) = step else {
            panic!("expected execute step");
        };
        exec.execute().unwrap();
        assert!(handle.is_finished());
    }
}
