//! 스텝 매니저 — 시나리오 하나의 스텝 큐를 진행시키는 상태 머신
//!
//! [`StepManager`]는 선언 순서대로 쌓인 스텝 큐를 소유하고, 알림 도착과
//! 실행 스텝 완료를 계기로 큐 헤드를 가능한 만큼 진행시킵니다.
//!
//! # 진행 규칙
//!
//! ```text
//! advance()
//!   loop:
//!     결과 확정됨         -> 종료
//!     큐 헤드 정착        -> failing 스텝 무장, unordered 그룹 활성화, 선택 스텝 배경 등록
//!     inbox에 알림 있음   -> 알림 하나를 활성 검사 스텝에 제공 (failing -> 헤드 -> 배경)
//!     헤드가 실행 스텝    -> 병합 가능한 연속 실행 스텝을 접어서 잠금 없이 실행
//!     큐가 비었음         -> PASSED
//!     그 외               -> 다음 트리거까지 대기
//! ```
//!
//! 리스너는 알림을 inbox에 넣기만 하고 큐를 진행시키지 않습니다. 실행 스텝은
//! 매니저 잠금 없이 실행되므로, 동작 안에서 알림을 동기 발행해도 교착되지 않습니다.
//!
//! 검사 스텝의 predicate는 매니저 잠금을 잡은 채 호출됩니다.
//! predicate 안에서 매니저를 다시 호출하면 안 됩니다.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use stepwise_core::error::StepError;
use stepwise_core::metrics::{
    LABEL_REASON, LABEL_STEP_KIND, SCENARIO_FAILURES_TOTAL, STEPS_FINISHED_TOTAL,
    STEPS_MERGED_TOTAL,
};
use stepwise_core::types::{StepKind, StepName, StepState, format_sim_time};
use tracing::{debug, error, info, trace, warn};

use crate::cache::{NotificationCache, RecordedNotification};
use crate::check::{CheckStep, CheckStepExecutionType, StepOrdering};
use crate::outcome::{ScenarioFailure, ScenarioOutcome};
use crate::step::{Executable, FinishedFlag, Step, StepHandle, StepInfo};

/// 보고용 스텝 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// 선언 순서 (0부터)
    pub position: usize,
    /// 스텝 이름
    pub name: StepName,
    /// 스텝 종류
    pub kind: StepKind,
    /// 필수 여부
    pub required: bool,
    /// 현재 상태
    pub state: StepState,
}

/// 스텝별 진행 상태 기록
#[derive(Default)]
struct Ledger {
    records: Vec<StepReport>,
}

impl Ledger {
    fn register(&mut self, info: &StepInfo) -> usize {
        let position = self.records.len();
        self.records.push(StepReport {
            position,
            name: info.name.clone(),
            kind: info.kind,
            required: info.required,
            state: StepState::Pending,
        });
        position
    }

    fn mark(&mut self, position: usize, state: StepState) {
        if let Some(record) = self.records.get_mut(position) {
            record.state = state;
        }
    }

    fn activate(&mut self, position: usize, check: &CheckStep) {
        self.mark(position, StepState::Active);
        debug!(
            step = %check.info().name,
            kind = %check.info().kind,
            execution_type = %check.execution_type(),
            "check step activated"
        );
    }

    fn finish(&mut self, position: usize, check: &CheckStep, cause: Option<&RecordedNotification>) {
        if !check.finish() {
            return;
        }
        self.mark(position, StepState::Finished);
        metrics::counter!(STEPS_FINISHED_TOTAL, LABEL_STEP_KIND => check.info().kind.to_string())
            .increment(1);
        match cause {
            Some(notification) => debug!(
                step = %check.info().name,
                notification = %notification,
                "check step satisfied"
            ),
            None => debug!(step = %check.info().name, "check step satisfied"),
        }
    }

    fn finish_executed(&mut self, position: usize) {
        self.mark(position, StepState::Finished);
        if let Some(record) = self.records.get(position) {
            metrics::counter!(STEPS_FINISHED_TOTAL, LABEL_STEP_KIND => record.kind.to_string())
                .increment(1);
        }
    }

    fn drop_step(&mut self, position: usize, check: &CheckStep) {
        self.mark(position, StepState::Dropped);
        warn!(
            step = %check.info().name,
            "optional step was not satisfied and has been dropped"
        );
    }
}

/// 선언 순서가 붙은 큐 원소
struct Queued<T> {
    position: usize,
    step: T,
}

type QueuedCheck = Queued<CheckStep>;

/// 큐 헤드에서 함께 활성화된 unordered 그룹
struct ActiveGroup {
    name: Arc<str>,
    members: Vec<QueuedCheck>,
}

impl ActiveGroup {
    fn is_satisfied(&self) -> bool {
        self.members
            .iter()
            .all(|m| !m.step.is_required() || m.step.is_finished())
    }
}

/// 접힌 실행 스텝 체인과 체인에 포함된 스텝의 위치, 완료 플래그
struct ExecutionBatch {
    step: Box<dyn Executable>,
    members: Vec<(usize, FinishedFlag)>,
}

fn is_overdue(check: &CheckStep, now: Duration) -> bool {
    check.is_required() && !check.is_finished() && check.deadline().is_some_and(|d| now > d)
}

fn late_match(check: &CheckStep, recorded: &RecordedNotification) -> Option<ScenarioFailure> {
    let deadline = check.deadline()?;
    (recorded.at > deadline).then(|| ScenarioFailure::DeadlineExceeded {
        step: check.info().name.clone(),
        deadline,
        now: recorded.at,
    })
}

struct ManagerState {
    cache: NotificationCache,
    queue: VecDeque<Queued<Step>>,
    ledger: Ledger,
    active_group: Option<ActiveGroup>,
    background: Vec<QueuedCheck>,
    failing: Vec<QueuedCheck>,
    now: Duration,
    offered_upto: u64,
    simulation_ended: bool,
    outcome: Option<ScenarioOutcome>,
}

impl ManagerState {
    fn new(cache: NotificationCache) -> Self {
        Self {
            cache,
            queue: VecDeque::new(),
            ledger: Ledger::default(),
            active_group: None,
            background: Vec::new(),
            failing: Vec::new(),
            now: Duration::ZERO,
            offered_upto: 0,
            simulation_ended: false,
            outcome: None,
        }
    }

    fn decide(&mut self, outcome: ScenarioOutcome) {
        if self.outcome.is_some() {
            return;
        }
        match &outcome {
            ScenarioOutcome::Passed => {
                info!(sim_time = %format_sim_time(self.now), "all steps satisfied");
            }
            ScenarioOutcome::Failed { failure } => {
                error!(
                    step = %failure.step(),
                    reason = failure.reason(),
                    sim_time = %format_sim_time(self.now),
                    "scenario failed: {failure}"
                );
                metrics::counter!(SCENARIO_FAILURES_TOTAL, LABEL_REASON => failure.reason())
                    .increment(1);
            }
            ScenarioOutcome::Aborted {
                reason,
                pending_step,
            } => {
                warn!(
                    reason = %reason,
                    pending_step = ?pending_step.as_ref().map(ToString::to_string),
                    "scenario aborted"
                );
            }
        }
        self.outcome = Some(outcome);
    }

    /// 검사 스텝을 활성화하고, 캐시 조회 스텝이면 캐시로 즉시 만족시킵니다.
    fn activate(&mut self, check: &mut QueuedCheck) {
        if !check.step.activate(self.now, self.offered_upto) {
            return;
        }
        self.ledger.activate(check.position, &check.step);
        if !check.step.consults_cache() {
            return;
        }
        let hit = check
            .step
            .matcher()
            .and_then(|matcher| self.cache.first_match(matcher));
        if let Some(hit) = hit {
            self.ledger.finish(check.position, &check.step, Some(&hit));
        }
    }

    fn pop_check(&mut self) -> Option<QueuedCheck> {
        if !matches!(
            self.queue.front(),
            Some(Queued {
                step: Step::Check(_),
                ..
            })
        ) {
            return None;
        }
        match self.queue.pop_front() {
            Some(Queued {
                position,
                step: Step::Check(step),
            }) => Some(Queued { position, step }),
            _ => None,
        }
    }

    fn pop_executable(&mut self) -> Option<(usize, Box<dyn Executable>)> {
        if !matches!(
            self.queue.front(),
            Some(Queued {
                step: Step::Execute(_),
                ..
            })
        ) {
            return None;
        }
        match self.queue.pop_front() {
            Some(Queued {
                position,
                step: Step::Execute(step),
            }) => Some((position, step)),
            _ => None,
        }
    }

    /// 큐 헤드를 대기 지점까지 정착시킵니다.
    fn settle(&mut self) {
        while self.outcome.is_none() {
            if self.active_group.is_some() {
                if !self.settle_group() {
                    return;
                }
                continue;
            }

            let Some(Queued {
                step: Step::Check(head),
                ..
            }) = self.queue.front()
            else {
                return;
            };
            let execution_type = head.execution_type().clone();
            let background = !head.is_required() && !head.awaits_simulation_end();

            if execution_type.is_failing_step() {
                self.arm_failing();
            } else if let StepOrdering::Unordered(group) = execution_type.ordering() {
                self.open_group(Arc::clone(group));
            } else if background {
                self.start_background();
            } else if !self.settle_ordered_head() {
                return;
            }
        }
    }

    fn arm_failing(&mut self) {
        let Some(mut check) = self.pop_check() else {
            return;
        };
        self.activate(&mut check);
        debug!(step = %check.step.info().name, "failing step armed");
        self.failing.push(check);
    }

    fn start_background(&mut self) {
        let Some(mut check) = self.pop_check() else {
            return;
        };
        self.activate(&mut check);
        if !check.step.is_finished() {
            self.background.push(check);
        }
    }

    fn open_group(&mut self, name: Arc<str>) {
        let member_type = CheckStepExecutionType::unordered(Arc::clone(&name));
        let mut members = Vec::new();
        while matches!(
            self.queue.front(),
            Some(Queued { step: Step::Check(check), .. }) if check.execution_type() == &member_type
        ) {
            let Some(mut member) = self.pop_check() else {
                break;
            };
            self.activate(&mut member);
            members.push(member);
        }
        debug!(group = %name, members = members.len(), "unordered group activated");
        self.active_group = Some(ActiveGroup { name, members });
    }

    /// 활성 그룹을 점검합니다. 그룹이 닫혔으면 `true`를 반환합니다.
    fn settle_group(&mut self) -> bool {
        let Some(group) = self.active_group.as_ref() else {
            return true;
        };
        if self.simulation_ended {
            for member in group.members.iter().filter(|m| m.step.awaits_simulation_end()) {
                self.ledger.finish(member.position, &member.step, None);
            }
        }
        if !group.is_satisfied() {
            return false;
        }
        if let Some(group) = self.active_group.take() {
            debug!(group = %group.name, "unordered group satisfied");
            // 남은 선택 멤버는 배경에서 계속 매칭
            self.background
                .extend(group.members.into_iter().filter(|m| !m.step.is_finished()));
        }
        true
    }

    /// 순서 있는 헤드 검사를 활성화합니다. 헤드가 완료되어 큐에서 빠졌으면 `true`를 반환합니다.
    fn settle_ordered_head(&mut self) -> bool {
        let Some(mut head) = self.pop_check() else {
            return false;
        };
        self.activate(&mut head);
        if self.simulation_ended && head.step.awaits_simulation_end() {
            self.ledger.finish(head.position, &head.step, None);
        }
        if head.step.is_finished() {
            return true;
        }
        self.queue.push_front(Queued {
            position: head.position,
            step: Step::Check(head.step),
        });
        false
    }

    /// 알림 하나를 활성 검사 스텝에 제공합니다. 최대 한 스텝만 알림을 소비합니다.
    fn offer(&mut self, recorded: RecordedNotification) {
        self.offered_upto = self.offered_upto.max(recorded.sequence + 1);
        trace!(notification = %recorded, "offering notification");

        let forbidden = self
            .failing
            .iter()
            .find(|f| f.step.matches(&recorded))
            .map(|f| ScenarioFailure::ForbiddenNotification {
                step: f.step.info().name.clone(),
                notification: format!("{:?}", recorded.notification),
                at: recorded.at,
            });
        if let Some(failure) = forbidden {
            self.decide(failure.into());
            return;
        }

        if let Some(group) = self.active_group.as_ref() {
            let member = group
                .members
                .iter()
                .find(|m| !m.step.is_finished() && m.step.matches(&recorded));
            if let Some(member) = member {
                match late_match(&member.step, &recorded) {
                    Some(failure) => self.decide(failure.into()),
                    None => self
                        .ledger
                        .finish(member.position, &member.step, Some(&recorded)),
                }
                return;
            }
        } else if let Some(Queued {
            position,
            step: Step::Check(head),
        }) = self.queue.front()
            && head.activated_at().is_some()
            && !head.is_finished()
        {
            if head.matches(&recorded) {
                match late_match(head, &recorded) {
                    Some(failure) => self.decide(failure.into()),
                    None => self.ledger.finish(*position, head, Some(&recorded)),
                }
                return;
            }
            if head.is_exclusive() && head.is_same_type(&recorded) {
                let failure = ScenarioFailure::UnexpectedNotification {
                    step: head.info().name.clone(),
                    notification: format!("{:?}", recorded.notification),
                    at: recorded.at,
                };
                self.decide(failure.into());
                return;
            }
        }

        if let Some(optional) = self
            .background
            .iter()
            .find(|b| !b.step.is_finished() && b.step.matches(&recorded))
        {
            self.ledger
                .finish(optional.position, &optional.step, Some(&recorded));
        }
        self.background.retain(|b| !b.step.is_finished());
    }

    /// 대기 중인 검사 스텝의 within 기한을 확인합니다.
    fn check_deadlines(&mut self) {
        let now = self.now;
        let overdue = match (&self.active_group, self.queue.front()) {
            (Some(group), _) => group
                .members
                .iter()
                .find(|m| is_overdue(&m.step, now))
                .map(|m| &m.step),
            (
                None,
                Some(Queued {
                    step: Step::Check(head),
                    ..
                }),
            ) if is_overdue(head, now) => Some(head),
            _ => None,
        };
        let failure = overdue.and_then(|check| {
            check
                .deadline()
                .map(|deadline| ScenarioFailure::DeadlineExceeded {
                    step: check.info().name.clone(),
                    deadline,
                    now,
                })
        });
        if let Some(failure) = failure {
            self.decide(failure.into());
            return;
        }

        let ledger = &mut self.ledger;
        self.background.retain(|b| {
            let expired = b.step.deadline().is_some_and(|d| now > d);
            if expired {
                ledger.drop_step(b.position, &b.step);
            }
            !expired
        });
    }

    /// 큐 헤드의 실행 스텝과 뒤따르는 병합 가능한 실행 스텝을 꺼내 하나로 접습니다.
    fn take_executable(&mut self) -> Result<Option<ExecutionBatch>, StepError> {
        let Some(first) = self.pop_executable() else {
            return Ok(None);
        };
        let mut chain = vec![first];
        while chain.last().is_some_and(|(_, step)| step.is_mergeable()) {
            match self.pop_executable() {
                Some(next) => chain.push(next),
                None => break,
            }
        }

        let members: Vec<(usize, FinishedFlag)> = chain
            .iter()
            .map(|(position, step)| (*position, step.finished_flag().clone()))
            .collect();
        for (position, _) in &members {
            self.ledger.mark(*position, StepState::Active);
        }

        let mut folded: Option<Box<dyn Executable>> = None;
        for (_, mut step) in chain.into_iter().rev() {
            if let Some(tail) = folded.take() {
                step.merge(tail)?;
                metrics::counter!(STEPS_MERGED_TOTAL).increment(1);
            }
            folded = Some(step);
        }
        Ok(folded.map(|step| ExecutionBatch { step, members }))
    }

    /// 실패한 체인을 기록하고 시나리오를 중단합니다.
    ///
    /// 동작을 마친 스텝은 `Finished`, 실패한 스텝은 `Failed`로 남고 나머지는 실행되지 않습니다.
    fn fail_batch(&mut self, batch: &ExecutionBatch, err: &StepError) {
        let failed_name = match err {
            StepError::ActionFailed { step, .. } => Some(step.as_str()),
            _ => None,
        };
        let names_failed = |index: usize| {
            let position = batch.members[index].0;
            failed_name.is_some_and(|name| {
                self.ledger
                    .records
                    .get(position)
                    .is_some_and(|r| r.name.to_string() == name)
            })
        };
        // 브로드캐스트는 동작 전에 완료 플래그를 세우므로 마지막 완료 스텝도 후보
        let last_set = batch.members.iter().rposition(|(_, flag)| flag.is_set());
        let first_unset = batch.members.iter().position(|(_, flag)| !flag.is_set());
        let failed = match (last_set, first_unset) {
            (Some(i), Some(j)) if names_failed(i) && !names_failed(j) => Some(i),
            (_, Some(j)) => Some(j),
            (last, None) => last,
        };

        let mut pending_step = None;
        for (index, (position, flag)) in batch.members.iter().enumerate() {
            if Some(index) == failed {
                self.ledger.mark(*position, StepState::Failed);
                pending_step = self.ledger.records.get(*position).map(|r| r.name.clone());
            } else if flag.is_set() {
                self.ledger.finish_executed(*position);
            } else {
                self.ledger.mark(*position, StepState::Pending);
            }
        }
        error!(error = %err, "step execution failed");
        self.decide(ScenarioOutcome::Aborted {
            reason: err.to_string(),
            pending_step,
        });
    }

    fn pass_if_drained(&mut self) {
        if self.queue.is_empty() && self.active_group.is_none() {
            self.conclude();
        }
    }

    /// 결과를 확정합니다. 이미 확정되었으면 그 결과를 반환합니다.
    fn conclude(&mut self) -> ScenarioOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let cache = &self.cache;
        let violation = self.failing.iter().find_map(|f| {
            let matcher = f.step.matcher()?;
            let hit = cache.first_match_since(matcher, f.step.watermark())?;
            Some(ScenarioFailure::ForbiddenNotification {
                step: f.step.info().name.clone(),
                notification: format!("{:?}", hit.notification),
                at: hit.at,
            })
        });

        let unsatisfied = || -> Option<ScenarioFailure> {
            if let Some(group) = &self.active_group
                && let Some(member) = group
                    .members
                    .iter()
                    .find(|m| m.step.is_required() && !m.step.is_finished())
            {
                return Some(ScenarioFailure::Unsatisfied {
                    step: member.step.info().name.clone(),
                    expected: member.step.expectation(),
                });
            }
            self.queue
                .iter()
                .find(|q| q.step.info().required && !q.step.is_finished())
                .map(|q| ScenarioFailure::Unsatisfied {
                    step: q.step.info().name.clone(),
                    expected: match &q.step {
                        Step::Check(check) => check.expectation(),
                        Step::Execute(_) => "the step to execute".to_owned(),
                    },
                })
        };

        let outcome = match violation.or_else(unsatisfied) {
            Some(failure) => ScenarioOutcome::from(failure),
            None => {
                for armed in &self.failing {
                    self.ledger.finish(armed.position, &armed.step, None);
                }
                for optional in self.background.drain(..) {
                    self.ledger.drop_step(optional.position, &optional.step);
                }
                if let Some(group) = self.active_group.take() {
                    for member in group.members.iter().filter(|m| !m.step.is_finished()) {
                        self.ledger.drop_step(member.position, &member.step);
                    }
                }
                for queued in self.queue.drain(..) {
                    if let Step::Check(check) = &queued.step
                        && !check.is_finished()
                    {
                        self.ledger.drop_step(queued.position, check);
                    }
                }
                ScenarioOutcome::Passed
            }
        };
        self.decide(outcome.clone());
        outcome
    }

    fn pending_step(&self) -> Option<StepName> {
        if let Some(group) = &self.active_group {
            let pending = group
                .members
                .iter()
                .find(|m| m.step.is_required() && !m.step.is_finished())
                .or_else(|| group.members.iter().find(|m| !m.step.is_finished()));
            if let Some(member) = pending {
                return Some(member.step.info().name.clone());
            }
        }
        self.queue.front().map(|q| q.step.info().name.clone())
    }
}

struct Shared {
    state: Mutex<ManagerState>,
    inbox: Mutex<VecDeque<RecordedNotification>>,
    advancing: AtomicBool,
}

/// 스텝 매니저
///
/// 복제해도 같은 큐를 공유합니다. When/Then family와 리스너가 각각 복제본을 보유합니다.
#[derive(Clone)]
pub struct StepManager {
    shared: Arc<Shared>,
}

impl StepManager {
    /// 캐시를 공유하는 빈 매니저를 생성합니다.
    pub fn new(cache: NotificationCache) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ManagerState::new(cache)),
                inbox: Mutex::new(VecDeque::new()),
                advancing: AtomicBool::new(false),
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ManagerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_inbox(&self) -> MutexGuard<'_, VecDeque<RecordedNotification>> {
        self.shared
            .inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 스텝을 큐 끝에 추가하고 관찰용 핸들을 반환합니다.
    pub fn add(&self, step: impl Into<Step>) -> StepHandle {
        let step = step.into();
        let handle = step.handle();
        let mut state = self.lock_state();
        if state.outcome.is_some() {
            warn!(step = %handle.name(), "step added after the scenario completed; it will not run");
        }
        let position = state.ledger.register(step.info());
        debug!(step = %handle.name(), kind = %handle.kind(), position, "step added");
        state.queue.push_back(Queued { position, step });
        handle
    }

    /// 캐시에 기록된 알림을 inbox에 넣습니다. 큐는 진행시키지 않습니다.
    pub fn offer(&self, recorded: RecordedNotification) {
        self.lock_inbox().push_back(recorded);
    }

    /// 현재 시뮬레이션 시각을 전달합니다. 시각은 되돌아가지 않습니다.
    pub fn tick(&self, now: Duration) {
        let mut state = self.lock_state();
        if now > state.now {
            state.now = now;
        }
    }

    /// 큐를 현재 상태가 허용하는 만큼 진행시킵니다.
    ///
    /// 실행 스텝 안에서 재진입 호출되면 아무 일도 하지 않고 돌아옵니다.
    /// 바깥 호출이 이어서 진행합니다.
    ///
    /// # Errors
    ///
    /// 스텝 병합/실행 계약 위반 시 [`StepError`]를 반환합니다.
    pub fn advance(&self) -> Result<(), StepError> {
        if self.shared.advancing.swap(true, Ordering::AcqRel) {
            trace!("advance already in progress");
            return Ok(());
        }
        let result = self.drive();
        self.shared.advancing.store(false, Ordering::Release);
        result
    }

    fn drive(&self) -> Result<(), StepError> {
        loop {
            let mut batch = {
                let mut state = self.lock_state();
                state.settle();
                if state.outcome.is_some() {
                    self.lock_inbox().clear();
                    return Ok(());
                }
                let next = self.lock_inbox().pop_front();
                if let Some(recorded) = next {
                    state.offer(recorded);
                    continue;
                }
                state.check_deadlines();
                if state.outcome.is_some() {
                    return Ok(());
                }
                match state.take_executable()? {
                    Some(batch) => batch,
                    None => {
                        state.pass_if_drained();
                        return Ok(());
                    }
                }
            };

            let result = batch.step.execute_and_log();

            let mut state = self.lock_state();
            if let Err(e) = result {
                state.fail_batch(&batch, &e);
                return Err(e);
            }
            for (position, _) in &batch.members {
                state.ledger.finish_executed(*position);
            }
        }
    }

    /// 시뮬레이션 종료 신호를 처리하고 결과를 확정합니다.
    ///
    /// 종료를 기다리던 스텝을 만족시킨 뒤 큐를 마저 진행하고,
    /// 그래도 남은 필수 스텝이 있으면 첫 번째 미충족 스텝을 실패로 보고합니다.
    ///
    /// # Errors
    ///
    /// 남은 실행 스텝이 계약을 위반하면 [`StepError`]를 반환합니다.
    pub fn simulation_finished(&self) -> Result<ScenarioOutcome, StepError> {
        {
            let mut state = self.lock_state();
            state.simulation_ended = true;
            debug!(sim_time = %format_sim_time(state.now), "simulation end signalled");
        }
        self.advance()?;
        Ok(self.lock_state().conclude())
    }

    /// 남은 스텝을 실행하지 않고 시나리오를 중단합니다.
    ///
    /// 중단 시점의 큐 헤드 스텝 이름을 반환합니다.
    pub fn abort(&self, reason: impl Into<String>) -> Option<StepName> {
        let mut state = self.lock_state();
        let pending_step = state.pending_step();
        state.decide(ScenarioOutcome::Aborted {
            reason: reason.into(),
            pending_step: pending_step.clone(),
        });
        drop(state);
        self.lock_inbox().clear();
        pending_step
    }

    /// 확정된 결과
    pub fn outcome(&self) -> Option<ScenarioOutcome> {
        self.lock_state().outcome.clone()
    }

    /// 결과 확정 여부
    pub fn is_complete(&self) -> bool {
        self.lock_state().outcome.is_some()
    }

    /// 현재 큐 헤드 (unordered 그룹이 활성화된 경우 첫 번째 미완료 멤버)
    pub fn pending_step(&self) -> Option<StepName> {
        self.lock_state().pending_step()
    }

    /// 등록된 스텝 수
    pub fn step_count(&self) -> usize {
        self.lock_state().ledger.records.len()
    }

    /// 모든 스텝의 상태 스냅샷 (선언 순서)
    pub fn step_reports(&self) -> Vec<StepReport> {
        self.lock_state().ledger.records.clone()
    }

    /// 매니저가 마지막으로 받은 시뮬레이션 시각
    pub fn now(&self) -> Duration {
        self.lock_state().now
    }
}

impl fmt::Debug for StepManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("StepManager")
            .field("steps", &state.ledger.records.len())
            .field("queued", &state.queue.len())
            .field("outcome", &state.outcome)
            .finish()
    }
}
