//! 시나리오 러너 — 스텝 큐와 시뮬레이션을 함께 구동
//!
//! [`Scenario`]는 시나리오 하나의 캐시, 매니저, 리스너를 묶습니다.
//! [`Scenario::run`]은 시뮬레이션 이벤트를 하나씩 처리하면서 매 이벤트 뒤에 큐를
//! 진행시키므로, 알림은 시뮬레이션이 다음 이벤트로 넘어가기 전에 모두 처리됩니다.
//!
//! # 실행 흐름
//!
//! ```text
//! advance()                       // 선두 When 스텝 실행 (시뮬레이션 시작 등)
//! loop:
//!   결과 확정                    -> 종료
//!   max_events / time_limit 초과 -> abort
//!   run_next_event() == false    -> simulation_finished()
//!   tick(now); advance()
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use stepwise_core::bus::NotificationBus;
use stepwise_core::config::ScenarioConfig;
use stepwise_core::metrics::{
    LABEL_RESULT, SCENARIO_SIMULATED_SECONDS, SCENARIOS_COMPLETED_TOTAL,
    SIM_EVENTS_PROCESSED_TOTAL,
};
use stepwise_core::simulation::SimulationControl;
use stepwise_core::types::{StepName, format_sim_time};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::NotificationCache;
use crate::error::ScenarioError;
use crate::listener::ScenarioNotificationListener;
use crate::manager::{StepManager, StepReport};
use crate::outcome::{ScenarioFailure, ScenarioOutcome};
use crate::steps::{ThenStepFamily, ThenSteps, WhenSteps};

/// 시나리오 실행 보고서
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// 실행 식별자
    pub run_id: Uuid,
    /// 시나리오 이름
    pub name: String,
    /// 최종 결과
    pub outcome: ScenarioOutcome,
    /// 선언 순서대로의 스텝 상태
    pub steps: Vec<StepReport>,
    /// 관찰된 알림 수
    pub notifications_observed: usize,
    /// 처리한 시뮬레이션 이벤트 수
    pub events_processed: u64,
    /// 종료 시점의 시뮬레이션 시각
    pub simulated_time: Duration,
}

impl ScenarioReport {
    /// 통과 여부
    pub fn is_passed(&self) -> bool {
        self.outcome.is_passed()
    }

    /// 실패 사유
    pub fn failure(&self) -> Option<&ScenarioFailure> {
        self.outcome.failure()
    }

    /// 실패했거나 중단 시점에 대기 중이던 스텝
    pub fn failing_step(&self) -> Option<&StepName> {
        self.outcome.failing_step()
    }
}

/// 시나리오
pub struct Scenario {
    run_id: Uuid,
    name: String,
    config: ScenarioConfig,
    cache: NotificationCache,
    manager: StepManager,
    listener: Arc<ScenarioNotificationListener>,
    finished: bool,
}

impl Scenario {
    /// 빈 시나리오를 생성합니다.
    pub fn new(name: impl Into<String>, config: ScenarioConfig) -> Self {
        let cache = NotificationCache::new();
        let manager = StepManager::new(cache.clone());
        let listener = Arc::new(ScenarioNotificationListener::new(
            cache.clone(),
            manager.clone(),
        ));
        Self {
            run_id: Uuid::new_v4(),
            name: name.into(),
            config,
            cache,
            manager,
            listener,
            finished: false,
        }
    }

    /// 실행 식별자
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// 시나리오 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 스텝 매니저
    pub fn step_manager(&self) -> &StepManager {
        &self.manager
    }

    /// 알림 캐시
    pub fn notification_cache(&self) -> &NotificationCache {
        &self.cache
    }

    /// 알림 리스너
    pub fn listener(&self) -> Arc<ScenarioNotificationListener> {
        Arc::clone(&self.listener)
    }

    /// 리스너를 알림 버스에 구독시킵니다.
    pub fn attach(&self, bus: &NotificationBus) {
        bus.subscribe(self.listener());
    }

    /// 이 시나리오에 연결된 When 빌더
    pub fn when<F: ?Sized>(&self) -> WhenSteps {
        WhenSteps::new::<F>(self.manager.clone())
    }

    /// 이 시나리오에 연결된 Then 빌더
    pub fn then<F: ?Sized>(&self) -> ThenSteps {
        ThenSteps::new::<F>(self.manager.clone(), self.cache.clone())
    }

    /// 이 시나리오에 연결된 도메인 Then family
    pub fn then_family<F: ThenStepFamily>(&self) -> F {
        F::create(self.then::<F>())
    }

    /// 시나리오를 끝까지 실행하고 보고서를 반환합니다.
    ///
    /// # Errors
    ///
    /// - 이미 실행된 시나리오: [`ScenarioError::AlreadyRun`]
    /// - 스텝이 없는 시나리오: [`ScenarioError::NoSteps`]
    /// - 스텝 계약 위반 또는 실행 스텝 동작 실패: [`ScenarioError::Step`].
    ///   시뮬레이션은 정지되고 매니저 결과는 `Aborted`로 남습니다.
    pub fn run<S: SimulationControl>(&mut self, sim: &mut S) -> Result<ScenarioReport, ScenarioError> {
        if self.finished {
            return Err(ScenarioError::AlreadyRun {
                name: self.name.clone(),
            });
        }
        if self.manager.step_count() == 0 {
            return Err(ScenarioError::NoSteps {
                name: self.name.clone(),
            });
        }
        self.finished = true;

        let started = Instant::now();
        let time_limit = self.config.time_limit();
        info!(
            run_id = %self.run_id,
            scenario = %self.name,
            steps = self.manager.step_count(),
            "scenario started"
        );

        let mut events: u64 = 0;
        let driven = self.drive(sim, &mut events, time_limit);
        metrics::counter!(SIM_EVENTS_PROCESSED_TOTAL).increment(events);
        if let Err(e) = driven {
            sim.stop();
            return Err(e);
        }

        let outcome = self
            .manager
            .outcome()
            .unwrap_or_else(|| ScenarioOutcome::Aborted {
                reason: "scenario loop ended without an outcome".to_owned(),
                pending_step: self.manager.pending_step(),
            });

        if !outcome.is_passed() || self.config.stop_simulation_on_pass {
            sim.stop();
        }

        let report = ScenarioReport {
            run_id: self.run_id,
            name: self.name.clone(),
            outcome,
            steps: self.manager.step_reports(),
            notifications_observed: self.cache.len(),
            events_processed: events,
            simulated_time: sim.now(),
        };

        metrics::counter!(SCENARIOS_COMPLETED_TOTAL, LABEL_RESULT => report.outcome.label())
            .increment(1);
        metrics::histogram!(SCENARIO_SIMULATED_SECONDS).record(report.simulated_time.as_secs_f64());
        info!(
            run_id = %self.run_id,
            scenario = %self.name,
            result = report.outcome.label(),
            events,
            notifications = report.notifications_observed,
            sim_time = %format_sim_time(report.simulated_time),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scenario completed"
        );
        Ok(report)
    }

    /// 큐가 결과를 확정할 때까지 시뮬레이션 이벤트를 하나씩 진행시킵니다.
    fn drive<S: SimulationControl>(
        &self,
        sim: &mut S,
        events: &mut u64,
        time_limit: Duration,
    ) -> Result<(), ScenarioError> {
        self.manager.tick(sim.now());
        self.manager.advance()?;

        while !self.manager.is_complete() {
            if *events >= self.config.max_events {
                self.manager
                    .abort(format!("event limit of {} reached", self.config.max_events));
                break;
            }
            if sim.now() > time_limit {
                self.manager.abort(format!(
                    "simulated time limit of {} exceeded",
                    format_sim_time(time_limit)
                ));
                break;
            }
            if !sim.run_next_event() {
                debug!(run_id = %self.run_id, events = *events, "simulation is idle");
                self.manager.tick(sim.now());
                self.manager.simulation_finished()?;
                break;
            }
            *events += 1;
            self.manager.tick(sim.now());
            self.manager.advance()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("run_id", &self.run_id)
            .field("name", &self.name)
            .field("manager", &self.manager)
            .field("finished", &self.finished)
            .finish()
    }
}
