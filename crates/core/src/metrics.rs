//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더 설치 여부는 호출자(바이너리)가 결정합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `stepwise_`
//! - 영역명: `bus_`, `cache_`, `step_`, `scenario_`, `sim_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use stepwise_core::metrics;
//!
//! metrics::counter!(stepwise_core::metrics::STEP_EXECUTIONS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (passed, failed, aborted)
pub const LABEL_RESULT: &str = "result";

/// 실패 사유 레이블 키 (unsatisfied, forbidden, unexpected, deadline)
pub const LABEL_REASON: &str = "reason";

/// 스텝 종류 레이블 키 (execute, broadcast, ordered-check, ...)
pub const LABEL_STEP_KIND: &str = "kind";

// ─── 알림 메트릭 ────────────────────────────────────────────────────

/// Bus: 발행된 알림 수 (counter)
pub const NOTIFICATIONS_PUBLISHED_TOTAL: &str = "stepwise_bus_notifications_published_total";

/// Cache: 기록된 알림 수 (counter)
pub const NOTIFICATIONS_RECORDED_TOTAL: &str = "stepwise_cache_notifications_recorded_total";

// ─── 스텝 메트릭 ────────────────────────────────────────────────────

/// Step: 실행된 When 스텝 수 (counter)
pub const STEP_EXECUTIONS_TOTAL: &str = "stepwise_step_executions_total";

/// Step: 완료된 스텝 수 (counter, label: kind)
pub const STEPS_FINISHED_TOTAL: &str = "stepwise_step_finished_total";

/// Step: 선행 브로드캐스트 스텝에 병합된 스텝 수 (counter)
pub const STEPS_MERGED_TOTAL: &str = "stepwise_step_merged_total";

// ─── 시나리오 메트릭 ────────────────────────────────────────────────

/// Scenario: 종료된 시나리오 수 (counter, label: result)
pub const SCENARIOS_COMPLETED_TOTAL: &str = "stepwise_scenario_completed_total";

/// Scenario: 실패한 시나리오 수 (counter, label: reason)
pub const SCENARIO_FAILURES_TOTAL: &str = "stepwise_scenario_failures_total";

/// Scenario: 시나리오 한 번에 소요된 시뮬레이션 시간 (histogram, 초)
pub const SCENARIO_SIMULATED_SECONDS: &str = "stepwise_scenario_simulated_seconds";

// ─── 시뮬레이션 메트릭 ──────────────────────────────────────────────

/// Sim: 처리된 시뮬레이션 이벤트 수 (counter)
pub const SIM_EVENTS_PROCESSED_TOTAL: &str = "stepwise_sim_events_processed_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        NOTIFICATIONS_PUBLISHED_TOTAL,
        "Total number of notifications published on the notification bus"
    );
    describe_counter!(
        NOTIFICATIONS_RECORDED_TOTAL,
        "Total number of notifications recorded in scenario notification caches"
    );
    describe_counter!(
        STEP_EXECUTIONS_TOTAL,
        "Total number of execute and broadcast steps run"
    );
    describe_counter!(STEPS_FINISHED_TOTAL, "Total number of steps finished");
    describe_counter!(
        STEPS_MERGED_TOTAL,
        "Total number of steps folded into a preceding broadcast step"
    );
    describe_counter!(
        SCENARIOS_COMPLETED_TOTAL,
        "Total number of scenario runs completed, by result"
    );
    describe_counter!(
        SCENARIO_FAILURES_TOTAL,
        "Total number of failed scenario runs, by failure reason"
    );
    describe_histogram!(
        SCENARIO_SIMULATED_SECONDS,
        "Simulated time covered by a single scenario run in seconds"
    );
    describe_counter!(
        SIM_EVENTS_PROCESSED_TOTAL,
        "Total number of simulation events processed by scenario runners"
    );
}
