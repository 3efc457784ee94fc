//! stepwise.toml 통합 설정 테스트
//!
//! - stepwise.toml.example 파싱 테스트
//! - 파일 로딩 / 누락 파일 에러 테스트
//! - 환경변수 우선순위 테스트

use std::fs;

use stepwise_core::config::StepwiseConfig;
use stepwise_core::error::{ConfigError, StepwiseError};
use tempfile::TempDir;

// =============================================================================
// stepwise.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_and_validates() {
    let content = include_str!("../../../stepwise.toml.example");
    let config = StepwiseConfig::parse(content).expect("example config should parse");
    config
        .validate()
        .expect("example config should pass validation");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.scenario.max_events, 100_000);
    assert_eq!(config.scenario.time_limit_secs, 86_400);
    assert!(config.scenario.stop_simulation_on_pass);
    assert_eq!(config.traffic.initial_traffic_state, "RED");
    assert_eq!(config.traffic.initial_pedestrian_state, "GREEN");
    assert_eq!(config.traffic.red_duration_secs, 30);
    assert_eq!(config.traffic.green_duration_secs, 60);
    assert_eq!(config.traffic.run_for_secs, 300);
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn load_reads_file_from_disk() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("stepwise.toml");
    fs::write(
        &path,
        "[scenario]\nmax_events = 250\n\n[traffic]\nrun_for_secs = 42\n",
    )
    .expect("should write config");

    let config = StepwiseConfig::load(&path).await.expect("should load");
    assert_eq!(config.scenario.max_events, 250);
    assert_eq!(config.traffic.run_for_secs, 42);
    // 나머지는 기본값
    assert_eq!(config.traffic.red_duration_secs, 30);
}

#[tokio::test]
async fn missing_file_is_file_not_found() {
    let err = StepwiseConfig::from_file("/nonexistent/stepwise.toml")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StepwiseError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn invalid_values_fail_on_load() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("bad.toml");
    fs::write(&path, "[traffic]\ngreen_duration_secs = 0\n").expect("should write config");

    let err = StepwiseConfig::from_file(&path).await.unwrap_err();
    assert!(err.to_string().contains("traffic.green_duration_secs"));
}

#[tokio::test]
async fn malformed_file_fails_on_load() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "[general\nlog_level = \"info\"\n").expect("should write config");

    let err = StepwiseConfig::from_file(&path).await.unwrap_err();
    assert!(matches!(
        err,
        StepwiseError::Config(ConfigError::ParseFailed { .. })
    ));
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let original = std::env::var("STEPWISE_SCENARIO_MAX_EVENTS").ok();
    // SAFETY: 테스트는 serial로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("STEPWISE_SCENARIO_MAX_EVENTS", "7");
    }

    let mut config = StepwiseConfig::parse("[scenario]\nmax_events = 500\n").expect("should parse");
    config.apply_env_overrides();
    let result = config.scenario.max_events;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("STEPWISE_SCENARIO_MAX_EVENTS", val),
            None => std::env::remove_var("STEPWISE_SCENARIO_MAX_EVENTS"),
        }
    }

    assert_eq!(result, 7);
}

#[test]
#[serial_test::serial]
fn unparsable_env_value_is_ignored() {
    let original = std::env::var("STEPWISE_SCENARIO_STOP_SIMULATION_ON_PASS").ok();
    // SAFETY: 테스트는 serial로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("STEPWISE_SCENARIO_STOP_SIMULATION_ON_PASS", "sometimes");
    }

    let mut config = StepwiseConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.scenario.stop_simulation_on_pass;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("STEPWISE_SCENARIO_STOP_SIMULATION_ON_PASS", val),
            None => std::env::remove_var("STEPWISE_SCENARIO_STOP_SIMULATION_ON_PASS"),
        }
    }

    assert!(result, "default should survive an unparsable override");
}

#[test]
#[serial_test::serial]
fn env_override_applies_to_traffic_section() {
    let original = std::env::var("STEPWISE_TRAFFIC_INITIAL_TRAFFIC_STATE").ok();
    // SAFETY: 테스트는 serial로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("STEPWISE_TRAFFIC_INITIAL_TRAFFIC_STATE", "GREEN");
    }

    let mut config = StepwiseConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let traffic = config.traffic.initial_traffic_state.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("STEPWISE_TRAFFIC_INITIAL_TRAFFIC_STATE", val),
            None => std::env::remove_var("STEPWISE_TRAFFIC_INITIAL_TRAFFIC_STATE"),
        }
    }

    assert_eq!(traffic, "GREEN");
    // 보행자 신호도 GREEN이므로 검증은 실패해야 함
    assert!(config.validate().is_err());
}
