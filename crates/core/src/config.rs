//! 설정 관리 — stepwise.toml 파싱 및 런타임 설정
//!
//! [`StepwiseConfig`]는 시나리오 러너와 데모 시뮬레이션의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`STEPWISE_SCENARIO_MAX_EVENTS=500` 형식)
//! 3. 설정 파일 (`stepwise.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), stepwise_core::error::StepwiseError> {
//! use stepwise_core::config::StepwiseConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = StepwiseConfig::load("stepwise.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = StepwiseConfig::parse("[scenario]\nmax_events = 500")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, StepwiseError};

/// 신호등 색상으로 허용되는 값
pub const LIGHT_COLOURS: [&str; 2] = ["RED", "GREEN"];

/// Stepwise 통합 설정
///
/// `stepwise.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 구성 요소는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepwiseConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 시나리오 러너 설정
    #[serde(default)]
    pub scenario: ScenarioConfig,
    /// 신호등 데모 시뮬레이션 설정
    #[serde(default)]
    pub traffic: TrafficConfig,
}

impl StepwiseConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StepwiseError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StepwiseError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StepwiseError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                StepwiseError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, StepwiseError> {
        toml::from_str(toml_str).map_err(|e| {
            StepwiseError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `STEPWISE_{SECTION}_{FIELD}`
    /// 예: `STEPWISE_TRAFFIC_RUN_FOR_SECS=120`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "STEPWISE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "STEPWISE_GENERAL_LOG_FORMAT");

        // Scenario
        override_u64(&mut self.scenario.max_events, "STEPWISE_SCENARIO_MAX_EVENTS");
        override_u64(
            &mut self.scenario.time_limit_secs,
            "STEPWISE_SCENARIO_TIME_LIMIT_SECS",
        );
        override_bool(
            &mut self.scenario.stop_simulation_on_pass,
            "STEPWISE_SCENARIO_STOP_SIMULATION_ON_PASS",
        );

        // Traffic
        override_string(
            &mut self.traffic.initial_traffic_state,
            "STEPWISE_TRAFFIC_INITIAL_TRAFFIC_STATE",
        );
        override_string(
            &mut self.traffic.initial_pedestrian_state,
            "STEPWISE_TRAFFIC_INITIAL_PEDESTRIAN_STATE",
        );
        override_u64(
            &mut self.traffic.red_duration_secs,
            "STEPWISE_TRAFFIC_RED_DURATION_SECS",
        );
        override_u64(
            &mut self.traffic.green_duration_secs,
            "STEPWISE_TRAFFIC_GREEN_DURATION_SECS",
        );
        override_u64(&mut self.traffic.run_for_secs, "STEPWISE_TRAFFIC_RUN_FOR_SECS");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), StepwiseError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.scenario.max_events == 0 {
            return Err(invalid("scenario.max_events", "must be greater than 0"));
        }
        if self.scenario.time_limit_secs == 0 {
            return Err(invalid("scenario.time_limit_secs", "must be greater than 0"));
        }

        for (field, value) in [
            (
                "traffic.initial_traffic_state",
                &self.traffic.initial_traffic_state,
            ),
            (
                "traffic.initial_pedestrian_state",
                &self.traffic.initial_pedestrian_state,
            ),
        ] {
            if !LIGHT_COLOURS.contains(&value.as_str()) {
                return Err(invalid(
                    field,
                    format!("must be one of: {}", LIGHT_COLOURS.join(", ")),
                ));
            }
        }
        if self.traffic.initial_traffic_state == self.traffic.initial_pedestrian_state {
            return Err(invalid(
                "traffic.initial_pedestrian_state",
                "traffic and pedestrian lights must start with different colours",
            ));
        }

        for (field, value) in [
            ("traffic.red_duration_secs", self.traffic.red_duration_secs),
            ("traffic.green_duration_secs", self.traffic.green_duration_secs),
            ("traffic.run_for_secs", self.traffic.run_for_secs),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> StepwiseError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 시나리오 러너 설정
///
/// `max_events`와 `time_limit_secs`는 외부 하네스의 타임아웃 역할을 합니다.
/// 둘 중 하나라도 넘으면 러너는 시나리오를 중단(abort)합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// 한 번의 실행에서 처리할 최대 시뮬레이션 이벤트 수
    pub max_events: u64,
    /// 한 번의 실행에서 허용되는 최대 시뮬레이션 시간 (초)
    pub time_limit_secs: u64,
    /// 시나리오 통과 즉시 시뮬레이션을 정지할지 여부
    pub stop_simulation_on_pass: bool,
}

impl ScenarioConfig {
    /// 시뮬레이션 시간 한도를 `Duration`으로 반환합니다.
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            time_limit_secs: 24 * 60 * 60,
            stop_simulation_on_pass: true,
        }
    }
}

/// 신호등 데모 시뮬레이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// 차량 신호 초기 색상 (RED, GREEN)
    pub initial_traffic_state: String,
    /// 보행자 신호 초기 색상 (RED, GREEN)
    pub initial_pedestrian_state: String,
    /// 차량 신호 적색 유지 시간 (초)
    pub red_duration_secs: u64,
    /// 차량 신호 녹색 유지 시간 (초)
    pub green_duration_secs: u64,
    /// 시뮬레이션 실행 길이 (초)
    pub run_for_secs: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            initial_traffic_state: "RED".to_owned(),
            initial_pedestrian_state: "GREEN".to_owned(),
            red_duration_secs: 30,
            green_duration_secs: 60,
            run_for_secs: 300,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
