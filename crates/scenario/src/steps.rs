//! When/Then family — 스텝을 만드는 빌더
//!
//! 도메인 어휘(예: 신호등 스텝)는 이 모듈의 [`WhenSteps`]와 [`ThenSteps`]를 감싸서
//! 만듭니다. family는 불변 빌더이며, [`ThenSteps::create`]나 [`ThenStepFamily`]의
//! 기본 메서드로 같은 매니저/캐시를 공유하는 변형(never, unordered, ...)을 만듭니다.
//!
//! # 사용 예시
//!
//! ```
//! use stepwise_core::notification::Notification;
//! use stepwise_scenario::{NotificationCache, StepManager, ThenStepFamily, ThenSteps};
//!
//! #[derive(Debug)]
//! struct DoorOpened;
//! impl Notification for DoorOpened {}
//!
//! struct DoorThenSteps(ThenSteps);
//!
//! impl ThenStepFamily for DoorThenSteps {
//!     fn create(steps: ThenSteps) -> Self {
//!         Self(steps)
//!     }
//!     fn steps(&self) -> &ThenSteps {
//!         &self.0
//!     }
//! }
//!
//! impl DoorThenSteps {
//!     fn opens(&self) {
//!         self.0.add_check_step::<DoorOpened, _>("door opens", |_| true);
//!     }
//! }
//!
//! let cache = NotificationCache::new();
//! let manager = StepManager::new(cache.clone());
//! let then = DoorThenSteps::create(ThenSteps::new::<DoorThenSteps>(manager, cache));
//! then.opens();
//! then.never().opens();
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use stepwise_core::notification::Notification;
use stepwise_core::types::{StepName, short_type_name};
use tracing::warn;

use crate::cache::NotificationCache;
use crate::check::{CheckCondition, CheckStep, CheckStepExecutionType, TypedMatcher};
use crate::manager::StepManager;
use crate::step::{ActionError, BroadcastStep, ExecuteStep, StepHandle};

/// When family 공통 빌더
#[derive(Clone)]
pub struct WhenSteps {
    manager: StepManager,
    family: Arc<str>,
}

impl WhenSteps {
    /// 선언 타입 `F`의 이름을 family 이름으로 사용합니다.
    pub fn new<F: ?Sized>(manager: StepManager) -> Self {
        Self::named(short_type_name::<F>(), manager)
    }

    /// family 이름을 직접 지정합니다.
    pub fn named(family: impl Into<Arc<str>>, manager: StepManager) -> Self {
        Self {
            manager,
            family: family.into(),
        }
    }

    /// 실행 스텝을 추가합니다.
    pub fn add_execute_step(
        &self,
        description: impl Into<String>,
        action: impl FnOnce() -> Result<(), ActionError> + Send + 'static,
    ) -> StepHandle {
        self.manager
            .add(ExecuteStep::new(self.step_name(description), action))
    }

    /// 브로드캐스트 스텝을 추가합니다. 바로 뒤의 실행 스텝과 한 번에 실행될 수 있습니다.
    pub fn add_broadcast_step(
        &self,
        description: impl Into<String>,
        action: impl FnOnce() -> Result<(), ActionError> + Send + 'static,
    ) -> StepHandle {
        self.manager
            .add(BroadcastStep::new(self.step_name(description), action))
    }

    /// 연결된 스텝 매니저
    pub fn step_manager(&self) -> &StepManager {
        &self.manager
    }

    fn step_name(&self, description: impl Into<String>) -> StepName {
        StepName::new(self.family.as_ref(), description)
    }
}

impl fmt::Debug for WhenSteps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhenSteps")
            .field("family", &self.family)
            .finish()
    }
}

/// Then family가 만드는 검사 스텝에 공통으로 적용되는 옵션
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckStepOptions {
    /// 큐 헤드에 있는 동안 같은 타입의 다른 알림을 허용하지 않음
    pub exclusive: bool,
    /// 만족되지 않아도 시나리오가 실패하지 않음
    pub optional: bool,
    /// 활성화 후 만족 기한
    pub within: Option<Duration>,
}

/// Then family 공통 빌더
#[derive(Clone)]
pub struct ThenSteps {
    manager: StepManager,
    cache: NotificationCache,
    execution_type: CheckStepExecutionType,
    options: CheckStepOptions,
    family: Arc<str>,
}

impl ThenSteps {
    /// 순서 있는 일반 검사를 만드는 family를 생성합니다.
    pub fn new<F: ?Sized>(manager: StepManager, cache: NotificationCache) -> Self {
        Self {
            manager,
            cache,
            execution_type: CheckStepExecutionType::ordered(),
            options: CheckStepOptions::default(),
            family: short_type_name::<F>().into(),
        }
    }

    /// 같은 매니저/캐시/옵션을 공유하고 실행 타입만 다른 family를 만듭니다.
    pub fn create(&self, execution_type: CheckStepExecutionType) -> Self {
        Self {
            execution_type,
            ..self.clone()
        }
    }

    /// failing("절대 발생하지 않아야 함") 변형
    pub fn never(&self) -> Self {
        self.create(self.execution_type.clone().failing())
    }

    /// unordered 그룹 변형. failing 여부는 유지됩니다.
    pub fn unordered(&self, group: impl Into<Arc<str>>) -> Self {
        self.create(
            CheckStepExecutionType::unordered(group)
                .with_failing(self.execution_type.is_failing_step()),
        )
    }

    /// 시간 제한 변형
    pub fn within(&self, bound: Duration) -> Self {
        self.with_options(CheckStepOptions {
            within: Some(bound),
            ..self.options.clone()
        })
    }

    /// exclusive 변형
    pub fn exclusively(&self) -> Self {
        self.with_options(CheckStepOptions {
            exclusive: true,
            ..self.options.clone()
        })
    }

    /// 선택 스텝 변형
    ///
    /// failing 스텝에는 적용되지 않습니다. [`exclusively`](Self::exclusively)와 함께
    /// 쓰면 exclusive가 무시됩니다.
    pub fn optional(&self) -> Self {
        self.with_options(CheckStepOptions {
            optional: true,
            ..self.options.clone()
        })
    }

    fn with_options(&self, options: CheckStepOptions) -> Self {
        Self {
            options,
            ..self.clone()
        }
    }

    /// 실행 타입
    pub fn execution_type(&self) -> &CheckStepExecutionType {
        &self.execution_type
    }

    /// 검사 스텝 옵션
    pub fn options(&self) -> &CheckStepOptions {
        &self.options
    }

    /// 연결된 알림 캐시
    pub fn notification_cache(&self) -> &NotificationCache {
        &self.cache
    }

    /// 연결된 스텝 매니저
    pub fn step_manager(&self) -> &StepManager {
        &self.manager
    }

    /// 활성화 이후 도착하는 `N` 알림을 기다리는 검사 스텝을 추가합니다.
    pub fn add_check_step<N, F>(&self, description: impl Into<String>, predicate: F) -> StepHandle
    where
        N: Notification,
        F: Fn(&N) -> bool + Send + Sync + 'static,
    {
        self.add(
            description,
            CheckCondition::notification(TypedMatcher::new(predicate)),
        )
    }

    /// 이미 관찰된 알림도 인정하는 검사 스텝을 추가합니다.
    ///
    /// 큐 헤드에 도달하면 캐시를 먼저 조회하고, 매칭되는 기록이 있으면 즉시 완료됩니다.
    pub fn add_observed_check_step<N, F>(
        &self,
        description: impl Into<String>,
        predicate: F,
    ) -> StepHandle
    where
        N: Notification,
        F: Fn(&N) -> bool + Send + Sync + 'static,
    {
        self.add(
            description,
            CheckCondition::observed(TypedMatcher::new(predicate)),
        )
    }

    /// 시뮬레이션 종료 신호로만 만족되는 검사 스텝을 추가합니다.
    ///
    /// family의 실행 타입과 옵션은 무시되며 항상 순서 있는 필수 스텝입니다.
    pub fn add_simulation_end_step(&self, description: impl Into<String>) -> StepHandle {
        self.manager.add(CheckStep::new(
            StepName::new(self.family.as_ref(), description),
            CheckStepExecutionType::ordered(),
            CheckCondition::SimulationEnded,
        ))
    }

    fn add(&self, description: impl Into<String>, condition: CheckCondition) -> StepHandle {
        let name = StepName::new(self.family.as_ref(), description);
        if self.options.optional && self.options.exclusive && !self.execution_type.is_failing_step() {
            warn!(step = %name, "exclusive has no effect on an optional step");
        }
        let step = CheckStep::new(name, self.execution_type.clone(), condition)
            .with_optional(self.options.optional)
            .with_exclusive(self.options.exclusive)
            .with_within(self.options.within);
        self.manager.add(step)
    }
}

impl fmt::Debug for ThenSteps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThenSteps")
            .field("family", &self.family)
            .field("execution_type", &self.execution_type)
            .field("options", &self.options)
            .finish()
    }
}

/// 도메인 Then family가 구현하는 trait
///
/// [`create`](Self::create)와 [`steps`](Self::steps)만 구현하면
/// never/unordered/within/exclusively/optional 변형을 기본 제공받습니다.
pub trait ThenStepFamily: Sized {
    /// 공통 빌더로 family를 만듭니다.
    fn create(steps: ThenSteps) -> Self;

    /// 공통 빌더
    fn steps(&self) -> &ThenSteps;

    /// "절대 발생하지 않아야 함" 변형
    fn never(&self) -> Self {
        Self::create(self.steps().never())
    }

    /// unordered 그룹 변형
    fn unordered(&self, group: &str) -> Self {
        Self::create(self.steps().unordered(group))
    }

    /// 시간 제한 변형
    fn within(&self, bound: Duration) -> Self {
        Self::create(self.steps().within(bound))
    }

    /// exclusive 변형
    fn exclusively(&self) -> Self {
        Self::create(self.steps().exclusively())
    }

    /// 선택 스텝 변형
    fn optional(&self) -> Self {
        Self::create(self.steps().optional())
    }
}
