//! 알림 시스템 — 시뮬레이션이 발행하는 도메인 이벤트의 기본 단위
//!
//! 시뮬레이션은 상태 변화를 [`Notification`]으로 발행하고,
//! 시나리오 엔진은 알림의 구체 타입과 호출자가 제공한 predicate로만 매칭합니다.
//! 엔진은 알림이 무엇을 의미하는지 알지 못합니다.

use std::any::{Any, TypeId};
use std::fmt;

use crate::types::short_type_name;

/// `dyn Notification`을 구체 타입으로 다운캐스트하기 위한 보조 trait
///
/// 모든 `'static` 타입에 자동 구현되므로 직접 구현할 필요가 없습니다.
pub trait AsAny: Any {
    /// `&dyn Any`로 변환합니다.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 모든 알림 타입이 구현해야 하는 trait
///
/// 알림은 불변 값입니다. `Send + Sync + 'static` 바운드로
/// 시뮬레이션의 디스패치 경로와 검증 경로 사이에서 `Arc`로 공유할 수 있습니다.
///
/// # 구현 예시
/// ```
/// use stepwise_core::notification::Notification;
///
/// #[derive(Debug)]
/// struct DoorOpened {
///     door_id: u32,
/// }
///
/// impl Notification for DoorOpened {}
/// ```
pub trait Notification: AsAny + fmt::Debug + Send + Sync + 'static {
    /// 알림 타입명 (로깅 및 진단에 사용)
    fn notification_type(&self) -> &'static str {
        short_type_name::<Self>()
    }
}

impl dyn Notification {
    /// 구체 타입의 [`TypeId`]를 반환합니다.
    pub fn concrete_type_id(&self) -> TypeId {
        Any::type_id(self.as_any())
    }

    /// 알림이 `N` 타입인지 확인합니다.
    pub fn is<N: Notification>(&self) -> bool {
        self.as_any().is::<N>()
    }

    /// 알림을 `N` 타입으로 다운캐스트합니다.
    pub fn downcast_ref<N: Notification>(&self) -> Option<&N> {
        self.as_any().downcast_ref::<N>()
    }
}
