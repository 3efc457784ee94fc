//! 알림 캐시 — 시나리오 동안 관찰된 모든 알림의 기록
//!
//! 리스너는 알림을 큐에 제공하기 전에 먼저 캐시에 기록합니다.
//! 캐시는 알림을 구체 타입별로 도착 순서대로 보관하며, 실행 중에는 절대 삭제하지 않습니다.
//!
//! 모든 기록에는 캐시 전체에서 단조 증가하는 시퀀스 번호가 붙습니다.
//! 시퀀스 경계(watermark)를 사용하면 "특정 시점 이후에 관찰된 알림"만 조회할 수 있습니다.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use stepwise_core::metrics::NOTIFICATIONS_RECORDED_TOTAL;
use stepwise_core::notification::Notification;
use stepwise_core::types::format_sim_time;
use tracing::trace;

use crate::check::{NotificationMatcher, TypedMatcher};

/// 캐시에 기록된 알림
#[derive(Debug, Clone)]
pub struct RecordedNotification {
    /// 캐시 전체 기준 도착 순번 (0부터)
    pub sequence: u64,
    /// 발행된 시뮬레이션 시각
    pub at: Duration,
    /// 알림 본문
    pub notification: Arc<dyn Notification>,
}

impl RecordedNotification {
    /// 기록을 생성합니다.
    pub fn new(sequence: u64, at: Duration, notification: Arc<dyn Notification>) -> Self {
        Self {
            sequence,
            at,
            notification,
        }
    }

    /// 알림을 `N` 타입으로 다운캐스트합니다.
    pub fn downcast_ref<N: Notification>(&self) -> Option<&N> {
        self.notification.as_ref().downcast_ref::<N>()
    }

    /// 알림 타입명
    pub fn type_name(&self) -> &'static str {
        self.notification.notification_type()
    }
}

impl fmt::Display for RecordedNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {:?} at {}",
            self.sequence,
            self.notification,
            format_sim_time(self.at)
        )
    }
}

#[derive(Default)]
struct CacheInner {
    by_type: HashMap<TypeId, Vec<RecordedNotification>>,
    next_sequence: u64,
}

/// 알림 캐시
///
/// 복제해도 같은 기록을 공유합니다. 시나리오마다 하나씩 사용합니다.
#[derive(Clone, Default)]
pub struct NotificationCache {
    inner: Arc<RwLock<CacheInner>>,
}

impl NotificationCache {
    /// 빈 캐시를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 알림을 기록하고, 부여된 시퀀스가 담긴 기록을 반환합니다.
    pub fn record(&self, at: Duration, notification: Arc<dyn Notification>) -> RecordedNotification {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let recorded = RecordedNotification::new(inner.next_sequence, at, notification);
        inner.next_sequence += 1;

        let type_id = recorded.notification.as_ref().concrete_type_id();
        inner
            .by_type
            .entry(type_id)
            .or_default()
            .push(recorded.clone());
        drop(inner);

        trace!(
            sequence = recorded.sequence,
            notification_type = recorded.type_name(),
            "notification recorded"
        );
        metrics::counter!(NOTIFICATIONS_RECORDED_TOTAL).increment(1);
        recorded
    }

    /// 기록된 전체 알림 수
    pub fn len(&self) -> usize {
        self.read(|inner| inner.by_type.values().map(Vec::len).sum())
    }

    /// 기록이 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 다음 기록에 부여될 시퀀스 번호
    pub fn next_sequence(&self) -> u64 {
        self.read(|inner| inner.next_sequence)
    }

    /// `N` 타입 알림의 기록 수
    pub fn count_of<N: Notification>(&self) -> usize {
        self.read(|inner| {
            inner
                .by_type
                .get(&TypeId::of::<N>())
                .map_or(0, Vec::len)
        })
    }

    /// predicate를 만족하는 첫 번째 `N` 타입 알림을 찾습니다.
    pub fn query_first<N, F>(&self, predicate: F) -> Option<RecordedNotification>
    where
        N: Notification,
        F: Fn(&N) -> bool + Send + Sync,
    {
        self.first_match(&TypedMatcher::new(predicate))
    }

    /// predicate를 만족하는 모든 `N` 타입 알림을 도착 순서대로 반환합니다.
    pub fn query_all<N, F>(&self, predicate: F) -> Vec<RecordedNotification>
    where
        N: Notification,
        F: Fn(&N) -> bool + Send + Sync,
    {
        let matcher = TypedMatcher::new(predicate);
        self.read(|inner| {
            inner
                .by_type
                .get(&TypeId::of::<N>())
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|r| matcher.matches(r.notification.as_ref()))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    /// predicate를 만족하는 `N` 타입 알림이 한 번도 관찰되지 않았는지 확인합니다.
    pub fn never_matched<N, F>(&self, predicate: F) -> bool
    where
        N: Notification,
        F: Fn(&N) -> bool + Send + Sync,
    {
        self.query_first(predicate).is_none()
    }

    /// 매처와 일치하는 첫 번째 기록을 찾습니다.
    pub fn first_match(&self, matcher: &dyn NotificationMatcher) -> Option<RecordedNotification> {
        self.first_match_since(matcher, 0)
    }

    /// 시퀀스 `since` 이상인 기록 중 매처와 일치하는 첫 번째 기록을 찾습니다.
    pub fn first_match_since(
        &self,
        matcher: &dyn NotificationMatcher,
        since: u64,
    ) -> Option<RecordedNotification> {
        self.read(|inner| {
            let entries = inner.by_type.get(&matcher.notification_type())?;
            let start = entries.partition_point(|r| r.sequence < since);
            entries[start..]
                .iter()
                .find(|r| matcher.matches(r.notification.as_ref()))
                .cloned()
        })
    }

    /// 시퀀스 `since` 이후로 매처와 일치하는 기록이 없는지 확인합니다.
    pub fn never_matched_since(&self, matcher: &dyn NotificationMatcher, since: u64) -> bool {
        self.first_match_since(matcher, since).is_none()
    }

    fn read<R>(&self, f: impl FnOnce(&CacheInner) -> R) -> R {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&inner)
    }
}

impl fmt::Debug for NotificationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCache")
            .field("recorded", &self.len())
            .finish()
    }
}
