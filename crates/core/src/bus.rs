//! 알림 버스 — 시뮬레이션에서 구독자로의 동기 팬아웃
//!
//! 시뮬레이션은 이벤트 처리 도중 [`NotificationBus::publish`]를 호출하고,
//! 버스는 등록 순서대로 모든 [`NotificationSubscriber`]에게 알림을 즉시 전달합니다.
//! 버스는 알림 순서를 바꾸지 않습니다.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::trace;

use crate::metrics::NOTIFICATIONS_PUBLISHED_TOTAL;
use crate::notification::Notification;

/// 알림 구독자 trait
///
/// 발행 호출과 같은 스택에서 동기적으로 호출됩니다.
/// 구현체는 블로킹하거나 시뮬레이션을 다시 진행시키면 안 됩니다.
pub trait NotificationSubscriber: Send + Sync {
    /// 알림 한 건을 수신합니다.
    ///
    /// * `at` - 알림이 발행된 시뮬레이션 시각
    fn on_notification(&self, at: Duration, notification: Arc<dyn Notification>);
}

/// 알림 버스
///
/// 복제해도 같은 구독자 목록을 공유합니다.
#[derive(Clone, Default)]
pub struct NotificationBus {
    subscribers: Arc<RwLock<Vec<Arc<dyn NotificationSubscriber>>>>,
}

impl NotificationBus {
    /// 구독자가 없는 버스를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 구독자를 등록합니다. 등록 순서대로 알림을 받습니다.
    pub fn subscribe(&self, subscriber: Arc<dyn NotificationSubscriber>) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscriber);
    }

    /// 등록된 구독자 수를 반환합니다.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 알림을 발행합니다.
    pub fn publish<N: Notification>(&self, at: Duration, notification: N) {
        self.publish_arc(at, Arc::new(notification));
    }

    /// 이미 `Arc`로 감싼 알림을 발행합니다.
    ///
    /// 구독자 목록의 스냅샷을 잡은 뒤 잠금 없이 전달하므로,
    /// 구독자가 전달 도중 새 구독자를 등록해도 교착되지 않습니다.
    pub fn publish_arc(&self, at: Duration, notification: Arc<dyn Notification>) {
        let subscribers: Vec<Arc<dyn NotificationSubscriber>> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        trace!(
            notification_type = notification.notification_type(),
            subscribers = subscribers.len(),
            "publishing notification"
        );
        metrics::counter!(NOTIFICATIONS_PUBLISHED_TOTAL).increment(1);

        for subscriber in &subscribers {
            subscriber.on_notification(at, Arc::clone(&notification));
        }
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Ping(u32);

    impl Notification for Ping {}

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(Duration, u32)>>,
    }

    impl NotificationSubscriber for Recorder {
        fn on_notification(&self, at: Duration, notification: Arc<dyn Notification>) {
            if let Some(ping) = notification.downcast_ref::<Ping>() {
                self.seen.lock().unwrap().push((at, ping.0));
            }
        }
    }

    #[test]
    fn new_bus_has_no_subscribers() {
        let bus = NotificationBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        // 구독자가 없어도 발행은 성공해야 함
        bus.publish(Duration::ZERO, Ping(1));
    }

    #[test]
    fn publish_delivers_in_emission_order() {
        let bus = NotificationBus::new();
        let recorder = Arc::new(Recorder::default());
        bus.subscribe(recorder.clone());

        bus.publish(Duration::from_secs(1), Ping(1));
        bus.publish(Duration::from_secs(1), Ping(2));
        bus.publish(Duration::from_secs(3), Ping(3));

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (Duration::from_secs(1), 1),
                (Duration::from_secs(1), 2),
                (Duration::from_secs(3), 3),
            ]
        );
    }

    #[test]
    fn every_subscriber_receives_each_notification() {
        let bus = NotificationBus::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        bus.subscribe(first.clone());
        bus.subscribe(second.clone());

        bus.publish(Duration::ZERO, Ping(7));

        assert_eq!(first.seen.lock().unwrap().len(), 1);
        assert_eq!(second.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn cloned_bus_shares_subscribers() {
        let bus = NotificationBus::new();
        let clone = bus.clone();
        clone.subscribe(Arc::new(Recorder::default()));
        assert_eq!(bus.subscriber_count(), 1);
    }
}
