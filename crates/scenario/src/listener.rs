//! 시나리오 알림 리스너 — 시뮬레이션 알림을 캐시와 스텝 매니저로 전달

use std::sync::Arc;
use std::time::Duration;

use stepwise_core::bus::NotificationSubscriber;
use stepwise_core::notification::Notification;

use crate::cache::NotificationCache;
use crate::manager::StepManager;

/// 시나리오 알림 리스너
///
/// 알림 버스에 구독자로 등록됩니다. 알림을 받으면 먼저 캐시에 기록한 뒤
/// 같은 기록을 매니저의 inbox에 넣습니다. 큐 진행은 러너가 담당합니다.
#[derive(Debug, Clone)]
pub struct ScenarioNotificationListener {
    cache: NotificationCache,
    manager: StepManager,
}

impl ScenarioNotificationListener {
    /// 캐시와 매니저를 연결하는 리스너를 생성합니다.
    pub fn new(cache: NotificationCache, manager: StepManager) -> Self {
        Self { cache, manager }
    }

    /// 연결된 캐시
    pub fn cache(&self) -> &NotificationCache {
        &self.cache
    }
}

impl NotificationSubscriber for ScenarioNotificationListener {
    fn on_notification(&self, at: Duration, notification: Arc<dyn Notification>) {
        let recorded = self.cache.record(at, notification);
        self.manager.offer(recorded);
    }
}
