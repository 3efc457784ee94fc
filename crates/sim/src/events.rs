//! 테스트 이벤트 — 시나리오가 직접 발행하는 이름 붙은 알림

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use stepwise_core::notification::Notification;

/// 이름과 메타데이터를 가진 테스트 이벤트 알림
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestEventNotification {
    pub name: String,
    pub metadata: BTreeMap<String, String>,
}

impl TestEventNotification {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// 메타데이터 항목을 추가합니다.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// `key` 항목이 `value`와 같은지 여부
    pub fn has_metadata(&self, key: &str, value: &str) -> bool {
        self.metadata.get(key).is_some_and(|v| v == value)
    }
}

impl fmt::Display for TestEventNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.metadata.is_empty() {
            let pairs: Vec<String> = self
                .metadata
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, " {{{}}}", pairs.join(", "))?;
        }
        Ok(())
    }
}

impl Notification for TestEventNotification {}
