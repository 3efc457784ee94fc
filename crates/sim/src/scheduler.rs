//! 이벤트 스케줄러 — 논리 시계와 예약 이벤트 큐
//!
//! 이벤트는 (예약 시각, 예약 순번) 순서로 꺼내집니다.
//! 같은 시각의 이벤트는 예약한 순서대로 처리됩니다.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use stepwise_core::error::SimulationError;

struct Scheduled<E> {
    at: Duration,
    sequence: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.sequence == other.sequence
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.sequence).cmp(&(other.at, other.sequence))
    }
}

/// 이산 사건 스케줄러
pub struct EventScheduler<E> {
    now: Duration,
    next_sequence: u64,
    queue: BinaryHeap<Reverse<Scheduled<E>>>,
}

impl<E> EventScheduler<E> {
    /// 시각 0에서 시작하는 빈 스케줄러를 생성합니다.
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_sequence: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// 현재 시각
    pub fn now(&self) -> Duration {
        self.now
    }

    /// 예약된 이벤트 수
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// 예약된 이벤트가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// 절대 시각에 이벤트를 예약합니다.
    ///
    /// # Errors
    ///
    /// 현재 시각보다 이전이면 [`SimulationError::ScheduleInPast`]를 반환합니다.
    pub fn schedule_at(&mut self, at: Duration, event: E) -> Result<(), SimulationError> {
        if at < self.now {
            return Err(SimulationError::ScheduleInPast { at, now: self.now });
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push(Reverse(Scheduled {
            at,
            sequence,
            event,
        }));
        Ok(())
    }

    /// 현재 시각으로부터 `delay` 뒤에 이벤트를 예약합니다.
    pub fn schedule_after(&mut self, delay: Duration, event: E) {
        let at = self.now + delay;
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push(Reverse(Scheduled {
            at,
            sequence,
            event,
        }));
    }

    /// 다음 이벤트의 예약 시각
    pub fn peek_time(&self) -> Option<Duration> {
        self.queue.peek().map(|Reverse(s)| s.at)
    }

    /// 가장 이른 이벤트를 꺼내고 시계를 그 시각으로 옮깁니다.
    pub fn pop_next(&mut self) -> Option<(Duration, E)> {
        let Reverse(next) = self.queue.pop()?;
        self.now = next.at;
        Some((next.at, next.event))
    }

    /// 모든 예약을 취소하고 취소한 수를 반환합니다.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.queue.len();
        self.queue.clear();
        cancelled
    }

    /// 조건에 맞는 예약을 취소하고 취소한 수를 반환합니다.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&E) -> bool) -> usize {
        let before = self.queue.len();
        self.queue.retain(|Reverse(s)| !predicate(&s.event));
        before - self.queue.len()
    }
}

impl<E> Default for EventScheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventScheduler<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventScheduler")
            .field("now", &self.now)
            .field("scheduled", &self.queue.len())
            .finish()
    }
}
