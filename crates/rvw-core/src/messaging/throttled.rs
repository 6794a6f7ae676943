use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{port::MessagingPort, types::DeliveryOptions},
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* Telegram API calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between calls per chat (Telegram 1 msg/sec style limits).
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve_at(&mut self, now: Instant) -> Duration {
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// MessagingPort decorator that spaces outbound deliveries.
///
/// Slots are reserved under the lock and slept outside it, so concurrent
/// broadcast sends queue up behind each other without serialising the
/// network calls themselves. Best-effort: it reduces 429s, it does not
/// rule them out.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<i64, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_chat(&self, chat_id: i64) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_chat.lock().await;
        map.entry(chat_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, chat_id: i64) {
        let now = Instant::now();
        let global_wait = { self.global.lock().await.reserve_at(now) };
        let chat_wait = {
            let lim = self.limiter_for_chat(chat_id).await;
            let mut guard = lim.lock().await;
            guard.reserve_at(now)
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    async fn deliver(
        &self,
        chat_id: ChatId,
        text: &str,
        options: &DeliveryOptions,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id.0).await;
        self.inner.deliver(chat_id, text, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_spaces_consecutive_reservations() {
        let start = Instant::now();
        let mut lim = IntervalLimiter {
            interval: Duration::from_millis(100),
            next: start,
        };

        assert_eq!(lim.reserve_at(start), Duration::ZERO);
        assert_eq!(lim.reserve_at(start), Duration::from_millis(100));
        assert_eq!(lim.reserve_at(start), Duration::from_millis(200));
    }

    #[test]
    fn limiter_does_not_bank_idle_time() {
        let start = Instant::now();
        let mut lim = IntervalLimiter {
            interval: Duration::from_millis(100),
            next: start,
        };

        assert_eq!(lim.reserve_at(start), Duration::ZERO);
        let later = start + Duration::from_secs(5);
        assert_eq!(lim.reserve_at(later), Duration::ZERO);
        assert_eq!(lim.reserve_at(later), Duration::from_millis(100));
    }
}
