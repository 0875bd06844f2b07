use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::port::MessagingPort,
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between any two Bot API calls.
    pub global_min_interval: Duration,
    /// Minimum spacing between calls to the same chat.
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

    /// Reserve the next slot and return how long to wait before using it.
    fn reserve_at(&mut self, now: Instant) -> Duration {
        let start = self.next.max(now);
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// `MessagingPort` decorator that spaces out outbound calls.
///
/// A multi-chunk SMS broadcast to the group chat would otherwise trip
/// Telegram's per-chat flood limit.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<i64, IntervalLimiter>>,
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

    async fn throttle(&self, chat_id: ChatId) {
        let now = Instant::now();
        let global_wait = self.global.lock().await.reserve_at(now);
        let chat_wait = {
            let mut map = self.per_chat.lock().await;
            // A limiter whose slot is already due behaves like a fresh one.
            map.retain(|_, lim| lim.next > now);
            map.entry(chat_id.0)
                .or_insert_with(|| IntervalLimiter::new(self.cfg.per_chat_min_interval))
                .reserve_at(now)
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn max_message_len(&self) -> usize {
        self.inner.max_message_len()
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.throttle(chat_id).await;
        self.inner.send_html(chat_id, html).await
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.throttle(msg.chat_id).await;
        self.inner.delete_message(msg).await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        self.throttle(chat_id).await;
        self.inner
            .send_document(chat_id, file_name, bytes, caption)
            .await
    }
}
