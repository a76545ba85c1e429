//! 发送限流 - 保证两条消息之间的最小间隔
//!
//! 包装任意 `NotificationSink`，避免触发 Telegram 的频率限制。
//! 业务代码只管发送，节奏由这里统一控制。

use super::channel::{NotificationMessage, NotificationSink};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

/// 固定间隔限流的出口
pub struct ThrottledSink<S> {
    inner: S,
    interval: Duration,
    /// 下一条消息最早可发送的时间
    next_slot: Mutex<Option<Instant>>,
}

impl<S: NotificationSink> ThrottledSink<S> {
    pub fn new(inner: S, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: NotificationSink> NotificationSink for ThrottledSink<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn send(&self, message: &NotificationMessage) -> Result<()> {
        // 持有锁直到发送完成，保证并发调用也按顺序排队
        let mut next_slot = self.next_slot.lock().await;
        if let Some(slot) = *next_slot {
            if slot > Instant::now() {
                trace!(wait_ms = (slot - Instant::now()).as_millis() as u64, "Throttling send");
                sleep_until(slot).await;
            }
        }

        let result = self.inner.send(message).await;
        // 失败也占用一个发送间隔
        *next_slot = Some(Instant::now() + self.interval);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        count: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl NotificationSink for CountingSink {
        fn name(&self) -> &str {
            "counting"
        }

        async fn send(&self, _message: &NotificationMessage) -> Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("sink down");
            }
            Ok(())
        }
    }

    fn sink(fail: bool) -> CountingSink {
        CountingSink {
            count: AtomicUsize::new(0),
            fail,
        }
    }

    #[tokio::test]
    async fn test_first_send_is_immediate() {
        let throttled = ThrottledSink::new(sink(false), Duration::from_secs(5));
        let start = Instant::now();

        throttled
            .send(&NotificationMessage::event(EventKind::Commit, "a"))
            .await
            .unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(throttled.inner().count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_consecutive_sends_are_spaced() {
        let throttled = ThrottledSink::new(sink(false), Duration::from_millis(60));
        let msg = NotificationMessage::event(EventKind::Commit, "a");
        let start = Instant::now();

        for _ in 0..3 {
            throttled.send(&msg).await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(120));
        assert_eq!(throttled.inner().count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_is_returned_and_still_paced() {
        let throttled = ThrottledSink::new(sink(true), Duration::from_millis(40));
        let msg = NotificationMessage::inactivity("x");
        let start = Instant::now();

        assert!(throttled.send(&msg).await.is_err());
        assert!(throttled.send(&msg).await.is_err());

        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(throttled.name(), "counting");
    }
}
