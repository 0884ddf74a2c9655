use crate::domain::payment::Payment;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, Default)]
pub struct RetryBackoff {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl RetryBackoff {
    pub fn none() -> Self {
        Self::default()
    }

    /// `min(base * 2^(attempts-1), max)`; zero when the base is zero.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        if self.base_ms == 0 {
            return Duration::ZERO;
        }
        let exp = attempts.saturating_sub(1).min(16);
        let ms = self.base_ms.saturating_mul(1_u64 << exp).min(self.max_ms.max(self.base_ms));
        Duration::from_millis(ms)
    }
}

/// Producer side of the retry queue. The queue is unbounded so a retry worker
/// can always requeue into its own input without deadlocking.
#[derive(Clone)]
pub struct RetryQueue {
    tx: mpsc::UnboundedSender<Payment>,
    backoff: RetryBackoff,
    backlog: Arc<AtomicUsize>,
}

pub struct RetryReceiver {
    rx: mpsc::UnboundedReceiver<Payment>,
    backlog: Arc<AtomicUsize>,
}

pub fn retry_queue(backoff: RetryBackoff) -> (RetryQueue, RetryReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let backlog = Arc::new(AtomicUsize::new(0));
    (
        RetryQueue {
            tx,
            backoff,
            backlog: backlog.clone(),
        },
        RetryReceiver { rx, backlog },
    )
}

impl RetryQueue {
    pub fn push(&self, payment: Payment) {
        self.backlog.fetch_add(1, Ordering::Relaxed);
        let delay = self.backoff.delay_for(payment.attempts);
        if delay.is_zero() {
            self.enqueue(payment);
            return;
        }

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.enqueue(payment);
        });
    }

    fn enqueue(&self, payment: Payment) {
        if let Err(e) = self.tx.send(payment) {
            self.backlog.fetch_sub(1, Ordering::Relaxed);
            tracing::error!(correlation_id = %e.0.correlation_id, "retry queue closed, payment lost");
        }
    }

    /// Payments waiting for retry, including ones still sleeping off a backoff.
    pub fn backlog(&self) -> usize {
        self.backlog.load(Ordering::Relaxed)
    }
}

impl RetryReceiver {
    pub async fn recv(&mut self) -> Option<Payment> {
        let payment = self.rx.recv().await?;
        self.backlog.fetch_sub(1, Ordering::Relaxed);
        Some(payment)
    }
}
