use crate::domain::payment::{Payment, ProcessorKind, Stage};
use crate::repo::payment_store::PaymentStore;
use crate::service::delivery::ProcessorPair;
use crate::service::quiescence::QuiescenceGate;
use crate::service::retry_orchestrator::{RetryQueue, RetryReceiver};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Undecoded message as it arrived on the duplex channel.
pub type RawSubmission = Vec<u8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Saved(ProcessorKind),
    RequeuedForDelivery,
    RequeuedForSave,
    Dropped,
}

#[derive(Clone)]
pub struct PaymentService {
    pub store: Arc<dyn PaymentStore>,
    pub processors: ProcessorPair,
    pub gate: QuiescenceGate,
    pub retries: RetryQueue,
}

impl PaymentService {
    /// Primary path: one message from the admission queue.
    pub async fn process_raw(&self, raw: &[u8]) -> StepOutcome {
        self.gate.checkpoint().await;

        let payment = match Payment::decode(raw) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable submission");
                return StepOutcome::Dropped;
            }
        };
        self.process(payment).await
    }

    /// Retry path: a payment that previously failed delivery or save.
    pub async fn process_retry(&self, payment: Payment) -> StepOutcome {
        self.gate.checkpoint().await;
        self.process(payment).await
    }

    async fn process(&self, mut payment: Payment) -> StepOutcome {
        payment.stamp(chrono::Utc::now());

        if payment.stage != Stage::PendingSave {
            if let Err(e) = self.processors.deliver(&mut payment).await {
                tracing::debug!(
                    correlation_id = %payment.correlation_id,
                    attempts = payment.attempts,
                    error = %e,
                    "delivery failed, requeueing"
                );
                self.retries.push(payment);
                return StepOutcome::RequeuedForDelivery;
            }
        }

        let token = self.gate.enter_write().await;
        let saved = self.store.save(&payment);
        drop(token);

        match saved {
            Ok(()) => StepOutcome::Saved(payment.processed_by.unwrap_or(ProcessorKind::Principal)),
            Err(e) if e.is_retryable() => {
                tracing::warn!(correlation_id = %payment.correlation_id, error = %e, "save failed, requeueing");
                payment.stage = Stage::PendingSave;
                self.retries.push(payment);
                StepOutcome::RequeuedForSave
            }
            Err(e) => {
                tracing::error!(correlation_id = %payment.correlation_id, error = %e, "dropping unsaveable payment");
                StepOutcome::Dropped
            }
        }
    }
}

pub fn admission_queue(capacity: usize) -> (mpsc::Sender<RawSubmission>, mpsc::Receiver<RawSubmission>) {
    mpsc::channel(capacity.max(1))
}

/// Starts `primary_workers` consumers of the admission queue and one consumer
/// of the retry queue.
pub fn spawn_workers(
    service: PaymentService,
    admission: mpsc::Receiver<RawSubmission>,
    mut retries: RetryReceiver,
    primary_workers: usize,
) -> Vec<JoinHandle<()>> {
    let admission = Arc::new(Mutex::new(admission));
    let mut handles = Vec::new();

    for worker in 0..primary_workers.max(1) {
        let service = service.clone();
        let admission = admission.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let next = admission.lock().await.recv().await;
                let Some(raw) = next else {
                    tracing::info!(worker, "admission queue closed, primary worker exiting");
                    break;
                };
                service.process_raw(&raw).await;
            }
        }));
    }

    handles.push(tokio::spawn(async move {
        while let Some(payment) = retries.recv().await {
            service.process_retry(payment).await;
        }
        tracing::info!("retry queue closed, retry worker exiting");
    }));

    handles
}
