pub mod balancer;
pub mod config;
pub mod domain {
    pub mod payment;
    pub mod summary;
}
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod ops;
        pub mod payments;
        pub mod summary;
    }
    pub mod routes;
}
pub mod repo {
    pub mod payment_store;
}
pub mod router {
    pub mod round_robin;
}
pub mod service {
    pub mod delivery;
    pub mod payment_service;
    pub mod quiescence;
    pub mod retry_orchestrator;
    pub mod summary_service;
}

use crate::config::AppConfig;
use crate::repo::payment_store::PaymentStore;
use crate::service::delivery::ProcessorPair;
use crate::service::payment_service::{admission_queue, spawn_workers, PaymentService, RawSubmission};
use crate::service::quiescence::QuiescenceGate;
use crate::service::retry_orchestrator::{retry_queue, RetryBackoff, RetryQueue};
use crate::service::summary_service::{PeerClient, SummaryService};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct AppState {
    pub admission: mpsc::Sender<RawSubmission>,
    pub retries: RetryQueue,
    pub store: Arc<dyn PaymentStore>,
    pub summary_service: SummaryService,
}

/// Wires queues, workers and the summary service of one backend instance.
pub fn start_instance(
    cfg: &AppConfig,
    processors: ProcessorPair,
    store: Arc<dyn PaymentStore>,
    client: reqwest::Client,
) -> (AppState, Vec<JoinHandle<()>>) {
    let gate = QuiescenceGate::new();
    let (admission_tx, admission_rx) = admission_queue(cfg.admission_capacity);
    let (retries, retry_rx) = retry_queue(RetryBackoff {
        base_ms: cfg.retry_backoff_base_ms,
        max_ms: cfg.retry_backoff_max_ms,
    });

    let payment_service = PaymentService {
        store: store.clone(),
        processors,
        gate: gate.clone(),
        retries: retries.clone(),
    };
    let workers = spawn_workers(payment_service, admission_rx, retry_rx, cfg.primary_workers);

    let summary_service = SummaryService {
        store: store.clone(),
        gate,
        peers: cfg
            .peer_instances
            .iter()
            .map(|peer| PeerClient::new(peer.clone(), cfg.peer_timeout_ms, client.clone()))
            .collect(),
    };

    let state = AppState {
        admission: admission_tx,
        retries,
        store,
        summary_service,
    };
    (state, workers)
}
