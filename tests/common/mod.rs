#![allow(dead_code)]

use axum::Router;
use payments_intake::config::AppConfig;
use payments_intake::domain::payment::{Payment, ProcessorKind};
use payments_intake::domain::summary::{PaymentsSummary, TimeRange};
use payments_intake::gateways::mock::{MockBehavior, MockProcessor};
use payments_intake::repo::payment_store::{InMemoryPaymentStore, PaymentStore, StoreError};
use payments_intake::service::delivery::ProcessorPair;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn test_config(peers: Vec<String>) -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        principal_url: "http://principal".to_string(),
        fallback_url: "http://fallback".to_string(),
        peer_instances: peers,
        admission_capacity: 1_000,
        primary_workers: 1,
        processor_timeout_ms: 1_000,
        peer_timeout_ms: 1_000,
        retry_backoff_base_ms: 0,
        retry_backoff_max_ms: 0,
    }
}

pub fn mocks(principal: MockBehavior, fallback: MockBehavior) -> (ProcessorPair, Arc<MockProcessor>, Arc<MockProcessor>) {
    let p = Arc::new(MockProcessor::new(ProcessorKind::Principal, principal));
    let f = Arc::new(MockProcessor::new(ProcessorKind::Fallback, fallback));
    (ProcessorPair::new(p.clone(), f.clone()), p, f)
}

pub fn submission(id: &str, amount: &str) -> Vec<u8> {
    format!(r#"{{"correlationId":"{}","amount":{}}}"#, id, amount).into_bytes()
}

/// Binds `app` on an ephemeral local port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub async fn wait_for<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Store whose first `failures` writes report a transient outage.
pub struct FlakyStore {
    pub inner: InMemoryPaymentStore,
    failures: usize,
    writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: InMemoryPaymentStore::new(),
            failures,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PaymentStore for FlakyStore {
    fn save(&self, payment: &Payment) -> Result<(), StoreError> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        self.inner.save(payment)
    }

    fn summarize(&self, range: &TimeRange) -> Result<PaymentsSummary, StoreError> {
        self.inner.summarize(range)
    }

    fn len(&self) -> Result<usize, StoreError> {
        self.inner.len()
    }
}
