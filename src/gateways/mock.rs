use crate::domain::payment::{ProcessorKind, ProcessorRequest};
use crate::gateways::{PaymentProcessor, ProcessorResponse};
use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    AlwaysAccept,
    AlwaysUnprocessable,
    AlwaysFail,
    /// Fails the first `n` calls, then accepts.
    FailTimes(usize),
}

/// In-process processor with scripted behavior. Records every request it sees.
pub struct MockProcessor {
    pub kind: ProcessorKind,
    pub behavior: MockBehavior,
    calls: AtomicUsize,
    seen: Mutex<Vec<ProcessorRequest>>,
}

impl MockProcessor {
    pub fn new(kind: ProcessorKind, behavior: MockBehavior) -> Self {
        Self {
            kind,
            behavior,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, correlation_id: &str) -> usize {
        self.seen
            .lock()
            .map(|seen| seen.iter().filter(|r| r.correlation_id == correlation_id).count())
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl PaymentProcessor for MockProcessor {
    fn kind(&self) -> ProcessorKind {
        self.kind
    }

    async fn submit(&self, request: &ProcessorRequest) -> Result<ProcessorResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.clone());
        }

        let response = match self.behavior {
            MockBehavior::AlwaysAccept => ProcessorResponse::Accepted,
            MockBehavior::AlwaysUnprocessable => ProcessorResponse::Unprocessable,
            MockBehavior::AlwaysFail => ProcessorResponse::Failed {
                reason: "MOCK_UNAVAILABLE".to_string(),
            },
            MockBehavior::FailTimes(n) if call < n => ProcessorResponse::Failed {
                reason: "MOCK_UNAVAILABLE".to_string(),
            },
            MockBehavior::FailTimes(_) => ProcessorResponse::Accepted,
        };

        Ok(response)
    }
}
