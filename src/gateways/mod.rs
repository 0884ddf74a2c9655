use crate::domain::payment::{ProcessorKind, ProcessorRequest};
use anyhow::Result;

pub mod http;
pub mod mock;

/// Classified answer from a downstream processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorResponse {
    Accepted,
    /// The processor refused the payload as unprocessable. Resending would
    /// never succeed, so this counts as handled.
    Unprocessable,
    Failed { reason: String },
}

impl ProcessorResponse {
    pub fn is_handled(&self) -> bool {
        matches!(self, ProcessorResponse::Accepted | ProcessorResponse::Unprocessable)
    }
}

#[async_trait::async_trait]
pub trait PaymentProcessor: Send + Sync {
    fn kind(&self) -> ProcessorKind;

    async fn submit(&self, request: &ProcessorRequest) -> Result<ProcessorResponse>;
}
