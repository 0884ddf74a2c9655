use crate::domain::payment::{Payment, ProcessorKind, ProcessorRequest, Stage};
use crate::gateways::{PaymentProcessor, ProcessorResponse};
use std::sync::Arc;

/// Attempts at or below this count go to the principal only.
pub const PRINCIPAL_ONLY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Principal failed on a principal-only attempt.
    #[error("principal failed: {reason}")]
    Principal { reason: String },
    /// Both processors failed on an escalated attempt.
    #[error("principal failed: {principal}; fallback failed: {fallback}")]
    Exhausted { principal: String, fallback: String },
    /// The payment was already delivered; only the store write is pending.
    #[error("payment already delivered")]
    AlreadyDelivered,
}

#[derive(Clone)]
pub struct ProcessorPair {
    pub principal: Arc<dyn PaymentProcessor>,
    pub fallback: Arc<dyn PaymentProcessor>,
}

impl ProcessorPair {
    pub fn new(principal: Arc<dyn PaymentProcessor>, fallback: Arc<dyn PaymentProcessor>) -> Self {
        Self { principal, fallback }
    }

    /// Runs one delivery attempt with graduated escalation: the first
    /// `PRINCIPAL_ONLY_ATTEMPTS` attempts try the principal only, every later
    /// attempt tries the principal and then the fallback.
    pub async fn deliver(&self, payment: &mut Payment) -> Result<ProcessorKind, DeliveryError> {
        if payment.stage == Stage::PendingSave {
            return Err(DeliveryError::AlreadyDelivered);
        }

        payment.attempts += 1;
        let request = payment.to_processor_request();

        let principal = match send(self.principal.as_ref(), &request).await {
            Ok(()) => {
                payment.processed_by = Some(ProcessorKind::Principal);
                return Ok(ProcessorKind::Principal);
            }
            Err(reason) => reason,
        };

        if payment.attempts <= PRINCIPAL_ONLY_ATTEMPTS {
            return Err(DeliveryError::Principal { reason: principal });
        }

        match send(self.fallback.as_ref(), &request).await {
            Ok(()) => {
                payment.processed_by = Some(ProcessorKind::Fallback);
                Ok(ProcessorKind::Fallback)
            }
            Err(fallback) => Err(DeliveryError::Exhausted { principal, fallback }),
        }
    }
}

async fn send(processor: &dyn PaymentProcessor, request: &ProcessorRequest) -> Result<(), String> {
    let outcome = match processor.submit(request).await {
        Ok(response) if response.is_handled() => Ok(()),
        Ok(ProcessorResponse::Failed { reason }) => Err(reason),
        Ok(response) => Err(format!("unexpected response {:?}", response)),
        Err(e) => Err(e.to_string()),
    };
    if let Err(reason) = &outcome {
        tracing::debug!(
            processor = processor.kind().as_str(),
            correlation_id = %request.correlation_id,
            %reason,
            "processor call failed"
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateways::mock::{MockBehavior, MockProcessor};
    use rust_decimal_macros::dec;

    fn pair(principal: MockBehavior, fallback: MockBehavior) -> (ProcessorPair, Arc<MockProcessor>, Arc<MockProcessor>) {
        let p = Arc::new(MockProcessor::new(ProcessorKind::Principal, principal));
        let f = Arc::new(MockProcessor::new(ProcessorKind::Fallback, fallback));
        (ProcessorPair::new(p.clone(), f.clone()), p, f)
    }

    #[tokio::test]
    async fn unprocessable_counts_as_handled() {
        let (pair, _, f) = pair(MockBehavior::AlwaysUnprocessable, MockBehavior::AlwaysAccept);
        let mut payment = Payment::new("x", dec!(1));
        assert_eq!(pair.deliver(&mut payment).await, Ok(ProcessorKind::Principal));
        assert_eq!(payment.processed_by, Some(ProcessorKind::Principal));
        assert_eq!(f.calls(), 0);
    }

    #[tokio::test]
    async fn pending_save_is_never_delivered() {
        let (pair, p, f) = pair(MockBehavior::AlwaysAccept, MockBehavior::AlwaysAccept);
        let mut payment = Payment::new("x", dec!(1));
        payment.stage = Stage::PendingSave;
        assert_eq!(pair.deliver(&mut payment).await, Err(DeliveryError::AlreadyDelivered));
        assert_eq!(payment.attempts, 0);
        assert_eq!(p.calls() + f.calls(), 0);
    }

    #[tokio::test]
    async fn escalated_attempt_reports_both_failures() {
        let (pair, _, _) = pair(MockBehavior::AlwaysFail, MockBehavior::AlwaysFail);
        let mut payment = Payment::new("x", dec!(1));
        payment.attempts = PRINCIPAL_ONLY_ATTEMPTS;
        let err = pair.deliver(&mut payment).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Exhausted { .. }));
        assert!(payment.processed_by.is_none());
    }
}
