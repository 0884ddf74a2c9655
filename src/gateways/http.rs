use crate::domain::payment::{ProcessorKind, ProcessorRequest};
use crate::gateways::{PaymentProcessor, ProcessorResponse};
use anyhow::Result;
use reqwest::StatusCode;

pub struct HttpProcessor {
    pub kind: ProcessorKind,
    pub base_url: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl HttpProcessor {
    pub fn new(kind: ProcessorKind, base_url: impl Into<String>, timeout_ms: u64, client: reqwest::Client) -> Self {
        Self {
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_ms,
            client,
        }
    }
}

#[async_trait::async_trait]
impl PaymentProcessor for HttpProcessor {
    fn kind(&self) -> ProcessorKind {
        self.kind
    }

    async fn submit(&self, request: &ProcessorRequest) -> Result<ProcessorResponse> {
        let url = format!("{}/payments", self.base_url);
        let resp = self
            .client
            .post(url)
            .json(request)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await;

        let classified = match resp {
            Ok(r) if r.status().is_success() => ProcessorResponse::Accepted,
            Ok(r) if r.status() == StatusCode::UNPROCESSABLE_ENTITY => ProcessorResponse::Unprocessable,
            Ok(r) => ProcessorResponse::Failed {
                reason: format!("HTTP_{}", r.status().as_u16()),
            },
            Err(e) if e.is_timeout() => ProcessorResponse::Failed {
                reason: "TIMEOUT".to_string(),
            },
            Err(e) => ProcessorResponse::Failed {
                reason: format!("NETWORK_ERROR: {}", e),
            },
        };

        Ok(classified)
    }
}
