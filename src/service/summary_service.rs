use crate::domain::payment::format_timestamp;
use crate::domain::summary::{PaymentsSummary, TimeRange};
use crate::repo::payment_store::{PaymentStore, StoreError};
use crate::service::quiescence::QuiescenceGate;
use anyhow::{bail, Result};
use std::sync::Arc;

/// Query flag that marks a peer-to-peer call and suppresses further federation.
pub const INTERNAL_FLAG: &str = "internal";

#[derive(Clone)]
pub struct PeerClient {
    pub base_url: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl PeerClient {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_ms,
            client,
        }
    }

    pub async fn fetch_summary(&self, range: &TimeRange) -> Result<PaymentsSummary> {
        let mut query = vec![(INTERNAL_FLAG, "true".to_string())];
        if let Some(from) = &range.from {
            query.push(("from", format_timestamp(from)));
        }
        if let Some(to) = &range.to {
            query.push(("to", format_timestamp(to)));
        }

        let resp = self
            .client
            .get(format!("{}/payments-summary", self.base_url))
            .query(&query)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("peer {} answered {}", self.base_url, resp.status());
        }
        Ok(resp.json::<PaymentsSummary>().await?)
    }
}

#[derive(Clone)]
pub struct SummaryService {
    pub store: Arc<dyn PaymentStore>,
    pub gate: QuiescenceGate,
    pub peers: Vec<PeerClient>,
}

impl SummaryService {
    /// Local aggregate, plus every reachable peer's when `federate` is set.
    ///
    /// A federated call holds the quiescence pause for its whole duration,
    /// peer calls included. Unreachable peers are skipped.
    pub async fn get_summary(&self, range: &TimeRange, federate: bool) -> Result<PaymentsSummary, StoreError> {
        let _pause = if federate { Some(self.gate.pause().await) } else { None };

        let mut summary = self.store.summarize(range)?;

        if federate {
            for peer in &self.peers {
                match peer.fetch_summary(range).await {
                    Ok(remote) => summary.merge(&remote),
                    Err(e) => tracing::warn!(peer = %peer.base_url, error = %e, "skipping peer summary"),
                }
            }
        }

        tracing::debug!(federate, requests = summary.total_requests(), "summary computed");
        Ok(summary.rounded())
    }
}
