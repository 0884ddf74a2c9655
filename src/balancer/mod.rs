use crate::router::round_robin::RoundRobinRouter;
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::http::StatusCode;
use std::sync::Arc;

pub mod channel;

/// One-way duplex link to a backend's ingress. Implementations must serialize
/// concurrent writers.
#[async_trait::async_trait]
pub trait PaymentChannel: Send + Sync {
    async fn send(&self, body: Bytes) -> Result<()>;
}

#[derive(Clone)]
pub struct BackendLink {
    pub name: String,
    pub http_base: String,
    pub channel: Arc<dyn PaymentChannel>,
}

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("no backend configured")]
    NoBackend,
    #[error("failed to send payment to {backend}: {reason}")]
    Write { backend: String, reason: String },
    #[error("failed to query {backend}: {reason}")]
    Upstream { backend: String, reason: String },
}

pub struct UpstreamReply {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Write and read traffic rotate on separate counters so a burst of summary
/// reads never shifts which backend takes the next payment.
#[derive(Clone)]
pub struct Balancer {
    pub backends: Arc<Vec<BackendLink>>,
    writes: Arc<RoundRobinRouter>,
    reads: Arc<RoundRobinRouter>,
    client: reqwest::Client,
    upstream_timeout_ms: u64,
}

impl Balancer {
    pub fn new(backends: Vec<BackendLink>, client: reqwest::Client, upstream_timeout_ms: u64) -> Self {
        Self {
            backends: Arc::new(backends),
            writes: Arc::new(RoundRobinRouter::new()),
            reads: Arc::new(RoundRobinRouter::new()),
            client,
            upstream_timeout_ms,
        }
    }

    /// Relays `body` unchanged to the next backend in write rotation. Returns
    /// once the message is on the wire; no retry and no failover.
    pub async fn submit_payment(&self, body: Bytes) -> Result<usize, RoutingError> {
        let (idx, backend) = self.writes.select(self.backends.as_slice()).ok_or(RoutingError::NoBackend)?;
        backend.channel.send(body).await.map_err(|e| RoutingError::Write {
            backend: backend.name.clone(),
            reason: e.to_string(),
        })?;
        Ok(idx)
    }

    /// Proxies a summary query to the next backend in read rotation, passing
    /// the raw query string through.
    pub async fn query_status(&self, raw_query: Option<&str>) -> Result<UpstreamReply, RoutingError> {
        let (_, backend) = self.reads.select(self.backends.as_slice()).ok_or(RoutingError::NoBackend)?;

        let mut url = format!("{}/payments-summary", backend.http_base);
        if let Some(q) = raw_query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(q);
        }
        tracing::debug!(%url, "proxying summary request");

        let upstream = |e: reqwest::Error| RoutingError::Upstream {
            backend: backend.name.clone(),
            reason: e.to_string(),
        };
        let resp = self
            .client
            .get(url)
            .timeout(std::time::Duration::from_millis(self.upstream_timeout_ms))
            .send()
            .await
            .map_err(upstream)?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await.map_err(upstream)?;

        Ok(UpstreamReply {
            status,
            content_type,
            body,
        })
    }
}

/// Opens one long-lived duplex connection per backend. A backend that cannot
/// be reached at startup is fatal.
pub async fn connect_backends(hosts: &[String]) -> Result<Vec<BackendLink>> {
    let mut links = Vec::with_capacity(hosts.len());
    for host in hosts {
        let host = host
            .trim_start_matches("http://")
            .trim_start_matches("ws://")
            .trim_end_matches('/');
        let ws_url = format!("ws://{}/ws", host);
        let channel = channel::WsPaymentChannel::connect(&ws_url)
            .await
            .with_context(|| format!("failed to connect to {}", ws_url))?;
        links.push(BackendLink {
            name: host.to_string(),
            http_base: format!("http://{}", host),
            channel: Arc::new(channel),
        });
    }
    Ok(links)
}
