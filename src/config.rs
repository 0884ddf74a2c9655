use anyhow::{bail, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub principal_url: String,
    pub fallback_url: String,
    pub peer_instances: Vec<String>,
    pub admission_capacity: usize,
    pub primary_workers: usize,
    pub processor_timeout_ms: u64,
    pub peer_timeout_ms: u64,
    pub retry_backoff_base_ms: u64,
    pub retry_backoff_max_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            principal_url: std::env::var("PRINCIPAL_SERVICE").unwrap_or_default(),
            fallback_url: std::env::var("FALLBACK_SERVICE").unwrap_or_default(),
            peer_instances: split_list(&std::env::var("API_INSTANCES").unwrap_or_default()),
            admission_capacity: env_parse("ADMISSION_QUEUE_CAPACITY", 100_000),
            primary_workers: env_parse("PRIMARY_WORKERS", 1_usize).max(1),
            processor_timeout_ms: env_parse("PROCESSOR_TIMEOUT_MS", 10_000),
            peer_timeout_ms: env_parse("PEER_TIMEOUT_MS", 10_000),
            retry_backoff_base_ms: env_parse("RETRY_BACKOFF_BASE_MS", 0),
            retry_backoff_max_ms: env_parse("RETRY_BACKOFF_MAX_MS", 1_000),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.principal_url.is_empty() || self.fallback_url.is_empty() {
            bail!("PRINCIPAL_SERVICE and FALLBACK_SERVICE must be set");
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct BalancerConfig {
    pub bind_addr: String,
    pub backends: Vec<String>,
    pub upstream_timeout_ms: u64,
}

impl BalancerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `BACKENDS` wins when set. Otherwise the pair `API1`, `API2` is used,
    /// and a missing entry is kept as an empty host so `validate` rejects it.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let listed = split_list(&lookup("BACKENDS").unwrap_or_default());
        let backends = if listed.is_empty() {
            ["API1", "API2"]
                .into_iter()
                .map(|key| lookup(key).unwrap_or_default().trim().to_string())
                .collect()
        } else {
            listed
        };

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:9999".to_string()),
            backends,
            upstream_timeout_ms: lookup("UPSTREAM_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(10_000),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.backends.is_empty() || self.backends.iter().any(String::is_empty) {
            bail!("BACKENDS, or both API1 and API2, must be set");
        }
        Ok(())
    }
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}
