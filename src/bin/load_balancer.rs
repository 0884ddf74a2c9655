use anyhow::Result;
use payments_intake::balancer::{connect_backends, Balancer};
use payments_intake::config::BalancerConfig;
use payments_intake::http::routes::balancer_router;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = BalancerConfig::from_env();
    cfg.validate()?;

    let backends = connect_backends(&cfg.backends).await?;
    let balancer = Balancer::new(backends, reqwest::Client::new(), cfg.upstream_timeout_ms);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(backends = ?cfg.backends, "listening on {}", cfg.bind_addr);
    axum::serve(listener, balancer_router(balancer)).await?;
    Ok(())
}
