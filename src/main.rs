use payments_intake::config::AppConfig;
use payments_intake::domain::payment::ProcessorKind;
use payments_intake::gateways::http::HttpProcessor;
use payments_intake::http::routes::backend_router;
use payments_intake::repo::payment_store::InMemoryPaymentStore;
use payments_intake::service::delivery::ProcessorPair;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    cfg.validate()?;

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .build()?;

    let processors = ProcessorPair::new(
        Arc::new(HttpProcessor::new(
            ProcessorKind::Principal,
            cfg.principal_url.clone(),
            cfg.processor_timeout_ms,
            client.clone(),
        )),
        Arc::new(HttpProcessor::new(
            ProcessorKind::Fallback,
            cfg.fallback_url.clone(),
            cfg.processor_timeout_ms,
            client.clone(),
        )),
    );

    let (state, _workers) =
        payments_intake::start_instance(&cfg, processors, Arc::new(InMemoryPaymentStore::new()), client);
    tracing::info!(
        peers = ?cfg.peer_instances,
        workers = cfg.primary_workers,
        "payment pipeline started"
    );

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, backend_router(state)).await?;
    Ok(())
}
