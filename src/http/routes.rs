use crate::balancer::Balancer;
use crate::http::handlers::{ops, payments, summary};
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn backend_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(payments::ingress))
        .route("/payments-summary", get(summary::get_summary))
        .route("/health", get(payments::health))
        .route("/ops/liveness", get(ops::liveness))
        .route("/ops/readiness", get(ops::readiness))
        .with_state(state)
}

pub fn balancer_router(balancer: Balancer) -> Router {
    Router::new()
        .route("/payments", post(payments::submit_payment))
        .route("/payments-summary", get(payments::proxy_summary))
        .route("/health", get(payments::health))
        .with_state(balancer)
}
