use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let admission_depth = state.admission.max_capacity() - state.admission.capacity();
    let stored = state.store.len();
    let ok = stored.is_ok() && !state.admission.is_closed();

    let status = if ok {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "ready": ok,
            "admission_depth": admission_depth,
            "retry_backlog": state.retries.backlog(),
            "stored": stored.unwrap_or(0),
        })),
    )
        .into_response()
}

pub async fn liveness() -> impl IntoResponse {
    (axum::http::StatusCode::OK, Json(serde_json::json!({"alive": true}))).into_response()
}
