use crate::balancer::Balancer;
use crate::service::payment_service::RawSubmission;
use crate::AppState;
use axum::body::{Body, Bytes};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use tokio::sync::mpsc;

/// Balancer: `POST /payments`. Succeeds as soon as the body is on the wire.
pub async fn submit_payment(State(balancer): State<Balancer>, body: Bytes) -> impl IntoResponse {
    match balancer.submit_payment(body).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "payment routing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Balancer: `GET /payments-summary`, proxied verbatim.
pub async fn proxy_summary(State(balancer): State<Balancer>, RawQuery(query): RawQuery) -> impl IntoResponse {
    match balancer.query_status(query.as_deref()).await {
        Ok(reply) => {
            let mut resp = (reply.status, Body::from(reply.body)).into_response();
            if let Some(value) = reply.content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
                resp.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            resp
        }
        Err(e) => {
            tracing::error!(error = %e, "summary proxy failed");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

/// Backend: `GET /ws`, the duplex ingress the balancer writes payments into.
pub async fn ingress(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| read_loop(socket, state.admission.clone()))
}

/// Pushes every inbound message onto the admission queue. A full queue stalls
/// this loop and with it further reads from the connection. A read error
/// closes the connection.
pub async fn read_loop(mut socket: WebSocket, admission: mpsc::Sender<RawSubmission>) {
    tracing::info!("ingress connection opened");
    while let Some(msg) = socket.recv().await {
        let raw = match msg {
            Ok(Message::Text(text)) => text.into_bytes(),
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "ingress read failed, closing connection");
                break;
            }
        };
        if admission.send(raw).await.is_err() {
            tracing::error!("admission queue closed");
            break;
        }
    }
    tracing::info!("ingress connection closed");
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
