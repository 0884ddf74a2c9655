use crate::balancer::PaymentChannel;
use anyhow::Result;
use axum::body::Bytes;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Websocket client half. Writes go through a mutex; the read half is drained
/// by a background task that only reports when the backend goes away. A lost
/// connection is not re-established.
pub struct WsPaymentChannel {
    pub url: String,
    sink: Mutex<WsSink>,
}

impl WsPaymentChannel {
    pub async fn connect(url: &str) -> Result<Self> {
        let (socket, response) = connect_async(url).await?;
        tracing::info!(%url, status = %response.status(), "backend connected");

        let (sink, mut stream) = socket.split();
        let watched = url.to_string();
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(url = %watched, error = %e, "backend connection error");
                        break;
                    }
                }
            }
            tracing::error!(url = %watched, "backend connection closed; restart required");
        });

        Ok(Self {
            url: url.to_string(),
            sink: Mutex::new(sink),
        })
    }
}

#[async_trait::async_trait]
impl PaymentChannel for WsPaymentChannel {
    async fn send(&self, body: Bytes) -> Result<()> {
        let message = match String::from_utf8(body.to_vec()) {
            Ok(text) => Message::Text(text),
            Err(e) => Message::Binary(e.into_bytes()),
        };
        self.sink.lock().await.send(message).await?;
        Ok(())
    }
}
