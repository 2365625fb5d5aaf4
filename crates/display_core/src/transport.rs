use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use shared::{
    bus::{Subscription, SyncChannel},
    protocol::PidsMessage,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

/// How a display reaches the shared channel.
#[async_trait]
pub trait DisplayTransport: Send {
    async fn send(&mut self, message: PidsMessage) -> Result<()>;
    /// Next inbound message; `None` once the channel is gone.
    async fn recv(&mut self) -> Option<PidsMessage>;
}

/// Display living in the same process as the controller.
pub struct BusTransport {
    bus: Arc<dyn SyncChannel>,
    inbound: Subscription,
}

impl BusTransport {
    pub fn attach(bus: Arc<dyn SyncChannel>) -> Self {
        let inbound = bus.subscribe();
        Self { bus, inbound }
    }
}

#[async_trait]
impl DisplayTransport for BusTransport {
    async fn send(&mut self, message: PidsMessage) -> Result<()> {
        self.bus.publish(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<PidsMessage> {
        self.inbound.recv().await
    }
}

/// Display attached to a controller's `/ws` endpoint.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    pub async fn connect(controller_url: &str) -> Result<Self> {
        let url = Url::parse(controller_url)
            .with_context(|| format!("invalid controller url: {controller_url}"))?;
        // Controllers serve plain websockets; no TLS connector is built in.
        if url.scheme() != "ws" {
            return Err(anyhow!("controller url must start with ws://"));
        }
        let (stream, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("failed to connect websocket: {url}"))?;
        Ok(Self { stream })
    }
}

#[async_trait]
impl DisplayTransport for WsTransport {
    async fn send(&mut self, message: PidsMessage) -> Result<()> {
        let text = serde_json::to_string(&message)?;
        self.stream
            .send(Message::Text(text))
            .await
            .context("websocket send failed")
    }

    async fn recv(&mut self) -> Option<PidsMessage> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<PidsMessage>(&text) {
                    Ok(message) => return Some(message),
                    Err(error) => debug!(%error, "dropping malformed frame"),
                },
                Ok(Message::Close(_)) => return None,
                Ok(_) => {}
                Err(error) => {
                    debug!(%error, "websocket read failed");
                    return None;
                }
            }
        }
        None
    }
}
