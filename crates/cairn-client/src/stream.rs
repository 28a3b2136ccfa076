use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use cairn_types::events::{GatewayCommand, GatewayEvent};
use cairn_types::models::Message;

use crate::error::ClientError;
use crate::timeline::Identity;

/// How long to wait for `Ready` after sending `Identify`.
const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Live feed of new messages from the server's gateway.
///
/// Only messages published after `connect` returns are delivered. After a
/// reconnect, re-fetch the full list to cover the gap.
pub struct EventStream {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    identity: Identity,
}

impl EventStream {
    /// Connect to `url` (e.g. from [`crate::gateway::gateway_url`]) and
    /// authenticate with `token`. Returns once the server reports `Ready`.
    pub async fn connect(url: &str, token: &str) -> Result<Self, ClientError> {
        let (mut ws, _) = connect_async(url).await?;

        let identify = serde_json::to_string(&GatewayCommand::Identify {
            token: token.to_string(),
        })?;
        ws.send(WsMessage::Text(identify.into())).await?;

        let identity = tokio::time::timeout(READY_TIMEOUT, wait_for_ready(&mut ws))
            .await
            .map_err(|_| ClientError::Handshake)??;
        info!("Gateway ready as {} ({})", identity.username, identity.user_id);

        Ok(Self { ws, identity })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Next delivered message. `None` once the server closes the socket.
    pub async fn next_message(&mut self) -> Option<Result<Message, ClientError>> {
        loop {
            let frame = match self.ws.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e.into())),
            };

            match frame {
                WsMessage::Text(text) => match serde_json::from_str::<GatewayEvent>(&text) {
                    Ok(GatewayEvent::MessageCreate(message)) => return Some(Ok(message)),
                    Ok(GatewayEvent::Ready { .. }) => debug!("Ignoring repeated Ready"),
                    Err(e) => warn!("Unreadable gateway event: {}", e),
                },
                WsMessage::Close(_) => return None,
                // Pings are answered by tungstenite on the next read.
                _ => {}
            }
        }
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.ws.close(None).await?;
        Ok(())
    }
}

async fn wait_for_ready(
    ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
) -> Result<Identity, ClientError> {
    while let Some(frame) = ws.next().await {
        match frame? {
            WsMessage::Text(text) => {
                if let GatewayEvent::Ready { user_id, username } = serde_json::from_str::<GatewayEvent>(&text)? {
                    return Ok(Identity { user_id, username });
                }
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }
    Err(ClientError::Handshake)
}
