use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cairn_types::api::Claims;
use cairn_types::events::{GatewayCommand, GatewayEvent};

use crate::bus::EventBus;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// A socket write that has not finished after this long means the client
/// stopped reading. The connection is dropped rather than left to stall.
const WRITE_TIMEOUT: Duration = HEARTBEAT_INTERVAL;

/// How long a fresh socket has to send `Identify`.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Serve one WebSocket client: authenticate it, attach it to the bus and
/// forward every new message until either side goes away or `shutdown`
/// fires.
pub async fn handle_connection(
    socket: WebSocket,
    bus: EventBus,
    jwt_secret: String,
    shutdown: CancellationToken,
) {
    let (mut sender, mut receiver) = socket.split();

    let Some((user_id, username)) = wait_for_identify(&mut receiver, &jwt_secret).await else {
        warn!("WebSocket client failed to identify, closing");
        return;
    };

    // Attach before Ready so the client cannot miss anything published
    // after it sees Ready.
    let cancel = shutdown.child_token();
    let subscription = bus.subscribe(cancel.clone());
    info!(
        "{} ({}) connected to gateway as subscription {}",
        username,
        user_id,
        subscription.id()
    );

    let ready = GatewayEvent::Ready {
        user_id,
        username: username.clone(),
    };
    if !send_event(&mut sender, &ready).await {
        return;
    }

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received;

    // Forward bus deliveries -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut subscription = subscription;
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                delivered = subscription.next() => {
                    let Some(message) = delivered else { break };
                    if !send_event(&mut sender, &GatewayEvent::MessageCreate(message)).await {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if !send_frame(&mut sender, WsMessage::Ping(Bytes::new())).await {
                        break;
                    }
                }
            }
        }

        let _ = tokio::time::timeout(WRITE_TIMEOUT, sender.close()).await;
    });

    // Read frames from client
    let username_recv = username.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = receiver.next().await {
            match frame {
                WsMessage::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(GatewayCommand::Identify { .. }) => {
                        debug!("{} ({}) sent a second Identify, ignoring", username_recv, user_id);
                    }
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            username_recv,
                            user_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                WsMessage::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                WsMessage::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => {
            // The session leaves the bus as soon as it sees the token; wait
            // for that instead of racing the log line below.
            cancel.cancel();
            send_task.abort();
            let _ = send_task.await;
        }
    }
    cancel.cancel();

    info!(
        "{} ({}) disconnected from gateway, {} subscriptions remain",
        username,
        user_id,
        bus.subscriber_count()
    );
}

/// Returns false once the socket is unusable.
async fn send_event(sender: &mut SplitSink<WebSocket, WsMessage>, event: &GatewayEvent) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            return true;
        }
    };
    send_frame(sender, WsMessage::Text(text.into())).await
}

async fn send_frame(sender: &mut SplitSink<WebSocket, WsMessage>, frame: WsMessage) -> bool {
    match tokio::time::timeout(WRITE_TIMEOUT, sender.send(frame)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!("WebSocket write failed: {}", e);
            false
        }
        Err(_) => {
            warn!("WebSocket write stalled for {:?}, dropping connection", WRITE_TIMEOUT);
            false
        }
    }
}

async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<(Uuid, String)> {
    let identify = async {
        while let Some(Ok(frame)) = receiver.next().await {
            if let WsMessage::Text(text) = frame {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    let claims = verify_token(&token, jwt_secret)?;
                    return Some((claims.sub, claims.username));
                }
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify)
        .await
        .ok()
        .flatten()
}

/// Decode and validate a bearer token issued by the auth endpoints.
pub fn verify_token(token: &str, jwt_secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}
