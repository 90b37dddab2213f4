//! Subscriber broadcast (spec §4.7): polls WS-Manager's `item-updates` every
//! second and fans coalesced changed-item sets out to every connected
//! websocket subscriber. Delivery is best-effort, at-most-once — a failed
//! send drops that subscriber rather than retrying.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{info, warn};

use crate::ws_manager_client::WsManagerClient;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Broadcaster {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<String>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self { subscribers: Mutex::new(Vec::new()) }
    }

    /// Register a new subscriber; returns the receiving half the caller's
    /// websocket task forwards onto the socket.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().await.push(tx);
        rx
    }

    /// Send `message` to every subscriber, dropping any whose channel is
    /// closed (spec §4.7 "Failed sends cause subscriber removal").
    async fn broadcast(&self, message: String) {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|tx| tx.send(message.clone()).is_ok());
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Background loop: poll WS-Manager, broadcast non-empty drains (spec §4.7).
pub async fn run(
    broadcaster: Arc<Broadcaster>,
    ws_manager: Arc<WsManagerClient>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = shutdown.changed() => {
                info!("broadcaster: shutdown requested");
                return;
            }
        }

        match ws_manager.get_item_updates().await {
            Ok(items) if !items.is_empty() => {
                let payload = match serde_json::to_string(&items) {
                    Ok(p) => p,
                    Err(err) => {
                        warn!(%err, "broadcaster: failed to serialize item updates");
                        continue;
                    }
                };
                info!(count = items.len(), "broadcaster: broadcasting item updates");
                broadcaster.broadcast(payload).await;
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "broadcaster: failed to poll item-updates"),
        }
    }
}

/// Drive one subscriber's websocket: forward broadcast messages out, ignore
/// inbound frames, and exit (dropping the subscriber) on any send failure
/// or disconnect.
pub async fn handle_socket(mut socket: WebSocket, mut rx: mpsc::UnboundedReceiver<String>) {
    loop {
        tokio::select! {
            message = rx.recv() => {
                match message {
                    Some(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            return;
                        }
                    }
                    None => return,
                }
            }
            frame = socket.recv() => {
                match frame {
                    Some(Ok(_)) => {}
                    _ => return,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_drops_closed_subscribers() {
        let broadcaster = Broadcaster::new();
        let rx1 = broadcaster.subscribe().await;
        let _rx2 = broadcaster.subscribe().await;
        drop(rx1);

        broadcaster.broadcast("hello".to_string()).await;
        assert_eq!(broadcaster.subscribers.lock().await.len(), 1);
    }
}
