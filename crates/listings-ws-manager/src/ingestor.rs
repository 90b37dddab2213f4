//! Stream ingestor (spec §4.1).
//!
//! Maintains a durable logical connection to the upstream marketplace
//! websocket. Never terminates on its own — every error, including a clean
//! close, loops back into `disconnected -> connecting -> connected ->
//! reading`. Backpressure is adaptive: after every frame the ingestor sleeps
//! `ceil(queue_len / 2000)` seconds, deliberately stalling reads instead of
//! dropping messages when the dispatcher falls behind.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use listings_core::types::RawEvent;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

use crate::queue::UpdateQueue;

const PING_INTERVAL: Duration = Duration::from_secs(60);
const CLOSE_BACKOFF: Duration = Duration::from_secs(1);
const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Connection parameters for the upstream feed (spec §6).
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    pub url: String,
    pub appid: u32,
}

/// Runs the ingestor loop until `shutdown` fires. Intended to be spawned as
/// its own long-running task.
pub async fn run(
    config: IngestorConfig,
    queue: Arc<UpdateQueue>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            info!("ingestor: shutdown requested");
            return;
        }

        info!(url = %config.url, "ingestor: connecting");
        let stream = match connect(&config).await {
            Ok(s) => s,
            Err(err) => {
                error!(%err, "ingestor: connect failed, backing off 60s");
                if wait_or_shutdown(ERROR_BACKOFF, &mut shutdown).await {
                    return;
                }
                continue;
            }
        };

        let (mut write, mut read) = stream.split();
        let mut ping_tick = tokio::time::interval(PING_INTERVAL);
        ping_tick.tick().await; // first tick fires immediately

        let mut clean_close = false;
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    let _ = write.close().await;
                    return;
                }
                _ = ping_tick.tick() => {
                    if write.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            handle_frame(&text, &queue).await;
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = write.send(Message::Pong(payload)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            warn!("ingestor: received close frame");
                            clean_close = true;
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            error!(%err, "ingestor: read error");
                            break;
                        }
                        None => {
                            warn!("ingestor: stream ended");
                            clean_close = true;
                            break;
                        }
                    }
                }
            }
        }

        let backoff = if clean_close { CLOSE_BACKOFF } else { ERROR_BACKOFF };
        warn!(?backoff, "ingestor: disconnected, reconnecting");
        if wait_or_shutdown(backoff, &mut shutdown).await {
            return;
        }
    }
}

async fn wait_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.changed() => true,
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(config: &IngestorConfig) -> anyhow::Result<WsStream> {
    let mut request = config.url.as_str().into_client_request()?;
    request.headers_mut().insert("appid", config.appid.to_string().parse()?);
    request.headers_mut().insert("batch-test", "true".parse()?);
    let (stream, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(stream)
}

/// Parse one frame and, if it is a JSON array, enqueue every element in
/// order, then sleep the adaptive backpressure delay (spec §4.1).
async fn handle_frame(text: &str, queue: &UpdateQueue) {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(err) => {
            warn!(%err, "ingestor: frame was not valid JSON, dropping");
            return;
        }
    };

    if let serde_json::Value::Array(elements) = value {
        let events: Vec<RawEvent> = elements
            .into_iter()
            .filter_map(|el| serde_json::from_value(el).ok())
            .collect();
        queue.push_all(events).await;
    }

    let queue_len = queue.len().await;
    let sleep_secs = adaptive_sleep_secs(queue_len);
    if sleep_secs > 0 {
        tokio::time::sleep(Duration::from_secs(sleep_secs)).await;
    }
}

/// `ceil(queue_len / 2000)` (spec §4.1, §8 invariant 8).
fn adaptive_sleep_secs(queue_len: usize) -> u64 {
    queue_len.div_ceil(2000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_sleep_rounds_up() {
        assert_eq!(adaptive_sleep_secs(0), 0);
        assert_eq!(adaptive_sleep_secs(1), 1);
        assert_eq!(adaptive_sleep_secs(2000), 1);
        assert_eq!(adaptive_sleep_secs(2001), 2);
        assert_eq!(adaptive_sleep_secs(6000), 3);
    }

    #[tokio::test]
    async fn handle_frame_enqueues_array_elements_in_order() {
        let queue = Arc::new(UpdateQueue::new());
        let frame = r#"[{"event":"listing-update","payload":{"item":{"sku":"a"}}},
                         {"event":"delete","payload":{"item":{"sku":"b"}}}]"#;
        handle_frame(frame, &queue).await;
        let batch = queue.pop_batch().await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].event, "listing-update");
        assert_eq!(batch[1].event, "delete");
    }

    #[tokio::test]
    async fn handle_frame_ignores_non_array_and_malformed_payloads() {
        let queue = Arc::new(UpdateQueue::new());
        handle_frame(r#"{"event":"heartbeat"}"#, &queue).await;
        handle_frame("not json", &queue).await;
        assert!(queue.is_empty().await);
    }
}
