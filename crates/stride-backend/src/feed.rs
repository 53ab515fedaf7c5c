use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{info, warn};

use stride_sync::FeedTransport;
use stride_types::events::ChangeEvent;
use stride_types::SyncError;

/// WebSocket change-feed transport. Each `connect` opens a fresh socket and
/// pumps decoded events into a channel; the channel closes when the socket
/// drops, which is the dispatcher's signal to resubscribe.
pub struct WsFeed {
    url: String,
}

impl WsFeed {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl FeedTransport for WsFeed {
    async fn connect(&self) -> Result<mpsc::Receiver<ChangeEvent>, SyncError> {
        let (socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| SyncError::SubscriptionDropped(e.to_string()))?;
        info!("change feed connected to {}", self.url);

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            let (_write, mut read) = socket.split();
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => {
                        if let Some(event) = parse_frame(&text) {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("change feed transport error: {}", e);
                        break;
                    }
                }
            }
            // tx drops here; the closed receiver ends the dispatcher's
            // event loop and triggers resubscription.
        });

        Ok(rx)
    }
}

/// Decode one text frame. Unknown or malformed frames are logged and
/// skipped rather than killing the subscription.
pub fn parse_frame(text: &str) -> Option<ChangeEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            // char-boundary-safe excerpt of the offending frame
            warn!(
                "bad change event: {} -- raw: {}",
                e,
                text.get(..200).unwrap_or(text)
            );
            None
        }
    }
}
