use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{trace, warn};

use stride_cache::SnapshotStore;
use stride_types::events::ChangeEvent;
use stride_types::SyncError;

use crate::backend::Backend;
use crate::engine::SyncEngine;
use crate::notify::NotificationSink;

/// Change-feed transport seam. The dispatcher state machine and event
/// classification are tested against scripted implementations of this.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Establish the subscription. The receiver yields events in backend
    /// commit order and closes when the transport drops.
    async fn connect(&self) -> Result<mpsc::Receiver<ChangeEvent>, SyncError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Disconnected,
    Subscribing,
    Live,
}

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Route one change event. Message and conversation events invalidate the
/// directory and trigger a full rebuild; message inserts additionally fan
/// out to the notifier first, independently of directory state; reaction
/// events patch the in-memory board and never rebuild.
pub async fn dispatch_event<B, S, N>(engine: &Arc<SyncEngine<B, S, N>>, event: ChangeEvent)
where
    B: Backend + 'static,
    S: SnapshotStore + 'static,
    N: NotificationSink + 'static,
{
    match event {
        ChangeEvent::MessageInsert { message } => {
            engine.notifier().on_message_insert(&message).await;
            engine.spawn_refresh();
        }
        ChangeEvent::MessageUpdate { message } => {
            trace!("message {} updated", message.id);
            engine.spawn_refresh();
        }
        ChangeEvent::ConversationChange {
            conversation_id,
            op,
            ..
        } => {
            trace!("conversation {} {:?}", conversation_id, op);
            engine.spawn_refresh();
        }
        ChangeEvent::ReactionInsert { reaction } => {
            engine.apply_reaction_insert(reaction);
        }
        ChangeEvent::ReactionDelete {
            message_id,
            reaction_id,
        } => {
            engine.apply_reaction_delete(message_id, reaction_id);
        }
    }
}

/// Subscription loop: Disconnected → Subscribing → Live, back to
/// Disconnected on any drop, retried with capped exponential backoff until
/// Live is re-established. Runs until the task is dropped.
///
/// On every (re)subscribe a full refresh catches up on events missed while
/// disconnected; until then the last-known directory keeps being served.
pub async fn run<T, B, S, N>(transport: T, engine: Arc<SyncEngine<B, S, N>>)
where
    T: FeedTransport,
    B: Backend + 'static,
    S: SnapshotStore + 'static,
    N: NotificationSink + 'static,
{
    let mut backoff = INITIAL_BACKOFF;
    loop {
        engine.set_feed_state(FeedState::Subscribing);
        match transport.connect().await {
            Ok(mut events) => {
                backoff = INITIAL_BACKOFF;
                engine.set_feed_state(FeedState::Live);
                if let Err(e) = engine.refresh().await {
                    warn!("post-subscribe refresh failed: {}", e);
                }

                while let Some(event) = events.recv().await {
                    dispatch_event(&engine, event).await;
                }

                warn!("change feed dropped");
                engine.set_feed_state(FeedState::Disconnected);
            }
            Err(e) => {
                warn!("change feed subscription failed: {}", e);
                engine.set_feed_state(FeedState::Disconnected);
            }
        }

        sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}
