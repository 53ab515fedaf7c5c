use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use stride_cache::{OfflineCache, SnapshotStore};
use stride_types::models::{Directory, Reaction};
use stride_types::SyncError;

use crate::backend::Backend;
use crate::directory::DirectoryBuilder;
use crate::dispatcher::FeedState;
use crate::notify::{NotificationSink, Notifier};
use crate::reactions::{ReactionBoard, Toggle};

/// Client-side sync state: the published directory, the reaction board and
/// the mutation surface. One engine per signed-in user.
///
/// Consumers observe the directory through a watch channel; every completed
/// rebuild replaces the value wholesale (last-writer-wins, rebuilds are
/// idempotent projections of backend state).
pub struct SyncEngine<B, S, N> {
    user_id: Uuid,
    backend: Arc<B>,
    cache: Arc<OfflineCache<S>>,
    builder: DirectoryBuilder<B, S>,
    notifier: Notifier<B, N>,
    reactions: RwLock<ReactionBoard>,
    directory_tx: watch::Sender<Directory>,
    feed_state_tx: watch::Sender<FeedState>,
}

impl<B, S, N> SyncEngine<B, S, N>
where
    B: Backend + 'static,
    S: SnapshotStore + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(user_id: Uuid, backend: Arc<B>, store: S, sink: N) -> Arc<Self> {
        let cache = Arc::new(OfflineCache::new(store));
        let builder = DirectoryBuilder::new(Arc::clone(&backend), Arc::clone(&cache), user_id);
        let notifier = Notifier::new(Arc::clone(&backend), sink, user_id);
        let (directory_tx, _) = watch::channel(Directory::empty_stale());
        let (feed_state_tx, _) = watch::channel(FeedState::Disconnected);

        Arc::new(Self {
            user_id,
            backend,
            cache,
            builder,
            notifier,
            reactions: RwLock::new(ReactionBoard::new()),
            directory_tx,
            feed_state_tx,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn cache(&self) -> &OfflineCache<S> {
        &self.cache
    }

    pub(crate) fn notifier(&self) -> &Notifier<B, N> {
        &self.notifier
    }

    /// Observe directory updates. The initial value is empty and stale
    /// until the first pull completes.
    pub fn watch_directory(&self) -> watch::Receiver<Directory> {
        self.directory_tx.subscribe()
    }

    pub fn directory(&self) -> Directory {
        self.directory_tx.borrow().clone()
    }

    pub fn watch_feed_state(&self) -> watch::Receiver<FeedState> {
        self.feed_state_tx.subscribe()
    }

    pub fn feed_state(&self) -> FeedState {
        *self.feed_state_tx.borrow()
    }

    pub(crate) fn set_feed_state(&self, state: FeedState) {
        info!("change feed state: {:?}", state);
        self.cache.set_online(state == FeedState::Live);
        self.feed_state_tx.send_replace(state);
    }

    /// Full pull, publish on completion.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let directory = self.builder.pull().await?;
        self.directory_tx.send_replace(directory);
        Ok(())
    }

    /// Rebuild in the background. Two racing rebuilds are fine: each is a
    /// from-scratch read, the later publish wins.
    pub fn spawn_refresh(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = engine.refresh().await {
                warn!("directory rebuild failed: {}", e);
            }
        });
    }

    /// Archive for this user only. On success the entry is dropped from the
    /// published directory immediately (the one sanctioned narrow patch);
    /// the change-feed-triggered rebuild then confirms.
    pub async fn archive(&self, conversation_id: Uuid) -> Result<(), SyncError> {
        self.backend
            .set_archived(conversation_id, self.user_id, true)
            .await?;
        self.remove_entry(conversation_id);
        Ok(())
    }

    pub async fn unarchive(&self, conversation_id: Uuid) -> Result<(), SyncError> {
        self.backend
            .set_archived(conversation_id, self.user_id, false)
            .await?;
        self.refresh().await
    }

    /// Delete this user's own messages and membership, then drop the entry.
    pub async fn leave_conversation(&self, conversation_id: Uuid) -> Result<(), SyncError> {
        self.backend
            .leave_conversation(conversation_id, self.user_id)
            .await?;
        self.remove_entry(conversation_id);
        Ok(())
    }

    /// Patch the published view only. The cache keeps its last full
    /// snapshot; the rebuild the change feed triggers rewrites it
    /// wholesale, and that stays the single cache-writing path.
    fn remove_entry(&self, conversation_id: Uuid) {
        let mut directory = self.directory_tx.borrow().clone();
        directory
            .conversations
            .retain(|c| c.conversation.id != conversation_id);
        self.directory_tx.send_replace(directory);
    }

    /// Optimistic toggle: the board flips before the backend write and
    /// flips back if the write is rejected, so the caller sees pre-call
    /// state alongside the error. The revert restores the exact reaction
    /// the toggle touched, ids included.
    pub async fn toggle_reaction(&self, message_id: Uuid, emoji: &str) -> Result<bool, SyncError> {
        let outcome = self
            .reactions
            .write()
            .unwrap()
            .toggle(message_id, self.user_id, emoji);

        match self
            .backend
            .toggle_reaction(message_id, self.user_id, emoji)
            .await
        {
            Ok(_) => Ok(matches!(outcome, Toggle::Added(_))),
            Err(e) => {
                let mut board = self.reactions.write().unwrap();
                match outcome {
                    Toggle::Added(reaction) => board.remove(reaction.id),
                    Toggle::Removed(reaction) => board.apply_insert(reaction),
                }
                Err(e)
            }
        }
    }

    pub fn reactions_for(&self, message_id: Uuid) -> Vec<Reaction> {
        self.reactions.read().unwrap().reactions_for(message_id)
    }

    pub(crate) fn apply_reaction_insert(&self, reaction: Reaction) {
        self.reactions.write().unwrap().apply_insert(reaction);
    }

    pub(crate) fn apply_reaction_delete(&self, message_id: Uuid, reaction_id: Uuid) {
        self.reactions
            .write()
            .unwrap()
            .apply_delete(message_id, reaction_id);
    }
}
