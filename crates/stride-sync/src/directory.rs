use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use stride_cache::{OfflineCache, SnapshotStore};
use stride_types::models::{ConversationWithDetails, Directory};
use stride_types::SyncError;

use crate::backend::Backend;
use crate::unread::unread_count;

/// Builds the per-user conversation directory: a full, authoritative pull
/// of every active conversation enriched with the other participant, the
/// latest non-deleted message and the unread count.
///
/// A pull is an idempotent projection of current backend state, so callers
/// re-invoke it after change events instead of patching the result.
pub struct DirectoryBuilder<B, S> {
    backend: Arc<B>,
    cache: Arc<OfflineCache<S>>,
    user_id: Uuid,
}

impl<B, S> Clone for DirectoryBuilder<B, S> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: Arc::clone(&self.cache),
            user_id: self.user_id,
        }
    }
}

impl<B: Backend, S: SnapshotStore> DirectoryBuilder<B, S> {
    pub fn new(backend: Arc<B>, cache: Arc<OfflineCache<S>>, user_id: Uuid) -> Self {
        Self {
            backend,
            cache,
            user_id,
        }
    }

    /// Produce the directory. Live when possible; otherwise the cached
    /// snapshot marked stale. Only non-connectivity errors propagate.
    pub async fn pull(&self) -> Result<Directory, SyncError> {
        if !self.cache.is_online() {
            debug!("offline, serving cached directory");
            return Ok(self.cached_fallback());
        }

        match self.live_pull().await {
            Ok(conversations) => {
                // Write-through; cache faults are swallowed inside.
                self.cache.put_directory(&conversations);
                Ok(Directory {
                    conversations,
                    stale: false,
                })
            }
            Err(SyncError::BackendUnavailable(reason)) => {
                warn!("live pull failed, serving cached directory: {}", reason);
                Ok(self.cached_fallback())
            }
            Err(e) => Err(e),
        }
    }

    fn cached_fallback(&self) -> Directory {
        match self.cache.get_directory() {
            Some(conversations) => Directory {
                conversations,
                stale: true,
            },
            None => Directory::empty_stale(),
        }
    }

    async fn live_pull(&self) -> Result<Vec<ConversationWithDetails>, SyncError> {
        let conversations = self.backend.conversations_for(self.user_id).await?;
        let mut out = Vec::with_capacity(conversations.len());

        for conversation in conversations {
            let participant = self
                .backend
                .other_participant(conversation.id, self.user_id)
                .await?;
            let last_message = self.backend.latest_message(conversation.id).await?;
            let messages = self.backend.messages_for(conversation.id).await?;
            let unread = unread_count(&messages, self.user_id);

            out.push(ConversationWithDetails {
                conversation,
                participant,
                last_message,
                unread_count: unread,
            });
        }

        out.sort_by(|a, b| b.conversation.updated_at.cmp(&a.conversation.updated_at));
        Ok(out)
    }
}
