use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Conversation, Message, Reaction};

/// Events delivered over the backend's change feed. One tagged union for
/// all watched tables, classified client-side — the feed does no filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChangeEvent {
    /// A new message was committed
    MessageInsert { message: Message },

    /// An existing message changed (read receipts, soft delete)
    MessageUpdate { message: Message },

    /// A conversation row changed (created, archived, deleted)
    ConversationChange {
        conversation_id: Uuid,
        op: ConversationOp,
        conversation: Option<Conversation>,
    },

    /// A reaction was added to a message
    ReactionInsert { reaction: Reaction },

    /// A reaction was removed from a message
    ReactionDelete { message_id: Uuid, reaction_id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationOp {
    Insert,
    Update,
    Delete,
}

impl ChangeEvent {
    /// True for events that invalidate the directory view and therefore
    /// trigger a full rebuild. Reaction events patch in place instead.
    pub fn rebuilds_directory(&self) -> bool {
        matches!(
            self,
            Self::MessageInsert { .. } | Self::MessageUpdate { .. } | Self::ConversationChange { .. }
        )
    }
}
