use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A direct-message conversation between exactly two users.
/// Owned by the backend; the client only ever holds a read-only copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub created_at: DateTime<Utc>,
    /// Bumped by the backend on every message; drives list ordering.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// The participant that is not `user_id`.
    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.participant_a == user_id {
            self.participant_b
        } else {
            self.participant_a
        }
    }
}

/// Denormalized profile fields of the other participant, embedded into a
/// directory entry so rendering needs no extra lookup. Recomputed on every
/// directory rebuild, never mutated by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub media: Option<MediaRef>,
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker; deleted messages stay in the row set but are
    /// excluded from previews and unread counts.
    #[serde(default)]
    pub deleted: bool,
    /// Ids of users who have seen this message. The backend sends null for
    /// "nobody yet", which is equivalent to an empty set.
    #[serde(default)]
    pub read_by: Option<Vec<Uuid>>,
}

impl Message {
    /// Unread for `user_id` iff someone else sent it, it is not deleted,
    /// and `user_id` is absent from `read_by` (null counts as empty).
    pub fn is_unread_for(&self, user_id: Uuid) -> bool {
        !self.deleted
            && self.sender_id != user_id
            && !self
                .read_by
                .as_deref()
                .unwrap_or_default()
                .contains(&user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub emoji: String,
}

/// The materialized view the rest of the app consumes. Superseded wholesale
/// by the next full pull; the only narrow patch is archive/leave removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationWithDetails {
    pub conversation: Conversation,
    pub participant: Option<ParticipantSnapshot>,
    pub last_message: Option<Message>,
    pub unread_count: u32,
}

/// Result of a directory pull. `stale` marks data served from the offline
/// cache rather than a live read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    pub conversations: Vec<ConversationWithDetails>,
    pub stale: bool,
}

impl Directory {
    pub fn empty_stale() -> Self {
        Self {
            conversations: Vec::new(),
            stale: true,
        }
    }
}
