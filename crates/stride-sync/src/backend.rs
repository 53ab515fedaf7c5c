use async_trait::async_trait;
use uuid::Uuid;

use stride_types::models::{Conversation, Message, ParticipantSnapshot};
use stride_types::SyncError;

/// The backend collaborator: data store queries, mutations, nothing else.
/// The change feed is a separate seam ([`crate::dispatcher::FeedTransport`])
/// so the dispatcher state machine can be tested without a transport.
///
/// Connectivity failures map to `SyncError::BackendUnavailable`; rejected
/// writes map to `SyncError::BackendRejected`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Active (non-archived) conversations the user participates in.
    async fn conversations_for(&self, user_id: Uuid) -> Result<Vec<Conversation>, SyncError>;

    /// Profile snapshot of the participant of `conversation_id` other than
    /// `user_id`, or `None` if the membership row is gone.
    async fn other_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ParticipantSnapshot>, SyncError>;

    /// Most recent non-deleted message, by `created_at` descending.
    async fn latest_message(&self, conversation_id: Uuid) -> Result<Option<Message>, SyncError>;

    /// All message rows of a conversation, for unread accounting.
    async fn messages_for(&self, conversation_id: Uuid) -> Result<Vec<Message>, SyncError>;

    async fn display_name_of(&self, user_id: Uuid) -> Result<Option<String>, SyncError>;

    /// Mark a conversation archived (or unarchived) for one user only.
    async fn set_archived(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        archived: bool,
    ) -> Result<(), SyncError>;

    /// Delete the user's own messages and membership in a conversation.
    async fn leave_conversation(&self, conversation_id: Uuid, user_id: Uuid)
        -> Result<(), SyncError>;

    /// Toggle a reaction tuple. Returns whether the backend added (true) or
    /// removed (false) it.
    async fn toggle_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<bool, SyncError>;
}
