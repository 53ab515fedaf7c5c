use uuid::Uuid;

use stride_types::models::Message;

/// Number of messages unread for `user_id`: sent by someone else, not
/// soft-deleted, and `user_id` absent from `read_by` (null is empty).
///
/// Two-party semantics only — the viewer's own presence in `read_by` is all
/// that matters, never other participants'.
pub fn unread_count(messages: &[Message], user_id: Uuid) -> u32 {
    messages.iter().filter(|m| m.is_unread_for(user_id)).count() as u32
}
