use std::collections::HashMap;

use uuid::Uuid;

use stride_types::models::Reaction;

/// In-memory reaction state, keyed by message id. Patched incrementally
/// from change-feed events — reactions are not part of the directory view,
/// so they never trigger a rebuild.
#[derive(Default)]
pub struct ReactionBoard {
    by_message: HashMap<Uuid, Vec<Reaction>>,
}

/// What a toggle did, carrying the affected reaction so a rejected backend
/// write can be reverted without losing the reaction's identity.
pub enum Toggle {
    Added(Reaction),
    Removed(Reaction),
}

impl ReactionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle semantics: a second add of the same (message, user, emoji)
    /// tuple removes the first instead of duplicating it. An added reaction
    /// carries a provisional id until the change feed's authoritative
    /// insert supersedes it (`apply_insert`).
    pub fn toggle(&mut self, message_id: Uuid, user_id: Uuid, emoji: &str) -> Toggle {
        let list = self.by_message.entry(message_id).or_default();
        if let Some(pos) = list
            .iter()
            .position(|r| r.user_id == user_id && r.emoji == emoji)
        {
            let removed = list.remove(pos);
            if list.is_empty() {
                self.by_message.remove(&message_id);
            }
            return Toggle::Removed(removed);
        }

        let reaction = Reaction {
            id: Uuid::new_v4(),
            message_id,
            user_id,
            emoji: emoji.to_string(),
        };
        list.push(reaction.clone());
        Toggle::Added(reaction)
    }

    /// Remove by identity, wherever it lives.
    pub fn remove(&mut self, reaction_id: Uuid) {
        self.by_message.retain(|_, list| {
            list.retain(|r| r.id != reaction_id);
            !list.is_empty()
        });
    }

    /// Feed patch: insert unless the tuple is already present. The feed is
    /// at-least-once, so a redelivered insert must not duplicate. When the
    /// tuple exists (an optimistic toggle got there first) the stored entry
    /// adopts the authoritative id so a later targeted delete matches.
    pub fn apply_insert(&mut self, reaction: Reaction) {
        let list = self.by_message.entry(reaction.message_id).or_default();
        match list
            .iter_mut()
            .find(|r| r.user_id == reaction.user_id && r.emoji == reaction.emoji)
        {
            Some(existing) => existing.id = reaction.id,
            None => list.push(reaction),
        }
    }

    /// Feed patch: targeted delete.
    pub fn apply_delete(&mut self, message_id: Uuid, reaction_id: Uuid) {
        if let Some(list) = self.by_message.get_mut(&message_id) {
            list.retain(|r| r.id != reaction_id);
            if list.is_empty() {
                self.by_message.remove(&message_id);
            }
        }
    }

    pub fn reactions_for(&self, message_id: Uuid) -> Vec<Reaction> {
        self.by_message
            .get(&message_id)
            .cloned()
            .unwrap_or_default()
    }
}
