//! In-memory fakes injected through the collaborator traits.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use stride_cache::SnapshotStore;
use stride_types::models::{Conversation, Message, ParticipantSnapshot};
use stride_types::SyncError;

use crate::backend::Backend;
use crate::notify::{Notification, NotificationSink};

#[derive(Default)]
pub struct FakeBackend {
    pub conversations: Mutex<Vec<Conversation>>,
    /// (conversation_id, user_id) pairs hidden from that user's pulls.
    pub archived: Mutex<HashSet<(Uuid, Uuid)>>,
    pub profiles: Mutex<HashMap<Uuid, ParticipantSnapshot>>,
    pub messages: Mutex<HashMap<Uuid, Vec<Message>>>,
    pub pulls: AtomicUsize,
    pub offline: AtomicBool,
    pub reject_writes: AtomicBool,
}

impl FakeBackend {
    pub fn add_conversation(&self, a: Uuid, b: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.conversations.lock().unwrap().push(Conversation {
            id,
            participant_a: a,
            participant_b: b,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        id
    }

    pub fn add_profile(&self, user_id: Uuid, name: &str) {
        self.profiles.lock().unwrap().insert(
            user_id,
            ParticipantSnapshot {
                user_id,
                username: name.to_lowercase(),
                display_name: name.to_string(),
                avatar_url: None,
            },
        );
    }

    pub fn add_message(&self, conversation_id: Uuid, sender_id: Uuid, content: &str) -> Message {
        let mut store = self.messages.lock().unwrap();
        let list = store.entry(conversation_id).or_default();
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            media: None,
            // Keep insertion order meaningful for latest_message.
            created_at: Utc::now() + Duration::milliseconds(list.len() as i64),
            deleted: false,
            read_by: None,
        };
        list.push(message.clone());
        message
    }

    fn check_write(&self) -> Result<(), SyncError> {
        if self.reject_writes.load(Ordering::Relaxed) {
            return Err(SyncError::BackendRejected("not allowed".into()));
        }
        if self.offline.load(Ordering::Relaxed) {
            return Err(SyncError::BackendUnavailable("offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn conversations_for(&self, user_id: Uuid) -> Result<Vec<Conversation>, SyncError> {
        self.pulls.fetch_add(1, Ordering::Relaxed);
        if self.offline.load(Ordering::Relaxed) {
            return Err(SyncError::BackendUnavailable("offline".into()));
        }
        let archived = self.archived.lock().unwrap();
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.participant_a == user_id || c.participant_b == user_id)
            .filter(|c| !archived.contains(&(c.id, user_id)))
            .cloned()
            .collect())
    }

    async fn other_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ParticipantSnapshot>, SyncError> {
        let other = self
            .conversations
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == conversation_id)
            .map(|c| c.other_participant(user_id));
        Ok(other.and_then(|id| self.profiles.lock().unwrap().get(&id).cloned()))
    }

    async fn latest_message(&self, conversation_id: Uuid) -> Result<Option<Message>, SyncError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(&conversation_id)
            .and_then(|list| {
                list.iter()
                    .filter(|m| !m.deleted)
                    .max_by_key(|m| m.created_at)
                    .cloned()
            }))
    }

    async fn messages_for(&self, conversation_id: Uuid) -> Result<Vec<Message>, SyncError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn display_name_of(&self, user_id: Uuid) -> Result<Option<String>, SyncError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|p| p.display_name.clone()))
    }

    async fn set_archived(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        archived: bool,
    ) -> Result<(), SyncError> {
        self.check_write()?;
        let mut set = self.archived.lock().unwrap();
        if archived {
            set.insert((conversation_id, user_id));
        } else {
            set.remove(&(conversation_id, user_id));
        }
        Ok(())
    }

    async fn leave_conversation(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), SyncError> {
        self.check_write()?;
        if let Some(list) = self.messages.lock().unwrap().get_mut(&conversation_id) {
            list.retain(|m| m.sender_id != user_id);
        }
        self.archived
            .lock()
            .unwrap()
            .insert((conversation_id, user_id));
        Ok(())
    }

    async fn toggle_reaction(
        &self,
        _message_id: Uuid,
        _user_id: Uuid,
        _emoji: &str,
    ) -> Result<bool, SyncError> {
        self.check_write()?;
        Ok(true)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

#[derive(Default)]
pub struct MemoryStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl SnapshotStore for MemoryStore {
    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, SyncError> {
        Ok(self.blob.lock().unwrap().clone())
    }
    fn put(&self, _key: &str, bytes: &[u8]) -> Result<(), SyncError> {
        *self.blob.lock().unwrap() = Some(bytes.to_vec());
        Ok(())
    }
    fn delete(&self, _key: &str) -> Result<(), SyncError> {
        *self.blob.lock().unwrap() = None;
        Ok(())
    }
}
