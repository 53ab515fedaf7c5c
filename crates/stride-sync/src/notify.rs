use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use stride_types::models::{MediaKind, Message};

use crate::backend::Backend;

const PREVIEW_MAX_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub deep_link: String,
    /// Per-conversation tag: lets the platform surface collapse stacks.
    pub tag: String,
    pub dedupe_key: String,
}

/// Local platform notification surface. The engine does not control its
/// delivery guarantees; it only calls it at most once per distinct message.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification);
}

#[async_trait]
impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    async fn notify(&self, notification: Notification) {
        (**self).notify(notification).await;
    }
}

/// Decides, per inbound message-insert event, whether to raise a
/// user-visible notification. The feed is at-least-once, so the same
/// insert may arrive more than once; a per-conversation marker of the last
/// notified message id makes redelivery a no-op.
pub struct Notifier<B, N> {
    backend: Arc<B>,
    sink: N,
    user_id: Uuid,
    last_notified: Mutex<HashMap<Uuid, Uuid>>,
}

impl<B: Backend, N: NotificationSink> Notifier<B, N> {
    pub fn new(backend: Arc<B>, sink: N, user_id: Uuid) -> Self {
        Self {
            backend,
            sink,
            user_id,
            last_notified: Mutex::new(HashMap::new()),
        }
    }

    pub async fn on_message_insert(&self, message: &Message) {
        // Rule 1: never notify for our own sends.
        if message.sender_id == self.user_id {
            return;
        }

        // Rule 2: suppress redelivered inserts.
        {
            let last = self.last_notified.lock().unwrap();
            if last.get(&message.conversation_id) == Some(&message.id) {
                debug!("duplicate delivery of message {}, suppressing", message.id);
                return;
            }
        }

        let title = self
            .backend
            .display_name_of(message.sender_id)
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| "New message".to_string());

        self.sink
            .notify(Notification {
                title,
                body: preview(message),
                deep_link: format!("stride://conversations/{}", message.conversation_id),
                tag: message.conversation_id.to_string(),
                dedupe_key: message.id.to_string(),
            })
            .await;

        self.last_notified
            .lock()
            .unwrap()
            .insert(message.conversation_id, message.id);
    }
}

/// One-line preview: fixed text for media, truncated excerpt otherwise.
pub fn preview(message: &Message) -> String {
    match &message.media {
        Some(media) => match media.kind {
            MediaKind::Image => "Sent a photo".to_string(),
            MediaKind::Video => "Sent a video".to_string(),
            MediaKind::Audio => "Sent a voice message".to_string(),
        },
        None => excerpt(&message.content),
    }
}

fn excerpt(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeBackend, RecordingSink};
    use chrono::Utc;
    use stride_types::models::MediaRef;

    fn incoming(sender: Uuid, content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: sender,
            content: content.to_string(),
            media: None,
            created_at: Utc::now(),
            deleted: false,
            read_by: None,
        }
    }

    fn notifier(backend: Arc<FakeBackend>) -> (Notifier<FakeBackend, Arc<RecordingSink>>, Arc<RecordingSink>, Uuid) {
        let sink = Arc::new(RecordingSink::default());
        let me = Uuid::new_v4();
        (
            Notifier::new(backend, Arc::clone(&sink), me),
            sink,
            me,
        )
    }

    #[tokio::test]
    async fn duplicate_delivery_notifies_once() {
        let backend = Arc::new(FakeBackend::default());
        let (notifier, sink, _) = notifier(backend);

        let message = incoming(Uuid::new_v4(), "negative splits today");
        notifier.on_message_insert(&message).await;
        notifier.on_message_insert(&message).await;

        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn own_messages_are_suppressed() {
        let backend = Arc::new(FakeBackend::default());
        let (notifier, sink, me) = notifier(backend);

        notifier.on_message_insert(&incoming(me, "sent from my other device")).await;
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn distinct_messages_each_notify() {
        let backend = Arc::new(FakeBackend::default());
        let (notifier, sink, _) = notifier(backend);

        let sender = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let mut first = incoming(sender, "warmup?");
        first.conversation_id = conversation;
        let mut second = incoming(sender, "cooldown?");
        second.conversation_id = conversation;

        notifier.on_message_insert(&first).await;
        notifier.on_message_insert(&second).await;
        assert_eq!(sink.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn notification_carries_sender_name_and_deep_link() {
        let backend = Arc::new(FakeBackend::default());
        let sender = Uuid::new_v4();
        backend.add_profile(sender, "Alice");
        let (notifier, sink, _) = notifier(backend);

        let message = incoming(sender, "race day!");
        notifier.on_message_insert(&message).await;

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent[0].title, "Alice");
        assert_eq!(sent[0].body, "race day!");
        assert_eq!(
            sent[0].deep_link,
            format!("stride://conversations/{}", message.conversation_id)
        );
        assert_eq!(sent[0].dedupe_key, message.id.to_string());
    }

    #[tokio::test]
    async fn unknown_sender_gets_generic_title() {
        let backend = Arc::new(FakeBackend::default());
        let (notifier, sink, _) = notifier(backend);

        notifier.on_message_insert(&incoming(Uuid::new_v4(), "hi")).await;
        assert_eq!(sink.sent.lock().unwrap()[0].title, "New message");
    }

    #[test]
    fn media_previews_are_special_cased() {
        let mut message = incoming(Uuid::new_v4(), "");
        for (kind, expected) in [
            (MediaKind::Image, "Sent a photo"),
            (MediaKind::Video, "Sent a video"),
            (MediaKind::Audio, "Sent a voice message"),
        ] {
            message.media = Some(MediaRef {
                kind,
                url: "https://cdn.stride.run/m/1".into(),
            });
            assert_eq!(preview(&message), expected);
        }
    }

    #[test]
    fn long_text_is_truncated_on_a_char_boundary() {
        let mut message = incoming(Uuid::new_v4(), "");
        message.content = "é".repeat(100);
        let body = preview(&message);
        assert_eq!(body.chars().count(), PREVIEW_MAX_CHARS + 1);
        assert!(body.ends_with('…'));

        message.content = "short".into();
        assert_eq!(preview(&message), "short");
    }
}
