use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use stride_sync::Backend;
use stride_types::models::{Conversation, Message, ParticipantSnapshot};
use stride_types::SyncError;

/// REST implementation of the backend collaborator. Connectivity and
/// server-side failures map to `BackendUnavailable`; 4xx responses map to
/// `BackendRejected`.
pub struct HttpBackend {
    http: HttpClient,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, SyncError> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| SyncError::BackendUnavailable(e.to_string()))?;
        match classify_status(resp.status()) {
            Some(err) => Err(err),
            None => Ok(resp),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        let resp = self.send(self.http.get(self.url(path))).await?;
        resp.json()
            .await
            .map_err(|e| SyncError::BackendUnavailable(e.to_string()))
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, SyncError> {
        let resp = self.send(self.http.post(self.url(path)).json(body)).await?;
        resp.json()
            .await
            .map_err(|e| SyncError::BackendUnavailable(e.to_string()))
    }
}

/// Non-success statuses split by recovery policy: client errors are
/// rejections the caller must handle, everything else is unavailability
/// the cache layer absorbs.
fn classify_status(status: StatusCode) -> Option<SyncError> {
    if status.is_success() {
        None
    } else if status.is_client_error() {
        Some(SyncError::BackendRejected(format!("HTTP {}", status)))
    } else {
        Some(SyncError::BackendUnavailable(format!("HTTP {}", status)))
    }
}

#[derive(Serialize)]
struct ArchiveRequest {
    user_id: Uuid,
    archived: bool,
}

#[derive(Serialize)]
struct LeaveRequest {
    user_id: Uuid,
}

#[derive(Serialize)]
struct ToggleReactionRequest<'a> {
    user_id: Uuid,
    emoji: &'a str,
}

#[derive(serde::Deserialize)]
struct ToggleReactionResponse {
    added: bool,
}

#[async_trait]
impl Backend for HttpBackend {
    async fn conversations_for(&self, user_id: Uuid) -> Result<Vec<Conversation>, SyncError> {
        self.get_json(&format!("/users/{}/conversations", user_id))
            .await
    }

    async fn other_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ParticipantSnapshot>, SyncError> {
        self.get_json(&format!(
            "/conversations/{}/participants/other?user={}",
            conversation_id, user_id
        ))
        .await
    }

    async fn latest_message(&self, conversation_id: Uuid) -> Result<Option<Message>, SyncError> {
        self.get_json(&format!("/conversations/{}/messages/latest", conversation_id))
            .await
    }

    async fn messages_for(&self, conversation_id: Uuid) -> Result<Vec<Message>, SyncError> {
        self.get_json(&format!("/conversations/{}/messages", conversation_id))
            .await
    }

    async fn display_name_of(&self, user_id: Uuid) -> Result<Option<String>, SyncError> {
        let profile: Option<ParticipantSnapshot> =
            self.get_json(&format!("/users/{}/profile", user_id)).await?;
        Ok(profile.map(|p| p.display_name))
    }

    async fn set_archived(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        archived: bool,
    ) -> Result<(), SyncError> {
        self.send(
            self.http
                .put(self.url(&format!("/conversations/{}/archive", conversation_id)))
                .json(&ArchiveRequest { user_id, archived }),
        )
        .await?;
        Ok(())
    }

    async fn leave_conversation(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), SyncError> {
        self.send(
            self.http
                .post(self.url(&format!("/conversations/{}/leave", conversation_id)))
                .json(&LeaveRequest { user_id }),
        )
        .await?;
        Ok(())
    }

    async fn toggle_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<bool, SyncError> {
        let resp: ToggleReactionResponse = self
            .post_json(
                &format!("/messages/{}/reactions", message_id),
                &ToggleReactionRequest { user_id, emoji },
            )
            .await?;
        Ok(resp.added)
    }
}
