//! Conversation-generation backend seam.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::api::wire::{
    CONVERSATION_PATH, ConversationReply, InjectionRequest, TEST_ROLE_PATH, TestRoleReply,
    TestRoleRequest,
};
use crate::api::{ApiClient, ApiResult};
use crate::conversation::types::{ConversationSettings, Message};

/// Boxed future type for backend operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait abstraction over the service that generates conversation turns.
pub trait ConversationBackend: Send + Sync {
    /// Start a conversation and return the full transcript.
    ///
    /// # Errors
    /// Returns an error if the request fails or is rejected.
    fn start_conversation(
        &self,
        settings: ConversationSettings,
    ) -> BackendFuture<'_, ApiResult<Vec<Message>>>;

    /// Submit a human message and return only the new messages.
    ///
    /// # Errors
    /// Returns an error if the request fails or is rejected.
    fn continue_conversation(
        &self,
        request: InjectionRequest,
    ) -> BackendFuture<'_, ApiResult<Vec<Message>>>;

    /// Ask one role a single question and return its reply.
    ///
    /// # Errors
    /// Returns an error if the request fails or is rejected.
    fn test_role(&self, request: TestRoleRequest) -> BackendFuture<'_, ApiResult<Message>>;
}

/// Backend reached over HTTP at `/api/ai/conversation` and `/api/test-role`.
#[derive(Clone, Debug)]
pub struct HttpConversationBackend {
    api: Arc<ApiClient>,
}

impl HttpConversationBackend {
    /// Wrap a shared API client.
    #[must_use]
    pub const fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

impl ConversationBackend for HttpConversationBackend {
    fn start_conversation(
        &self,
        settings: ConversationSettings,
    ) -> BackendFuture<'_, ApiResult<Vec<Message>>> {
        Box::pin(async move {
            let reply: ConversationReply = self.api.post_json(CONVERSATION_PATH, &settings).await?;
            Ok(reply.conversation)
        })
    }

    fn continue_conversation(
        &self,
        request: InjectionRequest,
    ) -> BackendFuture<'_, ApiResult<Vec<Message>>> {
        Box::pin(async move {
            let reply: ConversationReply = self.api.post_json(CONVERSATION_PATH, &request).await?;
            Ok(reply.conversation)
        })
    }

    fn test_role(&self, request: TestRoleRequest) -> BackendFuture<'_, ApiResult<Message>> {
        Box::pin(async move {
            let reply: TestRoleReply = self.api.post_json(TEST_ROLE_PATH, &request).await?;
            Ok(reply.message)
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::test_support::{self, Recorded};

    async fn conversation(State(log): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
        log.lock().unwrap().push(body.clone());
        if body.get("user_input").is_some() {
            Json(json!({ "conversation": [
                {"role": "user", "content": body["user_input"]},
                {"role": "Analyst", "content": "Q3 looks strong."}
            ]}))
        } else {
            Json(json!({ "conversation": [{"role": "Analyst", "content": "Hi"}] }))
        }
    }

    async fn test_role(Json(body): Json<Value>) -> Json<Value> {
        Json(json!({ "message": {"role": body["role"], "content": "Margins first."} }))
    }

    async fn backend() -> (HttpConversationBackend, Recorded) {
        let log = test_support::recorder();
        let router = Router::new()
            .route("/api/ai/conversation", post(conversation))
            .route("/api/test-role", post(test_role))
            .with_state(Arc::clone(&log));
        (HttpConversationBackend::new(test_support::api_for(router).await), log)
    }

    #[tokio::test]
    async fn test_start_posts_settings() {
        let (backend, log) = backend().await;
        let settings = ConversationSettings::new("pricing", 3, 500, ["Analyst"]);

        let transcript = backend.start_conversation(settings.clone()).await.unwrap();
        assert_eq!(transcript, vec![Message::from_role("Analyst", "Hi")]);
        assert_eq!(test_support::recorded(&log)[0], serde_json::to_value(&settings).unwrap());
    }

    #[tokio::test]
    async fn test_continue_posts_history_and_hint() {
        let (backend, log) = backend().await;
        let request = InjectionRequest {
            settings: ConversationSettings::new("pricing", 3, 500, ["Analyst"]),
            conversation_history: vec![Message::from_role("Analyst", "Hi")],
            user_input: "What about Q3?".to_string(),
            next_speaker: Some("Analyst".to_string()),
        };

        let delta = backend.continue_conversation(request).await.unwrap();
        assert_eq!(delta.len(), 2);
        assert!(delta[0].is_user());

        let body = &test_support::recorded(&log)[0];
        assert_eq!(body["topic"], "pricing");
        assert_eq!(body["conversation_history"][0]["content"], "Hi");
        assert_eq!(body["next_speaker"], "Analyst");
    }

    #[tokio::test]
    async fn test_role_probe_reply() {
        let (backend, _) = backend().await;
        let reply = backend
            .test_role(TestRoleRequest {
                role: "Analyst".to_string(),
                question: "Where do we start?".to_string(),
                max_tokens: Some(300),
            })
            .await
            .unwrap();
        assert_eq!(reply, Message::from_role("Analyst", "Margins first."));
    }
}
