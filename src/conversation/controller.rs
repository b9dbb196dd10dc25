//! Conversation controller: the only writer of a session.
//!
//! Every exchange claims the session's loading flag first and releases it
//! through a drop guard, so `loading` is `false` again on success, on error
//! and when the caller abandons the future. A failed exchange never touches
//! the transcript or the settings.

use std::sync::Arc;

use crate::api::wire::{InjectionRequest, TestRoleRequest};
use crate::conversation::backend::ConversationBackend;
use crate::conversation::session::SharedSession;
use crate::conversation::types::{ConversationSettings, Message};
use crate::error::{
    INJECT_FAILED, START_FAILED, SessionError, SessionResult, TEST_ROLE_FAILED,
};

/// Drives one session against a conversation backend.
#[derive(Clone)]
pub struct ConversationController {
    backend: Arc<dyn ConversationBackend>,
    session: SharedSession,
}

impl ConversationController {
    /// Controller owning a fresh, empty session.
    #[must_use]
    pub fn new(backend: Arc<dyn ConversationBackend>) -> Self {
        Self {
            backend,
            session: SharedSession::new(),
        }
    }

    /// Read handle to the session, for presentation.
    #[must_use]
    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }

    /// Start a conversation, replacing the transcript with the backend's.
    ///
    /// On success the settings are stored and reused for every later
    /// injection. Starting again on an active session begins a new
    /// conversation; if that fails the previous one is kept as is.
    ///
    /// # Errors
    /// - [`SessionError::ConversationStart`] if the settings are invalid (no
    ///   request is made) or the backend rejects them.
    /// - [`SessionError::Busy`] if another exchange is in flight.
    pub async fn start(&self, settings: ConversationSettings) -> SessionResult<Vec<Message>> {
        settings.validate().map_err(SessionError::start)?;

        let guard = self.session.begin_exchange()?;
        tracing::debug!(
            session = %self.session.id(),
            topic = %settings.topic,
            roles = settings.active_roles.len(),
            max_turns = settings.max_turns,
            "starting conversation"
        );

        match self.backend.start_conversation(settings.clone()).await {
            Ok(transcript) => {
                tracing::info!(
                    session = %self.session.id(),
                    messages = transcript.len(),
                    "conversation started"
                );
                guard.replace(settings, transcript.clone());
                Ok(transcript)
            }
            Err(err) => {
                tracing::warn!(session = %self.session.id(), error = %err, "failed to start conversation");
                Err(SessionError::start(err.user_message(START_FAILED)))
            }
        }
    }

    /// Start again with the settings of the current conversation.
    ///
    /// # Errors
    /// [`SessionError::NoActiveConversation`] if nothing was started yet,
    /// otherwise the same errors as [`Self::start`].
    pub async fn restart(&self) -> SessionResult<Vec<Message>> {
        let settings = self
            .session
            .settings()
            .ok_or(SessionError::NoActiveConversation)?;
        tracing::debug!(session = %self.session.id(), "restarting conversation");
        self.start(settings).await
    }

    /// Inject a human message, optionally naming the role that answers next.
    ///
    /// The backend receives the stored settings and the full transcript and
    /// replies with the new messages only; those are appended and returned.
    ///
    /// # Errors
    /// - [`SessionError::NoActiveConversation`] before any successful start
    ///   (no request is made).
    /// - [`SessionError::UserInjection`] for blank input, a `next_speaker`
    ///   outside the active roles (no request is made), or a rejected request.
    /// - [`SessionError::Busy`] if another exchange is in flight.
    pub async fn inject(
        &self,
        user_input: &str,
        next_speaker: Option<&str>,
    ) -> SessionResult<Vec<Message>> {
        let settings = self
            .session
            .settings()
            .ok_or(SessionError::NoActiveConversation)?;
        check_injection(&settings, user_input, next_speaker)?;

        let guard = self.session.begin_exchange()?;
        // Re-read under the guard: a start may have committed in between.
        let (current, history) = match guard.context() {
            (Some(current), history) => (current, history),
            (None, _) => return Err(SessionError::NoActiveConversation),
        };
        check_injection(&current, user_input, next_speaker)?;

        tracing::debug!(
            session = %self.session.id(),
            history = history.len(),
            next_speaker = next_speaker.unwrap_or("-"),
            "injecting user message"
        );

        let request = InjectionRequest {
            settings: current,
            conversation_history: history,
            user_input: user_input.to_string(),
            next_speaker: next_speaker.map(str::to_string),
        };

        match self.backend.continue_conversation(request).await {
            Ok(delta) => {
                tracing::info!(
                    session = %self.session.id(),
                    appended = delta.len(),
                    "conversation continued"
                );
                guard.append(delta.clone());
                Ok(delta)
            }
            Err(err) => {
                tracing::warn!(session = %self.session.id(), error = %err, "failed to inject user message");
                Err(SessionError::injection(err.user_message(INJECT_FAILED)))
            }
        }
    }

    /// Ask a single role one question outside the conversation.
    ///
    /// Holds the loading flag like any exchange but leaves the transcript
    /// and settings alone. Returns the question followed by the reply.
    ///
    /// # Errors
    /// - [`SessionError::RoleTest`] for a blank role or question (no request
    ///   is made) or a rejected request.
    /// - [`SessionError::Busy`] if another exchange is in flight.
    pub async fn test_role(
        &self,
        role: &str,
        question: &str,
        max_tokens: Option<u32>,
    ) -> SessionResult<Vec<Message>> {
        if role.trim().is_empty() {
            return Err(SessionError::role_test("Please select a role to test"));
        }
        if question.trim().is_empty() {
            return Err(SessionError::role_test("Please enter a question for the role"));
        }

        let _guard = self.session.begin_exchange()?;
        tracing::debug!(session = %self.session.id(), role, "testing role");

        let request = TestRoleRequest {
            role: role.to_string(),
            question: question.to_string(),
            max_tokens,
        };

        match self.backend.test_role(request).await {
            Ok(reply) => Ok(vec![Message::user(question), reply]),
            Err(err) => {
                tracing::warn!(session = %self.session.id(), role, error = %err, "failed to test role");
                Err(SessionError::role_test(err.user_message(TEST_ROLE_FAILED)))
            }
        }
    }
}

fn check_injection(
    settings: &ConversationSettings,
    user_input: &str,
    next_speaker: Option<&str>,
) -> SessionResult<()> {
    if user_input.trim().is_empty() {
        return Err(SessionError::injection("Please enter a message"));
    }

    match next_speaker {
        Some(speaker) if !settings.has_role(speaker) => Err(SessionError::injection(format!(
            "{speaker} is not an active role in this conversation"
        ))),
        _ => Ok(()),
    }
}
