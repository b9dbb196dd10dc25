//! Session state: settings, transcript and the loading flag.
//!
//! A [`Session`] has exactly one writer (its controller) and any number of
//! readers. Readers hold a [`SharedSession`] and take snapshots; the lock is
//! never held across an `.await`.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::types::{ConversationSettings, Message};
use crate::error::{SessionError, SessionResult};

/// Identifier of one session, for logs and presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Where a session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No conversation has started successfully yet.
    Empty,
    /// Settings are stored; injections are accepted.
    Active,
}

/// Conversation state owned by one controller.
#[derive(Clone, Debug, Serialize)]
pub struct Session {
    id: SessionId,
    settings: Option<ConversationSettings>,
    transcript: Vec<Message>,
    loading: bool,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// An empty session.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            settings: None,
            transcript: Vec::new(),
            loading: false,
            created_at: now,
            started_at: None,
            updated_at: now,
        }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Settings of the running conversation, if one started.
    #[must_use]
    pub const fn settings(&self) -> Option<&ConversationSettings> {
        self.settings.as_ref()
    }

    /// Transcript in conversation order.
    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Whether an exchange with the backend is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Lifecycle phase, derived from whether settings are stored.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        if self.settings.is_some() {
            SessionPhase::Active
        } else {
            SessionPhase::Empty
        }
    }

    /// When the session object was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the current conversation last started successfully.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Last time the settings or transcript changed.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Store fresh settings and replace the transcript wholesale.
    fn replace(&mut self, settings: ConversationSettings, transcript: Vec<Message>) {
        let now = Utc::now();
        self.settings = Some(settings);
        self.transcript = transcript;
        self.started_at = Some(now);
        self.updated_at = now;
    }

    /// Append a delta to the transcript, keeping its order.
    fn append(&mut self, delta: Vec<Message>) {
        self.transcript.extend(delta);
        self.updated_at = Utc::now();
    }
}

/// Cloneable handle to one [`Session`].
#[derive(Clone, Debug, Default)]
pub struct SharedSession {
    inner: Arc<RwLock<Session>>,
}

impl SharedSession {
    /// Handle to a fresh, empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the whole session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.read().id
    }

    /// Copy of the stored settings.
    #[must_use]
    pub fn settings(&self) -> Option<ConversationSettings> {
        self.read().settings.clone()
    }

    /// Copy of the transcript.
    #[must_use]
    pub fn transcript(&self) -> Vec<Message> {
        self.read().transcript.clone()
    }

    /// Whether an exchange is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.read().phase()
    }

    /// Claim the session for one exchange.
    ///
    /// The check and the set happen under one write lock, so of two
    /// back-to-back callers exactly one wins.
    pub(crate) fn begin_exchange(&self) -> SessionResult<LoadingGuard> {
        let mut session = self.write();
        if session.loading {
            return Err(SessionError::Busy);
        }
        session.loading = true;
        drop(session);

        Ok(LoadingGuard {
            session: self.clone(),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that the holder owns the session's single in-flight exchange.
///
/// Dropping it clears `loading`, whatever way the exchange ended.
#[derive(Debug)]
pub(crate) struct LoadingGuard {
    session: SharedSession,
}

impl LoadingGuard {
    /// Settings and transcript as seen by the exchange holder.
    pub(crate) fn context(&self) -> (Option<ConversationSettings>, Vec<Message>) {
        let session = self.session.read();
        (session.settings.clone(), session.transcript.clone())
    }

    /// Commit a successful start.
    pub(crate) fn replace(&self, settings: ConversationSettings, transcript: Vec<Message>) {
        self.session.write().replace(settings, transcript);
    }

    /// Commit a successful injection.
    pub(crate) fn append(&self, delta: Vec<Message>) {
        self.session.write().append(delta);
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.session.write().loading = false;
    }
}
