//! User-facing error kinds.
//!
//! Every failure of a controller or registry operation ends up as one of these
//! variants. `Display` is the single line shown to the operator.

use thiserror::Error;

/// Generic message when the backend rejects a start without a detail.
pub const START_FAILED: &str = "Failed to start conversation";
/// Generic message when the backend rejects an injection without a detail.
pub const INJECT_FAILED: &str = "Failed to send message";
/// Generic message when the roster cannot be fetched.
pub const FETCH_ROLES_FAILED: &str = "Failed to fetch roles";
/// Generic message when a role cannot be saved.
pub const SAVE_ROLE_FAILED: &str = "Failed to save role";
/// Generic message when a role cannot be deleted.
pub const DELETE_ROLE_FAILED: &str = "Failed to delete role";
/// Generic message when a role probe fails.
pub const TEST_ROLE_FAILED: &str = "Failed to test role";

/// Errors surfaced by session and registry operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The roster could not be fetched. The cached roster is now empty.
    #[error("{message}")]
    RoleFetch {
        /// Operator-facing text.
        message: String,
    },

    /// A start request was invalid or rejected. The session is unchanged.
    #[error("{message}")]
    ConversationStart {
        /// Operator-facing text.
        message: String,
    },

    /// An injection was attempted before any conversation started.
    #[error("No active conversation. Start a conversation first.")]
    NoActiveConversation,

    /// An injection was invalid or rejected. The transcript is unchanged.
    #[error("{message}")]
    UserInjection {
        /// Operator-facing text.
        message: String,
    },

    /// Another exchange is still in flight for this session.
    #[error("A request is already in progress")]
    Busy,

    /// A role add/update/delete was invalid or rejected.
    #[error("{message}")]
    RoleMutation {
        /// Operator-facing text.
        message: String,
    },

    /// A single-role probe was invalid or rejected.
    #[error("{message}")]
    RoleTest {
        /// Operator-facing text.
        message: String,
    },
}

impl SessionError {
    /// Stable name of the error kind, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RoleFetch { .. } => "RoleFetchError",
            Self::ConversationStart { .. } => "ConversationStartError",
            Self::NoActiveConversation => "NoActiveConversationError",
            Self::UserInjection { .. } => "UserInjectionError",
            Self::Busy => "BusyError",
            Self::RoleMutation { .. } => "RoleMutationError",
            Self::RoleTest { .. } => "RoleTestError",
        }
    }

    pub(crate) fn start(message: impl Into<String>) -> Self {
        Self::ConversationStart {
            message: message.into(),
        }
    }

    pub(crate) fn injection(message: impl Into<String>) -> Self {
        Self::UserInjection {
            message: message.into(),
        }
    }

    pub(crate) fn mutation(message: impl Into<String>) -> Self {
        Self::RoleMutation {
            message: message.into(),
        }
    }

    pub(crate) fn role_test(message: impl Into<String>) -> Self {
        Self::RoleTest {
            message: message.into(),
        }
    }
}

/// Convenience result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_the_bare_message() {
        assert_eq!(SessionError::start("missing topic").to_string(), "missing topic");
        assert_eq!(
            SessionError::NoActiveConversation.to_string(),
            "No active conversation. Start a conversation first."
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(SessionError::injection("x").kind(), "UserInjectionError");
        assert_eq!(
            SessionError::RoleFetch {
                message: FETCH_ROLES_FAILED.to_string()
            }
            .kind(),
            "RoleFetchError"
        );
        assert_eq!(SessionError::Busy.kind(), "BusyError");
    }
}
