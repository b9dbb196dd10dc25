//! Transcript rendering model.

use std::fmt;

use serde::Serialize;

use crate::conversation::{Message, Session};

/// Label shown for human-authored messages.
pub const USER_LABEL: &str = "You";

/// One transcript line as the display panel shows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayEntry {
    /// `"You"` for human messages, otherwise the role name.
    pub speaker_label: String,
    /// Message body.
    pub content: String,
    /// Whether the message came from the operator.
    pub from_user: bool,
}

impl DisplayEntry {
    /// Project one transcript message.
    #[must_use]
    pub fn from_message(message: &Message) -> Self {
        let from_user = message.is_user();
        Self {
            speaker_label: if from_user {
                USER_LABEL.to_string()
            } else {
                message.role.clone()
            },
            content: message.content.clone(),
            from_user,
        }
    }
}

impl fmt::Display for DisplayEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.speaker_label, self.content)
    }
}

/// Everything the display panel needs from a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayPanel {
    /// Topic of the running conversation.
    pub topic: Option<String>,
    /// Entries in transcript order.
    pub entries: Vec<DisplayEntry>,
    /// Whether an exchange is in flight.
    pub loading: bool,
}

impl DisplayPanel {
    /// Project a session snapshot.
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        Self {
            topic: session.settings().map(|settings| settings.topic.clone()),
            entries: session
                .transcript()
                .iter()
                .map(DisplayEntry::from_message)
                .collect(),
            loading: session.is_loading(),
        }
    }

    /// Whether there is nothing to show yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
