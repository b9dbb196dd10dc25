//! Messages and conversation settings.

use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// Sentinel role name for human-authored messages.
pub const USER_ROLE: &str = "user";

/// One entry of the conversation transcript.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// `"user"` for human messages, otherwise the authoring role's name.
    pub role: String,
    /// Message body.
    pub content: String,
}

impl Message {
    /// Build a human-authored message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: USER_ROLE.to_string(),
            content: content.into(),
        }
    }

    /// Build a message authored by the named role.
    #[must_use]
    pub fn from_role(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Whether a human wrote this message.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == USER_ROLE
    }
}

/// Parameters captured when a conversation starts.
///
/// They are stored on the session and resent unchanged with every injection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSettings {
    /// What the roles should discuss.
    pub topic: String,
    /// Turn budget, forwarded to the backend and never enforced locally.
    pub max_turns: u32,
    /// Token budget per generated response.
    pub max_tokens: u32,
    /// Names of the participating roles, without duplicates.
    pub active_roles: Vec<String>,
}

impl ConversationSettings {
    /// Build settings, dropping duplicate role names while keeping first-seen order.
    #[must_use]
    pub fn new<I, S>(topic: impl Into<String>, max_turns: u32, max_tokens: u32, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut active_roles: Vec<String> = Vec::new();
        for role in roles {
            let role = role.into();
            if !active_roles.contains(&role) {
                active_roles.push(role);
            }
        }

        Self {
            topic: topic.into(),
            max_turns,
            max_tokens,
            active_roles,
        }
    }

    /// Whether `name` takes part in this conversation.
    #[must_use]
    pub fn has_role(&self, name: &str) -> bool {
        self.active_roles.iter().any(|role| role == name)
    }

    /// Check the local preconditions of a start request.
    ///
    /// # Errors
    /// Returns a human-readable reason for the first violated precondition.
    pub fn validate(&self) -> Result<(), String> {
        if self.topic.trim().is_empty() {
            return Err("Please enter a topic for the conversation".to_string());
        }
        if self.active_roles.is_empty() {
            return Err("Select at least one role for the conversation".to_string());
        }
        if self.active_roles.iter().any(|role| role.trim().is_empty()) {
            return Err("Role names must not be empty".to_string());
        }
        if self.max_turns == 0 {
            return Err("max_turns must be at least 1".to_string());
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be at least 1".to_string());
        }
        Ok(())
    }

    /// Check that every active role exists in `roster`.
    ///
    /// # Errors
    /// Returns the first active role missing from the roster.
    pub fn validate_against(&self, roster: &[Role]) -> Result<(), String> {
        match self
            .active_roles
            .iter()
            .find(|name| !roster.iter().any(|role| &role.name == *name))
        {
            Some(missing) => Err(format!("Unknown role: {missing}")),
            None => Ok(()),
        }
    }
}
