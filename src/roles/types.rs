//! Role roster types.

use serde::{Deserialize, Serialize};

/// Temperature assigned when the backend omits one.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Token budget assigned when the backend omits one.
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// A named AI persona configured on the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Unique, non-empty name. Also the `role` of the messages it authors.
    pub name: String,
    /// Short description shown next to the name.
    #[serde(default)]
    pub description: String,
    /// Backend model identifier.
    #[serde(default)]
    pub model: String,
    /// Sampling temperature in `[0, 1]`.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Token budget per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Prompt defining the role's behaviour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

const fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

const fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl Role {
    /// A role known only by name, as returned by older backends.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            model: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token budget.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Check the invariants a role must satisfy before it is sent to the registry.
    ///
    /// # Errors
    /// Returns a human-readable reason for the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Role name must not be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(format!(
                "Temperature must be between 0 and 1, got {}",
                self.temperature
            ));
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// A roster entry as sent by the backend: full record or bare name.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RosterEntry {
    Full(Role),
    Name(String),
}

impl From<RosterEntry> for Role {
    fn from(entry: RosterEntry) -> Self {
        match entry {
            RosterEntry::Full(role) => role,
            RosterEntry::Name(name) => Self::named(name),
        }
    }
}
