//! Form state behind the control panel.

use std::ops::RangeInclusive;

use serde::Serialize;

use crate::conversation::ConversationSettings;
use crate::error::{SessionError, SessionResult};
use crate::roles::Role;

/// Turns offered by default.
pub const DEFAULT_MAX_TURNS: u32 = 2;
/// Tokens per response offered by default.
pub const DEFAULT_MAX_TOKENS: u32 = 300;
/// Range accepted for `max_turns`.
pub const MAX_TURNS_RANGE: RangeInclusive<u32> = 1..=5;
/// Range accepted for `max_tokens`.
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 100..=1000;

/// Start form: topic, budgets and the active role selection.
///
/// The selection always follows roster order, whatever order roles were
/// toggled in. Every roster role is selected unless the operator deselected
/// it; deselections outlive roster refreshes, including empty ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ControlPanel {
    topic: String,
    max_turns: u32,
    max_tokens: u32,
    roster: Vec<String>,
    selected: Vec<String>,
    deselected: Vec<String>,
}

impl ControlPanel {
    /// Form for the given roster, with every role selected.
    #[must_use]
    pub fn new(roster: &[Role]) -> Self {
        let names: Vec<String> = roster.iter().map(|role| role.name.clone()).collect();
        Self {
            topic: String::new(),
            max_turns: DEFAULT_MAX_TURNS,
            max_tokens: DEFAULT_MAX_TOKENS,
            selected: names.clone(),
            roster: names,
            deselected: Vec::new(),
        }
    }

    /// Current topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Replace the topic.
    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = topic.into();
    }

    /// Current turn budget.
    #[must_use]
    pub const fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Set the turn budget, clamped to [`MAX_TURNS_RANGE`]. Returns the stored value.
    pub fn set_max_turns(&mut self, max_turns: u32) -> u32 {
        self.max_turns = max_turns.clamp(*MAX_TURNS_RANGE.start(), *MAX_TURNS_RANGE.end());
        self.max_turns
    }

    /// Current token budget.
    #[must_use]
    pub const fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Set the token budget, clamped to [`MAX_TOKENS_RANGE`]. Returns the stored value.
    pub fn set_max_tokens(&mut self, max_tokens: u32) -> u32 {
        self.max_tokens = max_tokens.clamp(*MAX_TOKENS_RANGE.start(), *MAX_TOKENS_RANGE.end());
        self.max_tokens
    }

    /// Role names in roster order.
    #[must_use]
    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    /// Selected role names in roster order.
    #[must_use]
    pub fn selected_roles(&self) -> &[String] {
        &self.selected
    }

    /// Whether the named role is selected.
    #[must_use]
    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.iter().any(|selected| selected == name)
    }

    /// Flip the selection of a roster role.
    ///
    /// Returns the new state, or `None` if the role is not in the roster.
    pub fn toggle_role(&mut self, name: &str) -> Option<bool> {
        if !self.roster.iter().any(|role| role == name) {
            return None;
        }

        let now_selected = !self.is_selected(name);
        if now_selected {
            self.deselected.retain(|role| role != name);
        } else {
            self.deselected.push(name.to_string());
        }
        self.reselect();
        Some(now_selected)
    }

    /// Roles the operator may address as next speaker: the running
    /// conversation's active roles, or the current selection before a start.
    #[must_use]
    pub fn speaker_choices(&self, settings: Option<&ConversationSettings>) -> Vec<String> {
        settings.map_or_else(
            || self.selected.clone(),
            |settings| settings.active_roles.clone(),
        )
    }

    /// Whether the start control should be enabled.
    #[must_use]
    pub fn can_start(&self) -> bool {
        !self.topic.trim().is_empty() && !self.selected.is_empty()
    }

    /// Settings for a start request.
    ///
    /// # Errors
    /// [`SessionError::ConversationStart`] if the topic is blank or no role is
    /// selected.
    pub fn settings(&self) -> SessionResult<ConversationSettings> {
        let settings = ConversationSettings::new(
            self.topic.trim(),
            self.max_turns,
            self.max_tokens,
            self.selected.iter().cloned(),
        );
        settings.validate().map_err(SessionError::start)?;
        Ok(settings)
    }

    /// Adopt a refreshed roster.
    ///
    /// Roles that disappeared leave the selection. New roles join it unless
    /// the operator deselected them earlier.
    pub fn sync_roster(&mut self, roster: &[Role]) {
        self.roster = roster.iter().map(|role| role.name.clone()).collect();
        self.reselect();
    }

    fn reselect(&mut self) {
        self.selected = self
            .roster
            .iter()
            .filter(|role| !self.deselected.contains(role))
            .cloned()
            .collect();
    }
}
