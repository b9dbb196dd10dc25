//! Request and response bodies exchanged with the backend.

use serde::{Deserialize, Serialize};

use crate::conversation::types::{ConversationSettings, Message};
use crate::roles::types::{Role, RosterEntry};

/// `GET`: current roster.
pub const ROLES_PATH: &str = "api/roles";
/// `POST`: create a role.
pub const ADD_ROLE_PATH: &str = "api/roles/add";
/// `POST`: replace a role identified by `original_name`.
pub const UPDATE_ROLE_PATH: &str = "api/roles/update";
/// `POST`: delete a role by name.
pub const DELETE_ROLE_PATH: &str = "api/roles/delete";
/// `POST`: start or continue a conversation.
pub const CONVERSATION_PATH: &str = "api/ai/conversation";
/// `POST`: ask one role a single question.
pub const TEST_ROLE_PATH: &str = "api/test-role";

/// Body of `GET /api/roles`.
#[derive(Debug, Deserialize)]
pub(crate) struct RolesEnvelope {
    #[serde(default)]
    roles: Vec<RosterEntry>,
}

impl RolesEnvelope {
    pub(crate) fn into_roles(self) -> Vec<Role> {
        self.roles.into_iter().map(Role::from).collect()
    }
}

/// Body of `POST /api/roles/update`.
#[derive(Debug, Serialize)]
pub(crate) struct UpdateRoleRequest<'a> {
    #[serde(flatten)]
    pub(crate) role: &'a Role,
    pub(crate) original_name: &'a str,
}

/// Body of `POST /api/roles/delete`.
#[derive(Debug, Serialize)]
pub(crate) struct DeleteRoleRequest<'a> {
    pub(crate) name: &'a str,
}

/// Body of a mid-conversation injection.
///
/// The backend is stateless, so the full history travels with every call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InjectionRequest {
    /// Settings captured when the conversation started.
    #[serde(flatten)]
    pub settings: ConversationSettings,
    /// Entire transcript so far.
    pub conversation_history: Vec<Message>,
    /// The new human message.
    pub user_input: String,
    /// Role that should answer next, if the operator picked one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_speaker: Option<String>,
}

/// Reply of `POST /api/ai/conversation`: full transcript on start, delta on injection.
#[derive(Debug, Deserialize)]
pub(crate) struct ConversationReply {
    // First backend revision answered with `messages`.
    #[serde(alias = "messages")]
    pub(crate) conversation: Vec<Message>,
}

/// Body of `POST /api/test-role`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TestRoleRequest {
    /// Role to probe.
    pub role: String,
    /// Question put to the role.
    pub question: String,
    /// Optional token budget; the backend falls back to the role's own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Reply of `POST /api/test-role`.
#[derive(Debug, Deserialize)]
pub(crate) struct TestRoleReply {
    pub(crate) message: Message,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_injection_request_flattens_settings() {
        let request = InjectionRequest {
            settings: ConversationSettings::new("pricing", 3, 500, ["Analyst"]),
            conversation_history: vec![Message::from_role("Analyst", "Hi")],
            user_input: "What about Q3?".to_string(),
            next_speaker: Some("Analyst".to_string()),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "topic": "pricing",
                "max_turns": 3,
                "max_tokens": 500,
                "active_roles": ["Analyst"],
                "conversation_history": [{"role": "Analyst", "content": "Hi"}],
                "user_input": "What about Q3?",
                "next_speaker": "Analyst"
            })
        );
    }

    #[test]
    fn test_injection_request_omits_missing_speaker() {
        let request = InjectionRequest {
            settings: ConversationSettings::new("pricing", 3, 500, ["Analyst"]),
            conversation_history: Vec::new(),
            user_input: "Go on".to_string(),
            next_speaker: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("next_speaker").is_none());
    }

    #[test]
    fn test_update_request_carries_original_name() {
        let role = Role::named("Lead Analyst");
        let json = serde_json::to_value(UpdateRoleRequest {
            role: &role,
            original_name: "Analyst",
        })
        .unwrap();
        assert_eq!(json["name"], "Lead Analyst");
        assert_eq!(json["original_name"], "Analyst");
    }

    #[test]
    fn test_conversation_reply_accepts_legacy_key() {
        let reply: ConversationReply =
            serde_json::from_value(json!({"messages": [{"role": "Analyst", "content": "Hi"}]}))
                .unwrap();
        assert_eq!(reply.conversation, vec![Message::from_role("Analyst", "Hi")]);
    }

    #[test]
    fn test_roles_envelope_tolerates_missing_list() {
        let envelope: RolesEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.into_roles().is_empty());
    }
}
