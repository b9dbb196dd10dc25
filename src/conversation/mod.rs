//! Conversation session state, backend seam and controller.

pub mod backend;
pub mod controller;
pub mod session;
pub mod types;

pub use backend::{BackendFuture, ConversationBackend, HttpConversationBackend};
pub use controller::ConversationController;
pub use session::{Session, SessionId, SessionPhase, SharedSession};
pub use types::{ConversationSettings, Message, USER_ROLE};
