//! Role roster: types and the registry client.

pub mod registry;
pub mod types;

pub use registry::RoleRegistry;
pub use types::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, Role};
