//! HTTP/JSON boundary to the role and conversation backend.
//!
//! Every request carries a JSON body and `Content-Type: application/json`.
//! Non-2xx responses are failures; a string `detail` field in the error body
//! is kept as the user-facing message.

pub mod client;
pub mod error;
pub mod wire;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
