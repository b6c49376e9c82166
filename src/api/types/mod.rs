//! Wire types of the HTTP API

pub mod chat;
pub mod error;
pub mod json;

pub use chat::{BatchResponse, ChatRequest};
pub use error::{ApiError, ApiErrorResponse};
pub use json::Json;
