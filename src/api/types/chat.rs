//! Request and response bodies of the chat endpoints

use serde::{Deserialize, Serialize};

use crate::domain::{AggregateResult, ProviderSelection};

/// Body of `POST /chat` and `POST /chat/stream`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub selected_services: ProviderSelection,
}

/// Body of a successful `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub results: Vec<AggregateResult>,
    pub timestamp: i64,
}
