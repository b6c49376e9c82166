use serde::{Deserialize, Serialize};

use super::event::now_millis;
use crate::domain::{DomainError, ProviderId};

/// Outcome of one provider's complete (non-streaming) call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub service: ProviderId,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
}

impl AggregateResult {
    pub fn success(service: ProviderId, response: impl Into<String>) -> Self {
        Self {
            service,
            response: response.into(),
            error: None,
            timestamp: now_millis(),
        }
    }

    pub fn failure(service: ProviderId, error: &DomainError) -> Self {
        Self {
            service,
            response: String::new(),
            error: Some(error.to_string()),
            timestamp: now_millis(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
