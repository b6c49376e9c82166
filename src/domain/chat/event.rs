use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, ProviderId};

/// Current time as Unix epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One unit of a provider's incremental output.
///
/// Events from different providers interleave freely in a multiplexed
/// stream; consumers accumulate content keyed by `service`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub service: ProviderId,
    pub content: String,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
}

impl StreamEvent {
    /// A content fragment
    pub fn fragment(service: ProviderId, content: impl Into<String>) -> Self {
        Self {
            service,
            content: content.into(),
            done: false,
            error: None,
            timestamp: now_millis(),
        }
    }

    /// Successful terminal event
    pub fn done(service: ProviderId) -> Self {
        Self {
            service,
            content: String::new(),
            done: true,
            error: None,
            timestamp: now_millis(),
        }
    }

    /// Terminal event carrying an error description
    pub fn failed(service: ProviderId, error: &DomainError) -> Self {
        Self {
            service,
            content: String::new(),
            done: true,
            error: Some(error.to_string()),
            timestamp: now_millis(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.done
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
