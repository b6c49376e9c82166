use std::fmt;

use thiserror::Error;

/// Classification of a non-2xx upstream HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamCategory {
    Authentication,
    PaymentRequired,
    RateLimited,
    NotFound,
    Other,
}

impl UpstreamCategory {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            402 => Self::PaymentRequired,
            403 | 429 => Self::RateLimited,
            404 => Self::NotFound,
            _ => Self::Other,
        }
    }

    /// Human-readable label shown to users on a failed provider card
    pub fn label(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication error",
            Self::PaymentRequired => "payment required",
            Self::RateLimited => "rate limit exceeded",
            Self::NotFound => "not found",
            Self::Other => "API error",
        }
    }
}

impl fmt::Display for UpstreamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Core domain errors
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("{provider} {category} (HTTP {status}): {message}")]
    Upstream {
        provider: String,
        status: u16,
        category: UpstreamCategory,
        message: String,
    },

    #[error("{provider} transport error: {message}")]
    Transport { provider: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn upstream(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider: provider.into(),
            status,
            category: UpstreamCategory::from_status(status),
            message: message.into(),
        }
    }

    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Re-label an upstream or transport error with the provider that caused it.
    ///
    /// The shared HTTP client only knows URLs, so tiers call this to put their
    /// own name on the errors it returns.
    pub fn attributed_to(self, name: &str) -> Self {
        match self {
            Self::Upstream {
                status,
                category,
                message,
                ..
            } => Self::Upstream {
                provider: name.to_string(),
                status,
                category,
                message,
            },
            Self::Transport { message, .. } => Self::Transport {
                provider: name.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Whether a retry against a different tier could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Upstream {
                status, category, ..
            } => *status >= 500 || *category == UpstreamCategory::RateLimited,
            _ => false,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn upstream_category(&self) -> Option<UpstreamCategory> {
        match self {
            Self::Upstream { category, .. } => Some(*category),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(UpstreamCategory::from_status(401), UpstreamCategory::Authentication);
        assert_eq!(UpstreamCategory::from_status(402), UpstreamCategory::PaymentRequired);
        assert_eq!(UpstreamCategory::from_status(403), UpstreamCategory::RateLimited);
        assert_eq!(UpstreamCategory::from_status(429), UpstreamCategory::RateLimited);
        assert_eq!(UpstreamCategory::from_status(404), UpstreamCategory::NotFound);
        assert_eq!(UpstreamCategory::from_status(500), UpstreamCategory::Other);
        assert_eq!(UpstreamCategory::from_status(422), UpstreamCategory::Other);
    }

    #[test]
    fn test_upstream_error_display() {
        let error = DomainError::upstream("DeepSeek", 402, "insufficient balance");
        assert_eq!(
            error.to_string(),
            "DeepSeek payment required (HTTP 402): insufficient balance"
        );
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("Prompt is required");
        assert_eq!(error.to_string(), "Validation error: Prompt is required");
    }

    #[test]
    fn test_transient_errors() {
        assert!(DomainError::transport("openai", "connection reset").is_transient());
        assert!(DomainError::upstream("openai", 503, "").is_transient());
        assert!(DomainError::upstream("openai", 429, "").is_transient());
        assert!(DomainError::upstream("github", 403, "").is_transient());
        assert!(!DomainError::upstream("openai", 401, "").is_transient());
        assert!(!DomainError::upstream("deepseek", 402, "").is_transient());
        assert!(!DomainError::configuration("missing key").is_transient());
        assert!(!DomainError::internal("bug").is_transient());
    }

    #[test]
    fn test_attributed_to_relabels_provider() {
        let error = DomainError::upstream("http", 404, "no deployment").attributed_to("azure-openai");
        assert!(error.to_string().starts_with("azure-openai not found"));

        let error = DomainError::transport("http", "timed out").attributed_to("github-search");
        assert_eq!(error.to_string(), "github-search transport error: timed out");

        let error = DomainError::internal("x").attributed_to("ignored");
        assert_eq!(error.to_string(), "Internal error: x");
    }
}
