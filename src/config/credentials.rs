//! Secrets read once from the process environment at startup

use std::env;

use crate::domain::DomainError;

const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_AZURE_DEPLOYMENT: &str = "gpt-35-turbo";

/// Azure OpenAI deployment credentials
#[derive(Clone, PartialEq, Eq)]
pub struct AzureCredentials {
    pub api_key: String,
    pub endpoint: String,
    pub deployment: String,
}

/// App registration used for the Microsoft Graph client-credentials flow
#[derive(Clone, PartialEq, Eq)]
pub struct GraphCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
}

/// Per-provider credentials; anything absent makes that tier degrade
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub openai_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub azure: Option<AzureCredentials>,
    pub graph: Option<GraphCredentials>,
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "[REDACTED]")
}

impl std::fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .finish()
    }
}

impl std::fmt::Debug for GraphCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("openai_api_key", &redacted(&self.openai_api_key))
            .field("deepseek_api_key", &redacted(&self.deepseek_api_key))
            .field("github_token", &redacted(&self.github_token))
            .field("github_api_url", &self.github_api_url)
            .field("azure", &self.azure)
            .field("graph", &self.graph)
            .finish()
    }
}

impl ProviderCredentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; blank values count as missing
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let azure = match (var("AZURE_OPENAI_API_KEY"), var("AZURE_OPENAI_ENDPOINT")) {
            (Some(api_key), Some(endpoint)) => Some(AzureCredentials {
                api_key,
                endpoint,
                deployment: var("AZURE_OPENAI_DEPLOYMENT_NAME")
                    .unwrap_or_else(|| DEFAULT_AZURE_DEPLOYMENT.to_string()),
            }),
            _ => None,
        };

        let graph = match (
            var("MICROSOFT_CLIENT_ID"),
            var("MICROSOFT_CLIENT_SECRET"),
            var("MICROSOFT_TENANT_ID"),
        ) {
            (Some(client_id), Some(client_secret), Some(tenant_id)) => Some(GraphCredentials {
                client_id,
                client_secret,
                tenant_id,
            }),
            _ => None,
        };

        Self {
            openai_api_key: var("OPENAI_API_KEY"),
            deepseek_api_key: var("DEEPSEEK_API_KEY"),
            github_token: var("GITHUB_TOKEN"),
            github_api_url: var("GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            azure,
            graph,
        }
    }
}

/// Secrets the sign-in collaborator cannot run without
#[derive(Clone)]
pub struct AuthSecrets {
    pub google_client_id: String,
    pub google_client_secret: String,
    pub nextauth_secret: String,
}

impl std::fmt::Debug for AuthSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSecrets")
            .field("google_client_id", &self.google_client_id)
            .field("google_client_secret", &"[REDACTED]")
            .field("nextauth_secret", &"[REDACTED]")
            .finish()
    }
}

impl AuthSecrets {
    pub fn require_from_env() -> Result<Self, DomainError> {
        Self::require_from_lookup(|name| env::var(name).ok())
    }

    /// Fails on the first missing secret
    pub fn require_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DomainError> {
        let require = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| DomainError::configuration(format!("{} is not set", name)))
        };

        Ok(Self {
            google_client_id: require("GOOGLE_CLIENT_ID")?,
            google_client_secret: require("GOOGLE_CLIENT_SECRET")?,
            nextauth_secret: require("NEXTAUTH_SECRET")?,
        })
    }
}
