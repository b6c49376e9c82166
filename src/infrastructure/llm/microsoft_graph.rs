use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::http_client::HttpClientTrait;
use super::pacing::{paced_fragments, words, Pacing};
use crate::config::{GraphCredentials, UpstreamConfig};
use crate::domain::{DomainError, FallbackTier, FragmentStream, Prompt};

const NAME: &str = "microsoft-graph";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Microsoft 365 tier: client-credentials token, then a Graph call that
/// proves the tenant is reachable before answering.
#[derive(Debug)]
pub struct MicrosoftGraphTier<C: HttpClientTrait> {
    client: C,
    credentials: Option<GraphCredentials>,
    login_url: String,
    graph_url: String,
    pacing: Pacing,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl<C: HttpClientTrait> MicrosoftGraphTier<C> {
    pub fn new(
        client: C,
        credentials: Option<GraphCredentials>,
        upstream: &UpstreamConfig,
        pacing: Pacing,
    ) -> Self {
        Self {
            client,
            credentials,
            login_url: upstream.microsoft_login_url.trim_end_matches('/').to_string(),
            graph_url: upstream.microsoft_graph_url.trim_end_matches('/').to_string(),
            pacing,
        }
    }

    fn token_url(&self, tenant_id: &str) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.login_url, tenant_id)
    }

    fn organization_url(&self) -> String {
        format!("{}/v1.0/organization", self.graph_url)
    }

    async fn access_token(&self, credentials: &GraphCredentials) -> Result<String, DomainError> {
        let form = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .client
            .post_form(&self.token_url(&credentials.tenant_id), &form)
            .await
            .map_err(|e| e.attributed_to(NAME))?;

        let token: TokenResponse = serde_json::from_value(response).map_err(|_| {
            DomainError::transport(NAME, "Failed to get Microsoft Graph access token")
        })?;

        Ok(token.access_token)
    }
}

fn render(prompt: &Prompt) -> String {
    format!(
        "Microsoft Copilot (via Microsoft Graph): Based on your question \"{}\", here are some \
suggestions for your Microsoft 365 environment:\n\n\
• Use the integrations between Microsoft 365 applications\n\
• Streamline workflows and collaboration\n\
• Keep data secure and compliant\n\
• Automate repetitive work with Power Platform\n\n\
Note: a complete Microsoft Copilot integration requires the appropriate licenses and configuration.",
        prompt
    )
}

#[async_trait]
impl<C: HttpClientTrait> FallbackTier for MicrosoftGraphTier<C> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            DomainError::configuration("Microsoft Graph client credentials are not configured")
        })?;

        let token = self.access_token(credentials).await?;
        let auth = format!("Bearer {}", token);

        self.client
            .get_json(
                &self.organization_url(),
                vec![("Authorization", auth.as_str()), ("Content-Type", "application/json")],
            )
            .await
            .map_err(|e| e.attributed_to(NAME))?;

        debug!(tier = NAME, "Microsoft Graph reachable");
        Ok(render(prompt))
    }

    async fn open_stream(&self, prompt: &Prompt) -> Result<FragmentStream, DomainError> {
        let text = self.complete(prompt).await?;
        Ok(paced_fragments(words(&text), self.pacing))
    }
}
