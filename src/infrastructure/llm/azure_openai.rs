use async_trait::async_trait;

use super::http_client::HttpClientTrait;
use super::openai::{parse_completion, ChatMessage};
use super::streaming::delta_fragments;
use crate::config::{AzureCredentials, UpstreamConfig};
use crate::domain::{DomainError, FallbackTier, FragmentStream, Prompt};

const NAME: &str = "azure-openai";

const SYSTEM_PROMPT: &str = "You are Microsoft Copilot, a helpful AI assistant powered by Azure \
OpenAI. Provide comprehensive, accurate, and helpful responses.";

/// Chat completions against an Azure OpenAI deployment
#[derive(Debug)]
pub struct AzureOpenAiTier<C: HttpClientTrait> {
    client: C,
    credentials: Option<AzureCredentials>,
    api_version: String,
    max_tokens: u32,
    temperature: f32,
}

impl<C: HttpClientTrait> AzureOpenAiTier<C> {
    pub fn new(client: C, credentials: Option<AzureCredentials>, upstream: &UpstreamConfig) -> Self {
        Self {
            client,
            credentials,
            api_version: upstream.azure_api_version.clone(),
            max_tokens: upstream.max_tokens,
            temperature: upstream.temperature,
        }
    }

    fn credentials(&self) -> Result<&AzureCredentials, DomainError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| DomainError::configuration("Azure OpenAI endpoint or API key is not configured"))
    }

    fn build_url(credentials: &AzureCredentials, api_version: &str) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            credentials.endpoint.trim_end_matches('/'),
            credentials.deployment,
            api_version
        )
    }

    fn build_request(&self, prompt: &Prompt, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "messages": [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "top_p": 0.95,
            "frequency_penalty": 0,
            "presence_penalty": 0,
            "stream": stream,
        })
    }
}

#[async_trait]
impl<C: HttpClientTrait> FallbackTier for AzureOpenAiTier<C> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError> {
        let credentials = self.credentials()?;
        let url = Self::build_url(credentials, &self.api_version);
        let headers = vec![
            ("api-key", credentials.api_key.as_str()),
            ("Content-Type", "application/json"),
        ];

        let response = self
            .client
            .post_json(&url, headers, &self.build_request(prompt, false))
            .await
            .map_err(|e| e.attributed_to(NAME))?;

        parse_completion(NAME, response)
    }

    async fn open_stream(&self, prompt: &Prompt) -> Result<FragmentStream, DomainError> {
        let credentials = self.credentials()?;
        let url = Self::build_url(credentials, &self.api_version);
        let headers = vec![
            ("api-key", credentials.api_key.as_str()),
            ("Content-Type", "application/json"),
        ];

        let bytes = self
            .client
            .post_json_stream(&url, headers, &self.build_request(prompt, true))
            .await
            .map_err(|e| e.attributed_to(NAME))?;

        Ok(delta_fragments(NAME, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UpstreamCategory;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use bytes::Bytes;
    use futures::StreamExt;

    const URL: &str = "https://res.openai.azure.com/openai/deployments/gpt-35-turbo/chat/completions?api-version=2024-02-15-preview";

    fn credentials() -> AzureCredentials {
        AzureCredentials {
            api_key: "azure-key".to_string(),
            endpoint: "https://res.openai.azure.com/".to_string(),
            deployment: "gpt-35-turbo".to_string(),
        }
    }

    #[tokio::test]
    async fn test_complete_sends_api_key_and_system_message() {
        let client = MockHttpClient::new().with_response(
            URL,
            serde_json::json!({ "choices": [{ "message": { "content": "From Azure" } }] }),
        );
        let tier = AzureOpenAiTier::new(client.clone(), Some(credentials()), &UpstreamConfig::default());

        let text = tier.complete(&Prompt::new("hi").unwrap()).await.unwrap();
        assert_eq!(text, "From Azure");

        let request = &client.requests()[0];
        assert_eq!(request.header("api-key"), Some("azure-key"));
        assert_eq!(request.header("Authorization"), None);

        let body = request.body.as_ref().unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["top_p"], 0.95);
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let tier = AzureOpenAiTier::new(MockHttpClient::new(), None, &UpstreamConfig::default());

        assert!(!tier.is_configured());
        assert!(tier.complete(&Prompt::new("hi").unwrap()).await.unwrap_err().is_configuration());
    }

    #[tokio::test]
    async fn test_missing_deployment() {
        let client = MockHttpClient::new().with_status(URL, 404, "DeploymentNotFound");
        let tier = AzureOpenAiTier::new(client, Some(credentials()), &UpstreamConfig::default());

        let error = tier.complete(&Prompt::new("hi").unwrap()).await.unwrap_err();
        assert_eq!(error.upstream_category(), Some(UpstreamCategory::NotFound));
        assert!(error.to_string().starts_with("azure-openai not found"));
    }

    #[tokio::test]
    async fn test_open_stream_skips_prompt_filter_chunk() {
        let client = MockHttpClient::new().with_stream_response(
            URL,
            vec![
                Bytes::from(
                    "data: {\"choices\":[],\"prompt_filter_results\":[{\"prompt_index\":0,\
\"content_filter_results\":{}}]}\n\n",
                ),
                Bytes::from("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n"),
                Bytes::from("data: {\"choices\":[{\"delta\":{\"content\":\"From \"}}]}\n\n"),
                Bytes::from("data: {\"choices\":[{\"delta\":{\"content\":\"Azure\"}}]}\n\ndata: [DONE]\n\n"),
            ],
        );
        let tier = AzureOpenAiTier::new(client.clone(), Some(credentials()), &UpstreamConfig::default());

        let fragments: Vec<String> = tier
            .open_stream(&Prompt::new("hi").unwrap())
            .await
            .unwrap()
            .map(|f| f.unwrap())
            .collect()
            .await;

        assert_eq!(fragments, vec!["From ", "Azure"]);

        let request = &client.requests()[0];
        assert_eq!(request.url, URL);
        assert_eq!(request.header("api-key"), Some("azure-key"));

        let body = request.body.as_ref().unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn test_open_stream_rate_limited() {
        let client = MockHttpClient::new().with_status(URL, 429, "Rate limit is exceeded");
        let tier = AzureOpenAiTier::new(client, Some(credentials()), &UpstreamConfig::default());

        let error = match tier.open_stream(&Prompt::new("hi").unwrap()).await {
            Ok(_) => panic!("stream should not open"),
            Err(e) => e,
        };
        assert!(error.is_transient());
        assert!(error.to_string().starts_with("azure-openai rate limit exceeded"));
    }
}
