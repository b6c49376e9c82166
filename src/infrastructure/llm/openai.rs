use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use super::streaming::delta_fragments;
use crate::config::UpstreamConfig;
use crate::domain::{DomainError, FallbackTier, FragmentStream, Prompt};

/// Returned when an upstream answers with an empty message
pub(super) const EMPTY_COMPLETION: &str = "No response generated";

/// Chat-completions tier for OpenAI and API-compatible services (DeepSeek)
pub struct OpenAiCompatibleTier<C: HttpClientTrait> {
    name: &'static str,
    client: C,
    auth_header: Option<String>,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl<C: HttpClientTrait> std::fmt::Debug for OpenAiCompatibleTier<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleTier")
            .field("name", &self.name)
            .field("auth_header", &self.auth_header.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl<C: HttpClientTrait> OpenAiCompatibleTier<C> {
    pub fn openai(client: C, api_key: Option<String>, upstream: &UpstreamConfig) -> Self {
        Self::new(
            "openai",
            client,
            api_key,
            &upstream.openai_base_url,
            &upstream.openai_model,
            upstream,
        )
    }

    pub fn deepseek(client: C, api_key: Option<String>, upstream: &UpstreamConfig) -> Self {
        Self::new(
            "deepseek",
            client,
            api_key,
            &upstream.deepseek_base_url,
            &upstream.deepseek_model,
            upstream,
        )
    }

    fn new(
        name: &'static str,
        client: C,
        api_key: Option<String>,
        base_url: &str,
        model: &str,
        upstream: &UpstreamConfig,
    ) -> Self {
        Self {
            name,
            client,
            auth_header: api_key.map(|key| format!("Bearer {}", key)),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens: upstream.max_tokens,
            temperature: upstream.temperature,
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, prompt: &Prompt, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [ChatMessage::user(prompt)],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": stream,
        })
    }

    fn headers(&self) -> Result<Vec<(&str, &str)>, DomainError> {
        let auth = self.auth_header.as_deref().ok_or_else(|| {
            DomainError::configuration(format!("{} API key is not configured", self.name))
        })?;

        Ok(vec![
            ("Authorization", auth),
            ("Content-Type", "application/json"),
        ])
    }
}

#[async_trait]
impl<C: HttpClientTrait> FallbackTier for OpenAiCompatibleTier<C> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_configured(&self) -> bool {
        self.auth_header.is_some()
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError> {
        let headers = self.headers()?;
        let body = self.build_request(prompt, false);

        let response = self
            .client
            .post_json(&self.chat_completions_url(), headers, &body)
            .await
            .map_err(|e| e.attributed_to(self.name))?;

        parse_completion(self.name, response)
    }

    async fn open_stream(&self, prompt: &Prompt) -> Result<FragmentStream, DomainError> {
        let headers = self.headers()?;
        let body = self.build_request(prompt, true);

        let bytes = self
            .client
            .post_json_stream(&self.chat_completions_url(), headers, &body)
            .await
            .map_err(|e| e.attributed_to(self.name))?;

        Ok(delta_fragments(self.name, bytes))
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatMessage<'a> {
    pub(super) fn system(content: &'a str) -> Self {
        Self {
            role: "system",
            content,
        }
    }

    pub(super) fn user(prompt: &'a Prompt) -> Self {
        Self {
            role: "user",
            content: prompt.as_str(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Text of the first choice of a chat-completions response
pub(super) fn parse_completion(
    name: &'static str,
    json: serde_json::Value,
) -> Result<String, DomainError> {
    let response: CompletionResponse = serde_json::from_value(json).map_err(|e| {
        DomainError::transport(name, format!("Failed to parse response: {}", e))
    })?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .unwrap_or_else(|| EMPTY_COMPLETION.to_string());

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UpstreamCategory;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use bytes::Bytes;
    use futures::StreamExt;

    const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
    const DEEPSEEK_URL: &str = "https://api.deepseek.com/v1/chat/completions";

    fn prompt() -> Prompt {
        Prompt::new("Hello!").unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-123",
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn test_openai_complete() {
        let client = MockHttpClient::new().with_response(OPENAI_URL, completion("Hi there"));
        let tier = OpenAiCompatibleTier::openai(
            client.clone(),
            Some("sk-test".to_string()),
            &UpstreamConfig::default(),
        );

        let text = tier.complete(&prompt()).await.unwrap();
        assert_eq!(text, "Hi there");

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].header("Authorization"), Some("Bearer sk-test"));

        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello!");
    }

    #[tokio::test]
    async fn test_deepseek_uses_its_own_endpoint_and_model() {
        let client = MockHttpClient::new().with_response(DEEPSEEK_URL, completion("你好"));
        let tier = OpenAiCompatibleTier::deepseek(
            client.clone(),
            Some("ds-key".to_string()),
            &UpstreamConfig::default(),
        );

        assert_eq!(tier.complete(&prompt()).await.unwrap(), "你好");
        assert_eq!(client.requests()[0].body.as_ref().unwrap()["model"], "deepseek-chat");
    }

    #[tokio::test]
    async fn test_missing_key_is_a_configuration_error() {
        let client = MockHttpClient::new();
        let tier = OpenAiCompatibleTier::openai(client.clone(), None, &UpstreamConfig::default());

        assert!(!tier.is_configured());
        let error = tier.complete(&prompt()).await.unwrap_err();
        assert!(error.is_configuration());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_status_is_attributed() {
        let client = MockHttpClient::new().with_status(DEEPSEEK_URL, 402, "Insufficient Balance");
        let tier = OpenAiCompatibleTier::deepseek(
            client,
            Some("ds-key".to_string()),
            &UpstreamConfig::default(),
        );

        let error = tier.complete(&prompt()).await.unwrap_err();
        assert_eq!(error.upstream_category(), Some(UpstreamCategory::PaymentRequired));
        assert_eq!(
            error.to_string(),
            "deepseek payment required (HTTP 402): Insufficient Balance"
        );
    }

    #[tokio::test]
    async fn test_empty_content_gets_placeholder() {
        let client = MockHttpClient::new()
            .with_response(OPENAI_URL, serde_json::json!({ "choices": [] }));
        let tier = OpenAiCompatibleTier::openai(
            client,
            Some("sk-test".to_string()),
            &UpstreamConfig::default(),
        );

        assert_eq!(tier.complete(&prompt()).await.unwrap(), EMPTY_COMPLETION);
    }

    #[tokio::test]
    async fn test_open_stream_yields_deltas() {
        let client = MockHttpClient::new().with_stream_response(
            OPENAI_URL,
            vec![
                Bytes::from("data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n"),
                Bytes::from("data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n"),
            ],
        );
        let tier = OpenAiCompatibleTier::openai(
            client.clone(),
            Some("sk-test".to_string()),
            &UpstreamConfig::default(),
        );

        let fragments: Vec<String> = tier
            .open_stream(&prompt())
            .await
            .unwrap()
            .map(|f| f.unwrap())
            .collect()
            .await;

        assert_eq!(fragments, vec!["Hel", "lo"]);
        assert_eq!(client.requests()[0].body.as_ref().unwrap()["stream"], true);
    }

    #[tokio::test]
    async fn test_custom_base_url_trailing_slash() {
        let upstream = UpstreamConfig {
            openai_base_url: "http://localhost:9000/".to_string(),
            ..UpstreamConfig::default()
        };
        let client = MockHttpClient::new()
            .with_response("http://localhost:9000/v1/chat/completions", completion("local"));
        let tier = OpenAiCompatibleTier::openai(client, Some("k".to_string()), &upstream);

        assert_eq!(tier.complete(&prompt()).await.unwrap(), "local");
    }

    #[test]
    fn test_debug_output_hides_api_key() {
        let tier = OpenAiCompatibleTier::openai(
            MockHttpClient::new(),
            Some("sk-live-openai".to_string()),
            &UpstreamConfig::default(),
        );

        let rendered = format!("{tier:?}");

        assert!(!rendered.contains("sk-live-openai"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("api.openai.com"));
    }
}
