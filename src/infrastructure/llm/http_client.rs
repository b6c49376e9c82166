use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::domain::DomainError;

/// Stream type for HTTP responses
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, DomainError>> + Send>>;

/// Label used on errors until a tier attributes them to itself
const HTTP: &str = "http";

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError>;

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, DomainError>;

    async fn get_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
    ) -> Result<serde_json::Value, DomainError>;

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<serde_json::Value, DomainError>;
}

/// Real HTTP client using reqwest.
///
/// `timeout` bounds connecting and every non-streaming request. For streams
/// it bounds the response head and then each gap between body chunks, so a
/// long answer that keeps flowing is never cut off.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| DomainError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        headers: Vec<(&str, &str)>,
    ) -> Result<reqwest::Response, DomainError> {
        let mut request = request;

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(request_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_body = response.text().await.unwrap_or_default();
            return Err(DomainError::upstream(HTTP, status, error_body));
        }

        Ok(response)
    }

    async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, DomainError> {
        response
            .json()
            .await
            .map_err(|e| DomainError::transport(HTTP, format!("Failed to parse response: {}", e)))
    }
}

fn request_error(e: reqwest::Error) -> DomainError {
    if e.is_timeout() {
        DomainError::transport(HTTP, "Request timed out")
    } else {
        DomainError::transport(HTTP, format!("Request failed: {}", e))
    }
}

fn stream_error(e: reqwest::Error) -> DomainError {
    if e.is_timeout() {
        DomainError::transport(HTTP, "Stream timed out")
    } else {
        DomainError::transport(HTTP, format!("Stream error: {}", e))
    }
}

/// Ends the stream with an error once no chunk arrives for `idle`
fn idle_bounded<S>(body: S, idle: Duration) -> ByteStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut body = Box::pin(body);

        loop {
            match tokio::time::timeout(idle, body.next()).await {
                Ok(Some(Ok(chunk))) => yield Ok(chunk),
                Ok(Some(Err(e))) => {
                    yield Err(stream_error(e));
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    yield Err(DomainError::transport(
                        HTTP,
                        format!("Stream stalled for {} ms", idle.as_millis()),
                    ));
                    break;
                }
            }
        }
    })
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError> {
        let request = self.client.post(url).timeout(self.timeout).json(body);
        let response = self.send(request, headers).await?;
        Self::read_json(response).await
    }

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<ByteStream, DomainError> {
        let response = tokio::time::timeout(
            self.timeout,
            self.send(self.client.post(url).json(body), headers),
        )
        .await
        .map_err(|_| DomainError::transport(HTTP, "Request timed out"))??;

        Ok(idle_bounded(response.bytes_stream(), self.timeout))
    }

    async fn get_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
    ) -> Result<serde_json::Value, DomainError> {
        let response = self.send(self.client.get(url).timeout(self.timeout), headers).await?;
        Self::read_json(response).await
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<serde_json::Value, DomainError> {
        let request = self.client.post(url).timeout(self.timeout).form(form);
        let response = self.send(request, Vec::new()).await?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use futures::stream;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    /// A request seen by the mock
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub body: Option<serde_json::Value>,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    /// Cloneable mock; clones share their canned responses and request log
    #[derive(Debug, Clone, Default)]
    pub struct MockHttpClient {
        responses: Arc<RwLock<HashMap<String, serde_json::Value>>>,
        stream_responses: Arc<RwLock<HashMap<String, Vec<Result<Bytes, DomainError>>>>>,
        errors: Arc<RwLock<HashMap<String, DomainError>>>,
        requests: Arc<RwLock<Vec<RecordedRequest>>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, url: impl Into<String>, response: serde_json::Value) -> Self {
            self.responses.write().unwrap().insert(url.into(), response);
            self
        }

        pub fn with_stream_response(self, url: impl Into<String>, chunks: Vec<Bytes>) -> Self {
            self.stream_responses
                .write()
                .unwrap()
                .insert(url.into(), chunks.into_iter().map(Ok).collect());
            self
        }

        /// Stream that yields `chunks` and then fails with `error`
        pub fn with_broken_stream(
            self,
            url: impl Into<String>,
            chunks: Vec<Bytes>,
            error: DomainError,
        ) -> Self {
            let mut items: Vec<Result<Bytes, DomainError>> = chunks.into_iter().map(Ok).collect();
            items.push(Err(error));
            self.stream_responses.write().unwrap().insert(url.into(), items);
            self
        }

        pub fn with_error(self, url: impl Into<String>, error: impl Into<String>) -> Self {
            self.with_domain_error(url, DomainError::transport(HTTP, error))
        }

        pub fn with_status(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
            self.with_domain_error(url, DomainError::upstream(HTTP, status, body))
        }

        pub fn with_domain_error(self, url: impl Into<String>, error: DomainError) -> Self {
            self.errors.write().unwrap().insert(url.into(), error);
            self
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.read().unwrap().clone()
        }

        fn record(&self, url: &str, headers: &[(&str, &str)], body: Option<&serde_json::Value>) {
            self.requests.write().unwrap().push(RecordedRequest {
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: body.cloned(),
            });
        }

        fn check_error(&self, url: &str) -> Result<(), DomainError> {
            match self.errors.read().unwrap().get(url) {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        fn canned(&self, url: &str) -> Result<serde_json::Value, DomainError> {
            self.check_error(url)?;
            self.responses
                .read()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| DomainError::transport(HTTP, format!("No mock response for {}", url)))
        }
    }

    #[async_trait]
    impl HttpClientTrait for MockHttpClient {
        async fn post_json(
            &self,
            url: &str,
            headers: Vec<(&str, &str)>,
            body: &serde_json::Value,
        ) -> Result<serde_json::Value, DomainError> {
            self.record(url, &headers, Some(body));
            self.canned(url)
        }

        async fn post_json_stream(
            &self,
            url: &str,
            headers: Vec<(&str, &str)>,
            body: &serde_json::Value,
        ) -> Result<ByteStream, DomainError> {
            self.record(url, &headers, Some(body));
            self.check_error(url)?;

            let chunks = self
                .stream_responses
                .read()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| DomainError::transport(HTTP, format!("No mock stream for {}", url)))?;

            Ok(Box::pin(stream::iter(chunks)))
        }

        async fn get_json(
            &self,
            url: &str,
            headers: Vec<(&str, &str)>,
        ) -> Result<serde_json::Value, DomainError> {
            self.record(url, &headers, None);
            self.canned(url)
        }

        async fn post_form(
            &self,
            url: &str,
            form: &[(&str, &str)],
        ) -> Result<serde_json::Value, DomainError> {
            let body = serde_json::json!(form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>());
            self.record(url, &[], Some(&body));
            self.canned(url)
        }
    }
}
