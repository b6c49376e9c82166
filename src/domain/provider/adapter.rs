use std::fmt::Debug;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use super::{FallbackChain, Prompt, ProviderId};
use crate::domain::{DomainError, StreamEvent};

/// Lazy, finite, non-restartable sequence of events from one provider.
///
/// A well-behaved producer ends with exactly one terminal event. An `Err`
/// item is an unexpected failure of the producer itself, distinct from a
/// terminal event that reports an error.
pub type ProviderStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, DomainError>> + Send>>;

/// Uniform capability interface over every upstream service
#[async_trait]
pub trait ProviderAdapter: Send + Sync + Debug {
    fn provider(&self) -> ProviderId;

    /// Full response for the prompt, or a classified error
    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError>;

    /// Incremental response for the prompt
    fn stream(&self, prompt: &Prompt) -> ProviderStream;
}

/// Adapter backed by a provider's fallback chain
#[derive(Debug, Clone)]
pub struct ChainedAdapter {
    provider: ProviderId,
    chain: FallbackChain,
}

impl ChainedAdapter {
    pub fn new(provider: ProviderId, chain: FallbackChain) -> Self {
        Self { provider, chain }
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }
}

#[async_trait]
impl ProviderAdapter for ChainedAdapter {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError> {
        self.chain.complete(prompt).await
    }

    fn stream(&self, prompt: &Prompt) -> ProviderStream {
        let provider = self.provider;
        let chain = self.chain.clone();
        let prompt = prompt.clone();

        Box::pin(async_stream::stream! {
            let mut fragments = match chain.open_stream(&prompt).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    yield Ok(StreamEvent::failed(provider, &e));
                    return;
                }
            };

            let mut failure = None;

            while let Some(fragment) = fragments.next().await {
                match fragment {
                    Ok(text) if text.is_empty() => continue,
                    Ok(text) => yield Ok(StreamEvent::fragment(provider, text)),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }

            yield Ok(match failure {
                Some(e) => StreamEvent::failed(provider, &e),
                None => StreamEvent::done(provider),
            });
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::provider::fallback::mock::MockTier;
    use crate::domain::provider::FallbackPolicy;

    fn prompt() -> Prompt {
        Prompt::new("hello").unwrap()
    }

    async fn collect(adapter: &ChainedAdapter) -> Vec<StreamEvent> {
        adapter
            .stream(&prompt())
            .map(|item| item.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_stream_ends_with_single_terminal_event() {
        let adapter = ChainedAdapter::new(
            ProviderId::ChatGpt,
            FallbackChain::new("chatgpt", FallbackPolicy::OnTransient).with_tier(
                MockTier::streaming("openai", vec!["Hel".into(), "".into(), "lo".into()]),
            ),
        );

        let events = collect(&adapter).await;

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].content, "Hel");
        assert_eq!(events[1].content, "lo");
        assert!(events[2].is_terminal());
        assert!(!events[2].is_error());
        assert!(events.iter().all(|e| e.service == ProviderId::ChatGpt));
    }

    #[tokio::test]
    async fn test_stream_open_failure_becomes_terminal_error() {
        let adapter = ChainedAdapter::new(
            ProviderId::DeepSeek,
            FallbackChain::new("deepseek", FallbackPolicy::OnTransient).with_tier(
                MockTier::failing("deepseek", DomainError::upstream("deepseek", 402, "")),
            ),
        );

        let events = collect(&adapter).await;

        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
        assert!(events[0].error.as_deref().unwrap().contains("payment required"));
    }

    #[tokio::test]
    async fn test_complete_delegates_to_chain() {
        let adapter = ChainedAdapter::new(
            ProviderId::GitHub,
            FallbackChain::new("github", FallbackPolicy::OnAnyError)
                .with_tier(MockTier::failing("search", DomainError::configuration("no token")))
                .with_tier(MockTier::succeeding("simulated", "tips")),
        );

        assert_eq!(adapter.complete(&prompt()).await.unwrap(), "tips");
    }

    #[tokio::test]
    async fn test_complete_is_repeatable() {
        let adapter = ChainedAdapter::new(
            ProviderId::ChatGpt,
            FallbackChain::new("chatgpt", FallbackPolicy::OnTransient)
                .with_tier(MockTier::succeeding("openai", "same answer")),
        );

        let first = adapter.complete(&prompt()).await.unwrap();
        let second = adapter.complete(&prompt()).await.unwrap();
        assert_eq!(first, second);
    }
}
