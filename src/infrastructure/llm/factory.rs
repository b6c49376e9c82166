use std::sync::Arc;

use super::azure_openai::AzureOpenAiTier;
use super::github::GitHubSearchTier;
use super::http_client::HttpClientTrait;
use super::microsoft_graph::MicrosoftGraphTier;
use super::openai::OpenAiCompatibleTier;
use super::pacing::Pacing;
use super::simulated::{KeywordClassifier, Persona, SimulatedTier};
use crate::config::{ProviderCredentials, SimulationConfig, UpstreamConfig};
use crate::domain::{
    AdapterSource, ChainedAdapter, DomainError, FallbackChain, FallbackPolicy, ProviderAdapter,
    ProviderId, ProviderStatus,
};

/// Builds a fresh fallback chain per provider for each request
#[derive(Debug)]
pub struct AdapterFactory<C: HttpClientTrait + Clone + 'static> {
    client: C,
    credentials: ProviderCredentials,
    upstream: UpstreamConfig,
    simulation: SimulationConfig,
    classifier: Arc<KeywordClassifier>,
}

impl<C: HttpClientTrait + Clone + 'static> AdapterFactory<C> {
    pub fn new(
        client: C,
        credentials: ProviderCredentials,
        upstream: UpstreamConfig,
        simulation: SimulationConfig,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            client,
            credentials,
            upstream,
            simulation,
            classifier: Arc::new(KeywordClassifier::new()?),
        })
    }

    fn simulated(&self, persona: Persona) -> SimulatedTier {
        SimulatedTier::new(persona, self.simulation.clone())
    }

    /// Tier order and handover policy for one provider
    pub fn chain_for(&self, provider: ProviderId) -> FallbackChain {
        let credentials = &self.credentials;

        match provider {
            ProviderId::ChatGpt => FallbackChain::new("chatgpt", FallbackPolicy::OnTransient)
                .with_tier(OpenAiCompatibleTier::openai(
                    self.client.clone(),
                    credentials.openai_api_key.clone(),
                    &self.upstream,
                ))
                .with_tier(self.simulated(Persona::Assistant(provider))),

            ProviderId::DeepSeek => FallbackChain::new("deepseek", FallbackPolicy::OnTransient)
                .with_tier(OpenAiCompatibleTier::deepseek(
                    self.client.clone(),
                    credentials.deepseek_api_key.clone(),
                    &self.upstream,
                ))
                .with_tier(self.simulated(Persona::Assistant(provider))),

            ProviderId::GitHub => FallbackChain::new("github", FallbackPolicy::OnAnyError)
                .with_tier(GitHubSearchTier::new(
                    self.client.clone(),
                    credentials.github_token.clone(),
                    &credentials.github_api_url,
                    Pacing::fragments(&self.simulation),
                ))
                .with_tier(self.simulated(Persona::GitHubCopilot(self.classifier.clone()))),

            ProviderId::Microsoft => FallbackChain::new("microsoft", FallbackPolicy::OnAnyError)
                .with_tier(AzureOpenAiTier::new(
                    self.client.clone(),
                    credentials.azure.clone(),
                    &self.upstream,
                ))
                .with_tier(MicrosoftGraphTier::new(
                    self.client.clone(),
                    credentials.graph.clone(),
                    &self.upstream,
                    Pacing::fragments(&self.simulation),
                ))
                .with_tier(self.simulated(Persona::MicrosoftCopilot)),
        }
    }
}

impl<C: HttpClientTrait + Clone + 'static> AdapterSource for AdapterFactory<C> {
    fn adapters_for(&self, providers: &[ProviderId]) -> Vec<Arc<dyn ProviderAdapter>> {
        providers
            .iter()
            .map(|provider| {
                Arc::new(ChainedAdapter::new(*provider, self.chain_for(*provider)))
                    as Arc<dyn ProviderAdapter>
            })
            .collect()
    }

    fn describe(&self) -> Vec<ProviderStatus> {
        ProviderId::ALL
            .iter()
            .map(|provider| ProviderStatus::from_chain(*provider, &self.chain_for(*provider)))
            .collect()
    }
}
