use std::fmt::Debug;
use std::sync::Arc;

use serde::Serialize;

use super::{FallbackChain, ProviderAdapter, ProviderId};

/// Readiness of one provider's fallback chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub provider: ProviderId,
    /// First tier with credentials present
    pub primary_tier: Option<&'static str>,
    pub tiers: Vec<&'static str>,
    /// Only the last-resort tier is usable
    pub degraded: bool,
}

impl ProviderStatus {
    pub fn from_chain(provider: ProviderId, chain: &FallbackChain) -> Self {
        let tiers = chain.tier_names();
        let primary_tier = chain.primary_tier();
        let degraded = tiers.len() > 1 && primary_tier == tiers.last().copied();

        Self {
            provider,
            primary_tier,
            tiers,
            degraded,
        }
    }
}

/// Hands out fresh adapters for each request
pub trait AdapterSource: Send + Sync + Debug {
    /// One adapter per provider, in the order given
    fn adapters_for(&self, providers: &[ProviderId]) -> Vec<Arc<dyn ProviderAdapter>>;

    fn describe(&self) -> Vec<ProviderStatus>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::provider::{FallbackPolicy, MockTier};
    use crate::domain::DomainError;

    #[test]
    fn test_status_of_fully_configured_chain() {
        let chain = FallbackChain::new("chatgpt", FallbackPolicy::OnTransient)
            .with_tier(MockTier::succeeding("openai", "x"))
            .with_tier(MockTier::succeeding("simulated", "y"));

        let status = ProviderStatus::from_chain(ProviderId::ChatGpt, &chain);

        assert_eq!(status.primary_tier, Some("openai"));
        assert_eq!(status.tiers, vec!["openai", "simulated"]);
        assert!(!status.degraded);
    }

    #[test]
    fn test_status_degraded_to_last_tier() {
        let chain = FallbackChain::new("microsoft", FallbackPolicy::OnAnyError)
            .with_tier(MockTier::failing("azure-openai", DomainError::configuration("no key")))
            .with_tier(MockTier::failing("microsoft-graph", DomainError::configuration("no app")))
            .with_tier(MockTier::succeeding("simulated", "y"));

        let status = ProviderStatus::from_chain(ProviderId::Microsoft, &chain);

        assert_eq!(status.primary_tier, Some("simulated"));
        assert!(status.degraded);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["provider"], "Microsoft Copilot");
        assert_eq!(json["primaryTier"], "simulated");
    }
}
