use std::fmt::Debug;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, Stream};
use tracing::{debug, warn};

use super::Prompt;
use crate::domain::DomainError;

/// Incremental text fragments produced by a single tier.
///
/// A clean end of the stream means the tier finished; an `Err` item is a
/// failure after the stream was opened.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, DomainError>> + Send>>;

/// One stage in a provider's ordered sequence of degrading strategies
#[async_trait]
pub trait FallbackTier: Send + Sync + Debug {
    /// Short tier name used in logs and readiness reports
    fn name(&self) -> &'static str;

    /// Whether the credentials this tier needs are present
    fn is_configured(&self) -> bool {
        true
    }

    /// Produce a full response for the prompt
    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError>;

    /// Open an incremental response. Tiers without a native streaming
    /// protocol emit their full response as a single fragment.
    async fn open_stream(&self, prompt: &Prompt) -> Result<FragmentStream, DomainError> {
        let text = self.complete(prompt).await?;
        Ok(Box::pin(stream::once(async move { Ok(text) })))
    }
}

/// When a failed tier hands over to the next one.
///
/// Missing credentials always hand over, regardless of policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Only transport failures, timeouts, 5xx and rate limiting
    OnTransient,
    /// Any failure
    OnAnyError,
}

impl FallbackPolicy {
    fn allows(&self, error: &DomainError) -> bool {
        match self {
            Self::OnTransient => error.is_transient(),
            Self::OnAnyError => true,
        }
    }
}

/// Ordered list of tiers tried in sequence, stopping at the first success
#[derive(Debug, Clone)]
pub struct FallbackChain {
    label: &'static str,
    policy: FallbackPolicy,
    tiers: Vec<Arc<dyn FallbackTier>>,
}

impl FallbackChain {
    pub fn new(label: &'static str, policy: FallbackPolicy) -> Self {
        Self {
            label,
            policy,
            tiers: Vec::new(),
        }
    }

    pub fn with_tier(self, tier: impl FallbackTier + 'static) -> Self {
        self.with_shared_tier(Arc::new(tier))
    }

    pub fn with_shared_tier(mut self, tier: Arc<dyn FallbackTier>) -> Self {
        self.tiers.push(tier);
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// First tier whose credentials are present
    pub fn primary_tier(&self) -> Option<&'static str> {
        self.tiers.iter().find(|t| t.is_configured()).map(|t| t.name())
    }

    /// Run `complete` down the chain
    pub async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError> {
        let mut outcome = ChainOutcome::default();

        for tier in &self.tiers {
            match tier.complete(prompt).await {
                Ok(text) => {
                    debug!(chain = self.label, tier = tier.name(), "Tier produced a response");
                    return Ok(text);
                }
                Err(e) => self.record_failure(tier.name(), e, &mut outcome)?,
            }
        }

        Err(outcome.into_error(self.label))
    }

    /// Open a fragment stream from the first tier that manages to start one.
    ///
    /// Handover only happens while opening; failures after the stream has
    /// been returned belong to the caller.
    pub async fn open_stream(&self, prompt: &Prompt) -> Result<FragmentStream, DomainError> {
        let mut outcome = ChainOutcome::default();

        for tier in &self.tiers {
            match tier.open_stream(prompt).await {
                Ok(fragments) => {
                    debug!(chain = self.label, tier = tier.name(), "Tier opened a stream");
                    return Ok(fragments);
                }
                Err(e) => self.record_failure(tier.name(), e, &mut outcome)?,
            }
        }

        Err(outcome.into_error(self.label))
    }

    /// Decide whether `error` lets the chain continue; returns it otherwise
    fn record_failure(
        &self,
        tier: &'static str,
        error: DomainError,
        outcome: &mut ChainOutcome,
    ) -> Result<(), DomainError> {
        if error.is_configuration() {
            debug!(chain = self.label, tier, "Tier not configured, skipping");
            outcome.unconfigured.get_or_insert(error);
            return Ok(());
        }

        if self.policy.allows(&error) {
            warn!(chain = self.label, tier, error = %error, "Tier failed, falling back");
            outcome.last_attempted = Some(error);
            return Ok(());
        }

        warn!(chain = self.label, tier, error = %error, "Tier failed");
        Err(error)
    }
}

#[derive(Default)]
struct ChainOutcome {
    last_attempted: Option<DomainError>,
    unconfigured: Option<DomainError>,
}

impl ChainOutcome {
    fn into_error(self, label: &str) -> DomainError {
        self.last_attempted
            .or(self.unconfigured)
            .unwrap_or_else(|| DomainError::configuration(format!("{} has no tiers", label)))
    }
}
