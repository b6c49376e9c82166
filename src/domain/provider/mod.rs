//! Provider identities, prompts, adapters and fallback chains

mod adapter;
mod fallback;
mod id;
mod prompt;
mod source;

pub use adapter::{ChainedAdapter, ProviderAdapter, ProviderStream};
pub use fallback::{FallbackChain, FallbackPolicy, FallbackTier, FragmentStream};
pub use id::{ProviderId, ProviderSelection};
pub use prompt::Prompt;
pub use source::{AdapterSource, ProviderStatus};

#[cfg(test)]
pub use adapter::mock::MockAdapter;
#[cfg(test)]
pub use fallback::mock::MockTier;
#[cfg(test)]
pub use source::mock::MockAdapterSource;
