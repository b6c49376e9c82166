//! Domain layer - provider abstractions and the fan-out core

pub mod chat;
pub mod error;
pub mod provider;

pub use chat::{aggregate, multiplex, now_millis, AggregateResult, MultiplexedStream, StreamEvent};
pub use error::{DomainError, UpstreamCategory};
pub use provider::{
    AdapterSource, ChainedAdapter, FallbackChain, FallbackPolicy, FallbackTier, FragmentStream,
    Prompt, ProviderAdapter, ProviderId, ProviderSelection, ProviderStatus, ProviderStream,
};

#[cfg(test)]
pub use provider::{MockAdapter, MockAdapterSource, MockTier};
