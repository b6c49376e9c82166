//! Fan-out gateway
//!
//! Sends one prompt to several AI chat providers at once and returns either
//! the combined results or a single multiplexed event stream. Each provider
//! runs behind a fallback chain that ends in a local simulator.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use config::ProviderCredentials;
use domain::DomainError;
use infrastructure::llm::{AdapterFactory, HttpClient};

/// Wire the shared HTTP client and the adapter factory into handler state
pub fn create_app_state(
    config: &AppConfig,
    credentials: ProviderCredentials,
) -> Result<AppState, DomainError> {
    let client = HttpClient::with_timeout(config.upstream.timeout())?;

    let factory = AdapterFactory::new(
        client,
        credentials,
        config.upstream.clone(),
        config.simulation.clone(),
    )?;

    Ok(AppState::new(Arc::new(factory), config.stream.clone()))
}
