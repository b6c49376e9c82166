//! Application configuration and startup secrets

mod app_config;
mod credentials;

pub use app_config::{
    AppConfig, LogFormat, LoggingConfig, ServerConfig, SimulationConfig, StreamConfig,
    UpstreamConfig,
};
pub use credentials::{AuthSecrets, AzureCredentials, GraphCredentials, ProviderCredentials};
