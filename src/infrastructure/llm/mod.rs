//! Upstream AI services and the fallback tiers built on them

mod azure_openai;
mod factory;
mod github;
mod http_client;
mod microsoft_graph;
mod openai;
mod pacing;
mod simulated;
mod streaming;

pub use azure_openai::AzureOpenAiTier;
pub use factory::AdapterFactory;
pub use github::GitHubSearchTier;
pub use http_client::{ByteStream, HttpClient, HttpClientTrait};
pub use microsoft_graph::MicrosoftGraphTier;
pub use openai::OpenAiCompatibleTier;
pub use pacing::Pacing;
pub use simulated::{KeywordClassifier, Persona, SimulatedTier, Topic};
