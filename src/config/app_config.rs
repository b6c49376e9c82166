use std::time::Duration;

use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Settings for calls to the upstream AI services
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub openai_base_url: String,
    pub openai_model: String,
    pub deepseek_base_url: String,
    pub deepseek_model: String,
    pub azure_api_version: String,
    pub microsoft_login_url: String,
    pub microsoft_graph_url: String,
}

/// Pacing of the locally simulated replies
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub fragment_delay_ms: u64,
    pub char_delay_min_ms: u64,
    pub char_delay_max_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Events buffered between the multiplexer task and the response body
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_tokens: 1000,
            temperature: 0.7,
            openai_base_url: "https://api.openai.com".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            deepseek_base_url: "https://api.deepseek.com".to_string(),
            deepseek_model: "deepseek-chat".to_string(),
            azure_api_version: "2024-02-15-preview".to_string(),
            microsoft_login_url: "https://login.microsoftonline.com".to_string(),
            microsoft_graph_url: "https://graph.microsoft.com".to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_latency_ms: 1000,
            max_latency_ms: 3000,
            fragment_delay_ms: 50,
            char_delay_min_ms: 25,
            char_delay_max_ms: 50,
        }
    }
}

impl SimulationConfig {
    /// No artificial delays at all
    pub fn instant() -> Self {
        Self {
            min_latency_ms: 0,
            max_latency_ms: 0,
            fragment_delay_ms: 0,
            char_delay_min_ms: 0,
            char_delay_max_ms: 0,
        }
    }

    pub fn fragment_delay(&self) -> Duration {
        Duration::from_millis(self.fragment_delay_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 32,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
