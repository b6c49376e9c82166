use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Identifier of an upstream AI chat service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "ChatGPT")]
    ChatGpt,
    #[serde(rename = "DeepSeek")]
    DeepSeek,
    #[serde(rename = "GitHub Copilot")]
    GitHub,
    #[serde(rename = "Microsoft Copilot")]
    Microsoft,
}

impl ProviderId {
    /// All providers in canonical order
    pub const ALL: [ProviderId; 4] = [
        ProviderId::ChatGpt,
        ProviderId::DeepSeek,
        ProviderId::GitHub,
        ProviderId::Microsoft,
    ];

    /// Name shown to users and carried in the `service` field on the wire
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPT",
            Self::DeepSeek => "DeepSeek",
            Self::GitHub => "GitHub Copilot",
            Self::Microsoft => "Microsoft Copilot",
        }
    }

    /// Key used in the `selectedServices` request object
    pub fn selection_key(&self) -> &'static str {
        match self {
            Self::ChatGpt => "chatgpt",
            Self::DeepSeek => "deepseek",
            Self::GitHub => "github",
            Self::Microsoft => "microsoft",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();

        ProviderId::ALL
            .into_iter()
            .find(|id| id.selection_key() == needle || id.display_name().to_lowercase() == needle)
            .ok_or_else(|| DomainError::validation(format!("Unknown service '{}'", s)))
    }
}

/// Set of providers the caller wants to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSelection {
    #[serde(default)]
    pub chatgpt: bool,
    #[serde(default)]
    pub deepseek: bool,
    #[serde(default)]
    pub github: bool,
    #[serde(default)]
    pub microsoft: bool,
}

impl ProviderSelection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            chatgpt: true,
            deepseek: true,
            github: true,
            microsoft: true,
        }
    }

    pub fn with(mut self, provider: ProviderId) -> Self {
        match provider {
            ProviderId::ChatGpt => self.chatgpt = true,
            ProviderId::DeepSeek => self.deepseek = true,
            ProviderId::GitHub => self.github = true,
            ProviderId::Microsoft => self.microsoft = true,
        }
        self
    }

    pub fn contains(&self, provider: ProviderId) -> bool {
        match provider {
            ProviderId::ChatGpt => self.chatgpt,
            ProviderId::DeepSeek => self.deepseek,
            ProviderId::GitHub => self.github,
            ProviderId::Microsoft => self.microsoft,
        }
    }

    /// Selected providers in canonical order, without duplicates
    pub fn providers(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.contains(*id))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers().is_empty()
    }
}

impl FromIterator<ProviderId> for ProviderSelection {
    fn from_iter<I: IntoIterator<Item = ProviderId>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ProviderSelection::none(), |selection, id| selection.with(id))
    }
}
