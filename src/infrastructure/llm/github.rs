use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use super::http_client::HttpClientTrait;
use super::pacing::{paced_fragments, Pacing};
use crate::domain::{DomainError, FallbackTier, FragmentStream, Prompt};

const NAME: &str = "github-search";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const SHOWN_RESULTS: usize = 3;

/// Code search on the GitHub REST API, rendered into coding advice
pub struct GitHubSearchTier<C: HttpClientTrait> {
    client: C,
    auth_header: Option<String>,
    api_url: String,
    pacing: Pacing,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    name: String,
    path: String,
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: String,
    language: Option<String>,
}

impl<C: HttpClientTrait> std::fmt::Debug for GitHubSearchTier<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubSearchTier")
            .field("auth_header", &self.auth_header.as_ref().map(|_| "[REDACTED]"))
            .field("api_url", &self.api_url)
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}

impl<C: HttpClientTrait> GitHubSearchTier<C> {
    pub fn new(client: C, token: Option<String>, api_url: &str, pacing: Pacing) -> Self {
        Self {
            client,
            auth_header: token.map(|t| format!("Bearer {}", t)),
            api_url: api_url.trim_end_matches('/').to_string(),
            pacing,
        }
    }

    fn search_url(&self, prompt: &Prompt) -> Result<Url, DomainError> {
        Url::parse_with_params(
            &format!("{}/search/code", self.api_url),
            &[
                ("q", prompt.as_str()),
                ("sort", "indexed"),
                ("order", "desc"),
                ("per_page", "5"),
            ],
        )
        .map_err(|e| DomainError::configuration(format!("Invalid GitHub API URL: {}", e)))
    }

    async fn search(&self, prompt: &Prompt) -> Result<Vec<String>, DomainError> {
        let auth = self
            .auth_header
            .as_deref()
            .ok_or_else(|| DomainError::configuration("GitHub token is not configured"))?;

        let url = self.search_url(prompt)?;
        let headers = vec![
            ("Authorization", auth),
            ("Accept", "application/vnd.github.v3+json"),
            ("User-Agent", USER_AGENT),
        ];

        let response = self
            .client
            .get_json(url.as_str(), headers)
            .await
            .map_err(|e| e.attributed_to(NAME))?;

        let results: SearchResults = serde_json::from_value(response).map_err(|e| {
            DomainError::transport(NAME, format!("Failed to parse search results: {}", e))
        })?;

        Ok(render_sections(prompt, &results))
    }
}

fn render_sections(prompt: &Prompt, results: &SearchResults) -> Vec<String> {
    let mut sections = vec![format!(
        "GitHub Copilot code analysis for \"{}\": found {} related results.\n\n",
        prompt, results.total_count
    )];

    if results.items.is_empty() {
        sections.push(
            "No directly related code examples were found. General suggestions:\n\
• Use clear names for variables and functions\n\
• Write modular, reusable code\n\
• Comment complex logic\n\
• Consider performance and security\n\
• Add unit tests to protect quality\n\n"
                .to_string(),
        );
    } else {
        sections.push("Related code examples:\n\n".to_string());

        for (index, item) in results.items.iter().take(SHOWN_RESULTS).enumerate() {
            sections.push(format!(
                "{}. {} ({})\n   Language: {}\n   Path: {}\n\n",
                index + 1,
                item.name,
                item.repository.full_name,
                item.repository.language.as_deref().unwrap_or("Unknown"),
                item.path
            ));
        }

        sections.push(
            "Suggestions:\n\
• Read the examples above for implementation ideas\n\
• Keep the code readable and maintainable\n\
• Follow the conventions of your language\n\
• Add error handling and tests\n\n"
                .to_string(),
        );
    }

    let more = Url::parse_with_params(
        "https://github.com/search",
        &[("q", prompt.as_str()), ("type", "code")],
    )
    .map(String::from)
    .unwrap_or_else(|_| "https://github.com/search".to_string());

    sections.push(format!(
        "GitHub resources:\n• More examples: {}\n• GitHub Docs: https://docs.github.com\n\
• GitHub Community: https://github.community\n",
        more
    ));

    sections
}

#[async_trait]
impl<C: HttpClientTrait> FallbackTier for GitHubSearchTier<C> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_configured(&self) -> bool {
        self.auth_header.is_some()
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError> {
        Ok(self.search(prompt).await?.concat())
    }

    async fn open_stream(&self, prompt: &Prompt) -> Result<FragmentStream, DomainError> {
        let sections = self.search(prompt).await?;
        Ok(paced_fragments(sections, self.pacing))
    }
}
