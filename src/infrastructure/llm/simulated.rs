//! Locally generated replies, the last tier of every provider

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use super::pacing::{characters, paced_fragments, random_between, words, Pacing};
use crate::config::SimulationConfig;
use crate::domain::{DomainError, FallbackTier, FragmentStream, Prompt, ProviderId};

const NAME: &str = "simulated";

/// Subject area of a prompt, used to pick simulated coding advice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Web,
    Python,
    Java,
    Programming,
    General,
}

/// Keyword matcher compiled once and shared across requests
#[derive(Debug)]
pub struct KeywordClassifier {
    code: Regex,
    web: Regex,
    python: Regex,
    java: Regex,
}

impl KeywordClassifier {
    pub fn new() -> Result<Self, DomainError> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| DomainError::internal(format!("Invalid keyword pattern: {}", e)))
        };

        Ok(Self {
            code: compile(r"(?i)code|function|class|method|algorithm|programming|debug|error|syntax")?,
            web: compile(r"(?i)html|css|javascript|react|vue|angular|web|frontend|backend")?,
            python: compile(r"(?i)python|django|flask|pandas|numpy")?,
            java: compile(r"(?i)java|spring|maven|gradle")?,
        })
    }

    /// Language keywords win over the generic coding keywords; web is
    /// checked first so "javascript" is not taken for Java.
    pub fn classify(&self, prompt: &str) -> Topic {
        if self.web.is_match(prompt) {
            Topic::Web
        } else if self.python.is_match(prompt) {
            Topic::Python
        } else if self.java.is_match(prompt) {
            Topic::Java
        } else if self.code.is_match(prompt) {
            Topic::Programming
        } else {
            Topic::General
        }
    }
}

/// Whose voice the simulated reply imitates
#[derive(Debug, Clone)]
pub enum Persona {
    Assistant(ProviderId),
    GitHubCopilot(Arc<KeywordClassifier>),
    MicrosoftCopilot,
}

#[derive(Debug)]
pub struct SimulatedTier {
    persona: Persona,
    simulation: SimulationConfig,
}

impl SimulatedTier {
    pub fn new(persona: Persona, simulation: SimulationConfig) -> Self {
        Self {
            persona,
            simulation,
        }
    }

    fn sections(&self, prompt: &Prompt) -> Vec<String> {
        match &self.persona {
            Persona::Assistant(provider) => vec![assistant_reply(*provider, prompt)],
            Persona::GitHubCopilot(classifier) => {
                github_sections(prompt, classifier.classify(prompt.as_str()))
            }
            Persona::MicrosoftCopilot => vec![microsoft_reply(prompt)],
        }
    }

    async fn think(&self) {
        let delay = random_between(
            std::time::Duration::from_millis(self.simulation.min_latency_ms),
            std::time::Duration::from_millis(self.simulation.max_latency_ms),
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl FallbackTier for SimulatedTier {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError> {
        self.think().await;
        Ok(self.sections(prompt).concat())
    }

    async fn open_stream(&self, prompt: &Prompt) -> Result<FragmentStream, DomainError> {
        let sections = self.sections(prompt);

        let fragments = match self.persona {
            Persona::Assistant(_) => {
                paced_fragments(words(&sections.concat()), Pacing::fragments(&self.simulation))
            }
            Persona::GitHubCopilot(_) => {
                paced_fragments(sections, Pacing::fragments(&self.simulation))
            }
            Persona::MicrosoftCopilot => paced_fragments(
                characters(&sections.concat()),
                Pacing::characters(&self.simulation),
            ),
        };

        Ok(fragments)
    }
}

fn assistant_reply(provider: ProviderId, prompt: &Prompt) -> String {
    let variable = match provider {
        ProviderId::ChatGpt => "OPENAI_API_KEY",
        ProviderId::DeepSeek => "DEEPSEEK_API_KEY",
        ProviderId::GitHub => "GITHUB_TOKEN",
        ProviderId::Microsoft => "AZURE_OPENAI_API_KEY",
    };

    format!(
        "{name} (simulated): You asked \"{prompt}\". {name} could not be reached, so this reply \
was generated locally. Set {variable} to get real answers from {name}.",
        name = provider.display_name(),
    )
}

fn microsoft_reply(prompt: &Prompt) -> String {
    format!(
        "Microsoft Copilot: Here are some suggestions for your question \"{}\":\n\n\
• Analyze your requirements and context as a whole\n\
• Follow best practices from the Microsoft ecosystem\n\
• Turn the plan into concrete, actionable steps\n\
• Keep security and compliance requirements in mind\n\n\
Configure Azure OpenAI for a more accurate and personal Microsoft Copilot experience. You can \
create an OpenAI resource and get an API key in the Azure portal.",
        prompt
    )
}

fn github_sections(prompt: &Prompt, topic: Topic) -> Vec<String> {
    let advice: &[&str] = match topic {
        Topic::Web => &[
            "Use a modern web framework (React, Vue, Angular)",
            "Follow responsive design principles",
            "Optimize performance and user experience",
            "Check cross-browser compatibility",
        ],
        Topic::Python => &[
            "Follow the PEP 8 style guide",
            "Manage dependencies in a virtual environment",
            "Lean on Python's third-party libraries",
            "Write idiomatic, Pythonic code",
        ],
        Topic::Java => &[
            "Follow the Java coding conventions",
            "Manage the project with Maven or Gradle",
            "Use what the Spring framework offers",
            "Apply suitable design patterns",
        ],
        Topic::Programming => &[
            "Pick a language and framework that fit the problem",
            "Design a clear code structure",
            "Handle errors explicitly",
            "Write maintainable code",
        ],
        Topic::General => &[
            "Pin down the concrete requirements",
            "Research existing solutions",
            "Plan for scalability and maintenance",
            "Ask the community for feedback",
        ],
    };

    let heading = match topic {
        Topic::General => "General suggestions",
        _ => "Implementation suggestions",
    };

    vec![
        "GitHub Copilot analysis (simulated)\n\n".to_string(),
        format!("For your question \"{}\", here are some suggestions:\n\n", prompt),
        bullet_section(heading, advice),
        bullet_section(
            "Development best practices",
            &[
                "Version control: manage code with Git",
                "Code review: collaborate through pull requests",
                "Testing: write unit and integration tests",
                "Documentation: keep project docs current",
                "Continuous integration: set up a CI/CD pipeline",
            ],
        ),
        bullet_section(
            "Learning resources",
            &[
                "GitHub: explore open source projects and examples",
                "Stack Overflow: find answers to technical questions",
                "Official documentation: read the reference guides",
            ],
        ),
        "Note: this is a simulated response. Set GITHUB_TOKEN to search real code on GitHub."
            .to_string(),
    ]
}

fn bullet_section(heading: &str, bullets: &[&str]) -> String {
    let mut section = format!("{}:\n", heading);
    for bullet in bullets {
        section.push_str("• ");
        section.push_str(bullet);
        section.push('\n');
    }
    section.push('\n');
    section
}
