use std::fmt;

use crate::domain::DomainError;

/// A user prompt; never empty or whitespace-only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();

        if text.trim().is_empty() {
            return Err(DomainError::validation("Prompt is required"));
        }

        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for Prompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_rejects_blank_text() {
        assert!(Prompt::new("").is_err());
        assert!(Prompt::new("   \n\t").is_err());
    }

    #[test]
    fn test_prompt_keeps_text_verbatim() {
        let prompt = Prompt::new("  hello  ").unwrap();
        assert_eq!(prompt.as_str(), "  hello  ");
    }
}
