use serde::{Deserialize, Serialize};

/// Output language for detection labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// The model's own vocabulary language
    Source,
    /// The alternate language provided by the translation table
    Target,
}

/// Wire codes for the two supported languages, e.g. `en` / `ru`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCodes {
    pub source: String,
    pub target: String,
}

impl Default for LanguageCodes {
    fn default() -> Self {
        Self {
            source: "en".to_string(),
            target: "ru".to_string(),
        }
    }
}

impl LanguageCodes {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Maps a request code onto a [`Language`]; `None` for anything unsupported.
    pub fn parse(&self, code: &str) -> Option<Language> {
        let code = code.trim();
        if code.eq_ignore_ascii_case(&self.source) {
            Some(Language::Source)
        } else if code.eq_ignore_ascii_case(&self.target) {
            Some(Language::Target)
        } else {
            None
        }
    }

    pub fn code(&self, language: Language) -> &str {
        match language {
            Language::Source => &self.source,
            Language::Target => &self.target,
        }
    }

    pub fn supported(&self) -> [&str; 2] {
        [&self.source, &self.target]
    }
}
