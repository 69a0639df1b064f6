//! Chat destinations and their languages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Languages alerts are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    He,
    Ru,
    Ar,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::En, Language::He, Language::Ru, Language::Ar];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::He => "he",
            Language::Ru => "ru",
            Language::Ar => "ar",
        }
    }

    /// Parse a language tag, falling back to English for unknown tags.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "he" | "iw" => Language::He,
            "ru" => Language::Ru,
            "ar" => Language::Ar,
            _ => Language::En,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured chat output surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    /// Recipient address or group identifier.
    pub id: String,
    /// Language content for this destination is rendered in.
    pub language: Language,
    /// Whether `id` names a group.
    #[serde(default)]
    pub is_group: bool,
}

impl Destination {
    /// A direct-recipient destination.
    pub fn direct(id: impl Into<String>, language: Language) -> Self {
        Self {
            id: id.into(),
            language,
            is_group: false,
        }
    }

    /// A group destination.
    pub fn group(id: impl Into<String>, language: Language) -> Self {
        Self {
            id: id.into(),
            language,
            is_group: true,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_group {
            write!(f, "{}:group:{}", self.language, self.id)
        } else {
            write!(f, "{}:{}", self.language, self.id)
        }
    }
}

impl FromStr for Destination {
    type Err = String;

    /// Parse `<lang>:group:<id>` or `<lang>:<recipient>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lang, rest) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("missing language prefix in destination '{}'", s))?;
        let language = Language::from_tag(lang);

        let destination = match rest.strip_prefix("group:") {
            Some(group_id) => Destination::group(group_id, language),
            None => Destination::direct(rest, language),
        };

        if destination.id.is_empty() {
            return Err(format!("empty destination id in '{}'", s));
        }
        Ok(destination)
    }
}
