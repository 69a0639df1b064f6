//! Per-region alert events produced by source adapters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of hazard categories reported by upstream feeds.
///
/// An unspecified category is modelled as `Option<Category>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Rockets,
    Earthquake,
    Radiological,
    Tsunami,
    Uav,
    Biohazard,
    Infiltration,
}

impl Category {
    /// All categories, in feed-code order.
    pub const ALL: [Category; 7] = [
        Category::Rockets,
        Category::Earthquake,
        Category::Radiological,
        Category::Tsunami,
        Category::Uav,
        Category::Biohazard,
        Category::Infiltration,
    ];

    /// Stable lowercase name, also used in identity hashes and locale keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Rockets => "rockets",
            Category::Earthquake => "earthquake",
            Category::Radiological => "radiological",
            Category::Tsunami => "tsunami",
            Category::Uav => "uav",
            Category::Biohazard => "biohazard",
            Category::Infiltration => "infiltration",
        }
    }

    /// Parse a lowercase category name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Map the numeric category code used by the home-front command feed.
    pub fn from_feed_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Category::Rockets),
            "3" => Some(Category::Earthquake),
            "4" => Some(Category::Radiological),
            "5" => Some(Category::Tsunami),
            "6" => Some(Category::Uav),
            "7" => Some(Category::Biohazard),
            "13" => Some(Category::Infiltration),
            _ => None,
        }
    }

    /// Default instruction key for alerts of this category.
    pub fn default_instructions(&self) -> &'static str {
        match self {
            Category::Infiltration | Category::Radiological | Category::Biohazard => "lockdown",
            Category::Uav => "uav_instructions",
            _ => "instructions",
        }
    }

    /// Reaction marker attached to fresh posts, if this category gets one.
    pub fn reaction_marker(&self) -> Option<String> {
        match self {
            Category::Uav | Category::Infiltration => Some(format!("{}-alert", self.as_str())),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical region identifier, as resolved by the region directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RegionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque identifier of the upstream record backing an alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceId(String);

impl EvidenceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EvidenceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EvidenceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A normalized per-region alert record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    #[serde(default)]
    pub category: Option<Category>,
    pub instructions: String,
    pub region: RegionId,
    #[serde(default)]
    pub safety_seconds: u32,
    pub evidence_id: EvidenceId,
    #[serde(default)]
    pub published_at: String,
}

impl AlertEvent {
    /// Create an event using the category's default instructions.
    pub fn new(
        category: Category,
        region: impl Into<RegionId>,
        evidence_id: impl Into<EvidenceId>,
    ) -> Self {
        Self {
            category: Some(category),
            instructions: category.default_instructions().to_string(),
            region: region.into(),
            safety_seconds: 0,
            evidence_id: evidence_id.into(),
            published_at: String::new(),
        }
    }

    /// Create an advisory event with no category, e.g. "event over".
    pub fn advisory(
        instructions: impl Into<String>,
        region: impl Into<RegionId>,
        evidence_id: impl Into<EvidenceId>,
    ) -> Self {
        Self {
            category: None,
            instructions: instructions.into(),
            region: region.into(),
            safety_seconds: 0,
            evidence_id: evidence_id.into(),
            published_at: String::new(),
        }
    }

    pub fn with_safety_seconds(mut self, seconds: u32) -> Self {
        self.safety_seconds = seconds;
        self
    }

    pub fn with_published_at(mut self, published_at: impl Into<String>) -> Self {
        self.published_at = published_at.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_codes() {
        assert_eq!(Category::from_feed_code("1"), Some(Category::Rockets));
        assert_eq!(Category::from_feed_code("6"), Some(Category::Uav));
        assert_eq!(Category::from_feed_code("13"), Some(Category::Infiltration));
        assert_eq!(Category::from_feed_code("2"), None);
    }

    #[test]
    fn test_default_instructions() {
        assert_eq!(Category::Rockets.default_instructions(), "instructions");
        assert_eq!(Category::Biohazard.default_instructions(), "lockdown");
        assert_eq!(Category::Infiltration.default_instructions(), "lockdown");
        assert_eq!(Category::Uav.default_instructions(), "uav_instructions");
    }

    #[test]
    fn test_reaction_marker() {
        assert_eq!(Category::Uav.reaction_marker().as_deref(), Some("uav-alert"));
        assert_eq!(
            Category::Infiltration.reaction_marker().as_deref(),
            Some("infiltration-alert")
        );
        assert!(Category::Rockets.reaction_marker().is_none());
    }

    #[test]
    fn test_event_json() {
        let json = r#"{"category":"uav","instructions":"uav_instructions","region":"R1","evidence_id":"ev1"}"#;
        let event: AlertEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.category, Some(Category::Uav));
        assert_eq!(event.region, RegionId::from("R1"));
        assert_eq!(event.safety_seconds, 0);
        assert!(event.published_at.is_empty());
    }

    #[test]
    fn test_category_parse() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()), Some(category));
        }
        assert_eq!(Category::parse("lockdown"), None);
    }
}
