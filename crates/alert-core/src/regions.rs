//! Region directory: free-text location names to canonical region ids.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::destination::Language;
use crate::event::RegionId;

/// Display information for a region in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionName {
    /// Settlement or district name.
    pub name: String,
    /// Enclosing area used to group location fields.
    pub area: String,
}

/// Lookup service for regions.
///
/// Implementations must be side-effect free; the engine treats every call as a
/// pure lookup and degrades misses to "unknown region".
pub trait RegionDirectory: Send + Sync {
    /// Resolve a free-text location name.
    fn resolve(&self, name: &str) -> Option<RegionId>;

    /// Advisory response window for a region. Unknown regions get zero.
    fn safety_buffer(&self, region: &RegionId) -> Duration;

    /// Localized name and area for a region.
    fn display_name(&self, region: &RegionId, language: Language) -> Option<RegionName>;
}

/// A region as stored in the directory data file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionRecord {
    pub id: RegionId,
    /// Names keyed by language.
    pub names: HashMap<Language, String>,
    /// Area names keyed by language.
    #[serde(default)]
    pub areas: HashMap<Language, String>,
    #[serde(default)]
    pub safety_seconds: u32,
    /// Extra spellings that resolve to this region.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// In-memory directory built from a fixed set of records.
#[derive(Debug, Clone, Default)]
pub struct StaticRegionDirectory {
    records: HashMap<RegionId, RegionRecord>,
    lookup: HashMap<String, RegionId>,
}

impl StaticRegionDirectory {
    pub fn new(records: Vec<RegionRecord>) -> Self {
        let mut directory = Self::default();
        for record in records {
            directory.insert(record);
        }
        directory
    }

    /// Load records from a JSON array.
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        let records: Vec<RegionRecord> = serde_json::from_str(data)?;
        Ok(Self::new(records))
    }

    /// Add a record, indexing every name and alias.
    pub fn insert(&mut self, record: RegionRecord) {
        let keys = record
            .names
            .values()
            .chain(record.aliases.iter())
            .map(|name| normalize_region_name(name))
            .filter(|key| !key.is_empty())
            .collect::<Vec<_>>();
        for key in keys {
            // First record wins on collisions
            self.lookup.entry(key).or_insert_with(|| record.id.clone());
        }
        self.records.insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RegionDirectory for StaticRegionDirectory {
    fn resolve(&self, name: &str) -> Option<RegionId> {
        self.lookup.get(&normalize_region_name(name)).cloned()
    }

    fn safety_buffer(&self, region: &RegionId) -> Duration {
        self.records
            .get(region)
            .map(|r| Duration::from_secs(u64::from(r.safety_seconds)))
            .unwrap_or_default()
    }

    fn display_name(&self, region: &RegionId, language: Language) -> Option<RegionName> {
        let record = self.records.get(region)?;
        let name = record
            .names
            .get(&language)
            .or_else(|| record.names.get(&Language::En))
            .cloned()
            .unwrap_or_else(|| region.to_string());
        let area = record
            .areas
            .get(&language)
            .or_else(|| record.areas.get(&Language::En))
            .cloned()
            .unwrap_or_else(|| name.clone());
        Some(RegionName { name, area })
    }
}

/// Normalize a location name for lookups.
///
/// Lower-cases, collapses doubled yod, drops hyphens, parentheses and quotes,
/// and collapses whitespace.
pub fn normalize_region_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .replace("יי", "י")
        .chars()
        .filter(|c| !matches!(c, '-' | '(' | ')' | '\'' | '"'))
        .flat_map(char::to_lowercase)
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
