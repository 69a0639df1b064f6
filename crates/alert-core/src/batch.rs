//! Batching of per-region events into candidate aggregates.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alert::AggregateAlert;
use crate::event::{AlertEvent, Category, EvidenceId};
use crate::regions::RegionDirectory;

/// Group one ingestion pass into candidate aggregates.
///
/// Events whose single-region aggregates share an identity hash are merged
/// into one candidate. Candidates come out in first-seen order and regions
/// keep event order.
pub fn batch_events<'a, I>(events: I) -> Vec<AggregateAlert>
where
    I: IntoIterator<Item = &'a AlertEvent>,
{
    let mut candidates: IndexMap<String, AggregateAlert> = IndexMap::new();

    for event in events {
        let probe = AggregateAlert::from_event(event);
        let hash = probe.identity_hash();
        match candidates.get(&hash) {
            Some(candidate) => candidate.record_event(event),
            None => {
                candidates.insert(hash, probe);
            }
        }
    }

    candidates.into_values().collect()
}

/// An upstream record before region resolution.
///
/// This is the line format read by the relay: one record per upstream alert,
/// naming its locations in free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAlert {
    pub evidence_id: EvidenceId,
    /// Category name (`uav`) or numeric feed code (`6`).
    #[serde(default)]
    pub category: Option<String>,
    /// Instruction key. Defaults to the category's instructions.
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub published_at: String,
}

impl RawAlert {
    pub fn category(&self) -> Option<Category> {
        let raw = self.category.as_deref()?.trim();
        Category::parse(&raw.to_ascii_lowercase()).or_else(|| Category::from_feed_code(raw))
    }

    pub fn instructions(&self) -> String {
        match (&self.instructions, self.category()) {
            (Some(instructions), _) => instructions.clone(),
            (None, Some(category)) => category.default_instructions().to_string(),
            (None, None) => "event_over".to_string(),
        }
    }

    /// Resolve locations into per-region events.
    ///
    /// Unknown locations are dropped with a warning. Safety seconds come from
    /// the directory.
    pub fn to_events(&self, directory: &dyn RegionDirectory) -> Vec<AlertEvent> {
        let category = self.category();
        let instructions = self.instructions();

        self.locations
            .iter()
            .filter_map(|location| match directory.resolve(location) {
                Some(region) => Some(region),
                None => {
                    warn!(evidence = %self.evidence_id, location = %location, "Unknown location, dropping");
                    None
                }
            })
            .map(|region| {
                let safety = directory.safety_buffer(&region);
                AlertEvent {
                    category,
                    instructions: instructions.clone(),
                    safety_seconds: u32::try_from(safety.as_secs()).unwrap_or(u32::MAX),
                    region,
                    evidence_id: self.evidence_id.clone(),
                    published_at: self.published_at.clone(),
                }
            })
            .collect()
    }

    /// Build the candidate aggregates for this record.
    ///
    /// A record without locations yields a single region-less broadcast
    /// candidate. A record whose locations all fail to resolve yields nothing.
    pub fn to_candidates(&self, directory: &dyn RegionDirectory) -> Vec<AggregateAlert> {
        if self.locations.is_empty() {
            let alert = AggregateAlert::new(
                self.instructions(),
                self.category(),
                0,
                self.published_at.clone(),
            );
            alert.add_evidence(self.evidence_id.clone());
            return vec![alert];
        }

        let events = self.to_events(directory);
        let candidates = batch_events(&events);
        debug!(
            evidence = %self.evidence_id,
            locations = self.locations.len(),
            resolved = events.len(),
            candidates = candidates.len(),
            "Batched raw alert"
        );
        candidates
    }
}
