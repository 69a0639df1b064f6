//! Correlation table: region to live aggregate.

use std::collections::HashMap;
use std::sync::Arc;

use alert_core::{AggregateAlert, RegionId};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// How a candidate carrying evidence unknown to the live aggregate is treated.
///
/// A second report for a live region is merged into the existing posts only
/// under `Merge` (`ALERT_NOVEL_EVIDENCE=merge`); the default posts it anew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NovelEvidence {
    /// The region is uncovered and the candidate is published on its own.
    #[default]
    StartNew,
    /// The region correlates and the evidence is merged into the live
    /// aggregate, which is then re-published.
    Merge,
}

impl NovelEvidence {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "new" | "start_new" => Some(NovelEvidence::StartNew),
            "merge" => Some(NovelEvidence::Merge),
            _ => None,
        }
    }
}

/// Outcome of correlating one candidate.
#[derive(Debug, Default)]
pub struct Correlation {
    /// Live aggregates the candidate correlates with, each listed once.
    pub to_patch: Vec<Arc<AggregateAlert>>,
    /// Candidate regions now owned by the candidate.
    pub uncovered: Vec<RegionId>,
}

/// Region to live aggregate map, shared by the dispatcher and the sweeper.
///
/// Every operation holds the table lock for map work only. Aggregate content
/// locks may be taken while it is held; delivery locks never are.
#[derive(Debug)]
pub struct CorrelationTable {
    entries: Mutex<HashMap<RegionId, Arc<AggregateAlert>>>,
    novel_evidence: NovelEvidence,
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new(NovelEvidence::default())
    }
}

impl CorrelationTable {
    pub fn new(novel_evidence: NovelEvidence) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            novel_evidence,
        }
    }

    /// Partition the candidate's regions into correlated and uncovered, and
    /// point every uncovered region at the candidate.
    ///
    /// The whole region list is classified and assigned in one critical
    /// section.
    pub async fn correlate(&self, candidate: &Arc<AggregateAlert>) -> Correlation {
        let regions = candidate.region_ids();
        let mut correlation = Correlation::default();

        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        for region in regions {
            let prev = entries
                .get(&region)
                .filter(|prev| self.correlates(candidate, prev, now))
                .cloned();

            match prev {
                Some(prev) => {
                    if !correlation.to_patch.iter().any(|p| Arc::ptr_eq(p, &prev)) {
                        correlation.to_patch.push(prev);
                    }
                }
                None => {
                    entries.insert(region.clone(), Arc::clone(candidate));
                    correlation.uncovered.push(region);
                }
            }
        }

        trace!(
            alert = candidate.id(),
            to_patch = correlation.to_patch.len(),
            uncovered = correlation.uncovered.len(),
            "Correlated candidate"
        );
        correlation
    }

    fn correlates(&self, candidate: &AggregateAlert, prev: &AggregateAlert, now: Instant) -> bool {
        if prev.is_expired_at(now) {
            return false;
        }
        if self.novel_evidence == NovelEvidence::StartNew && candidate.has_novel_evidence(prev) {
            return false;
        }
        !candidate.category_conflicts(prev)
    }

    /// The aggregate currently mapped to a region, expired or not.
    pub async fn lookup(&self, region: &RegionId) -> Option<Arc<AggregateAlert>> {
        self.entries.lock().await.get(region).cloned()
    }

    /// Number of mapped regions.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Walk the table once.
    ///
    /// Clears the dirty flag of every mapped aggregate that has one and
    /// returns those aggregates (each once), then drops expired mappings.
    /// Returns the dirty aggregates and the number of removed mappings.
    pub async fn sweep(&self, now: Instant) -> (Vec<Arc<AggregateAlert>>, usize) {
        let mut entries = self.entries.lock().await;
        let mut dirty: Vec<Arc<AggregateAlert>> = Vec::new();

        for alert in entries.values() {
            if alert.take_dirty() {
                dirty.push(Arc::clone(alert));
            }
        }

        let before = entries.len();
        entries.retain(|_, alert| !alert.is_expired_at(now));
        let removed = before - entries.len();

        (dirty, removed)
    }
}
