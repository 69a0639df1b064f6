//! The aggregate alert: one in-flight notification covering one or more regions.
//!
//! An [`AggregateAlert`] is shared between the dispatcher, the correlation
//! table and background publishing tasks, so all mutable state lives behind
//! interior locks:
//!
//! - published content (category, instructions, regions, evidence) sits behind
//!   a short-lived content lock that is never held across an `.await`;
//! - the delivery record has its own lock, kept separate from the content lock
//!   and from the correlation table lock;
//! - the dirty flag is atomic so the sweeper can flip it without locking.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::destination::Destination;
use crate::event::{AlertEvent, Category, EvidenceId, RegionId};

/// Minimum time an aggregate stays live after creation.
pub const MIN_ALERT_TTL: Duration = Duration::from_secs(30);

static NEXT_ALERT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a post created on a destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of an aggregate's delivery record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub post_id: PostId,
    pub destination: Destination,
}

/// Point-in-time copy of an aggregate's content, handed to presenters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSnapshot {
    pub id: u64,
    pub instructions: String,
    pub category: Option<Category>,
    pub safety_seconds: u32,
    pub region_ids: Vec<RegionId>,
    pub evidence_count: usize,
    pub publication_date: String,
}

#[derive(Debug, Clone, Default)]
struct AlertContent {
    instructions: String,
    category: Option<Category>,
    region_ids: Vec<RegionId>,
    /// Evidence id to the regions it was reported for. Empty means it applies
    /// to every region of the aggregate.
    evidence: IndexMap<EvidenceId, Vec<RegionId>>,
}

/// A mergeable, mutable notification covering one or more regions.
pub struct AggregateAlert {
    id: u64,
    safety_seconds: u32,
    publication_date: String,
    expire: Instant,
    dirty: AtomicBool,
    content: Mutex<AlertContent>,
    deliveries: Mutex<Vec<Delivery>>,
}

impl AggregateAlert {
    /// Create an empty aggregate. It expires `max(30s, safety_seconds)` from now.
    pub fn new(
        instructions: impl Into<String>,
        category: Option<Category>,
        safety_seconds: u32,
        publication_date: impl Into<String>,
    ) -> Self {
        let ttl = MIN_ALERT_TTL.max(Duration::from_secs(u64::from(safety_seconds)));
        let content = AlertContent {
            instructions: instructions.into(),
            category,
            ..Default::default()
        };
        Self::from_parts(content, safety_seconds, publication_date.into(), Instant::now() + ttl)
    }

    /// Create a single-region aggregate from an event.
    pub fn from_event(event: &AlertEvent) -> Self {
        let alert = Self::new(
            event.instructions.clone(),
            event.category,
            event.safety_seconds,
            event.published_at.clone(),
        );
        alert.record_event(event);
        alert
    }

    fn from_parts(
        content: AlertContent,
        safety_seconds: u32,
        publication_date: String,
        expire: Instant,
    ) -> Self {
        Self {
            id: NEXT_ALERT_ID.fetch_add(1, Ordering::Relaxed),
            safety_seconds,
            publication_date,
            expire,
            dirty: AtomicBool::new(false),
            content: Mutex::new(content),
            deliveries: Mutex::new(Vec::new()),
        }
    }

    /// Process-unique id, used for logging and deduplication.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn safety_seconds(&self) -> u32 {
        self.safety_seconds
    }

    pub fn publication_date(&self) -> &str {
        &self.publication_date
    }

    pub fn expire(&self) -> Instant {
        self.expire
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expire
    }

    pub fn category(&self) -> Option<Category> {
        self.content.lock().category
    }

    pub fn instructions(&self) -> String {
        self.content.lock().instructions.clone()
    }

    pub fn region_ids(&self) -> Vec<RegionId> {
        self.content.lock().region_ids.clone()
    }

    pub fn region_count(&self) -> usize {
        self.content.lock().region_ids.len()
    }

    pub fn evidence_ids(&self) -> Vec<EvidenceId> {
        self.content.lock().evidence.keys().cloned().collect()
    }

    pub fn has_evidence(&self, evidence: &EvidenceId) -> bool {
        self.content.lock().evidence.contains_key(evidence)
    }

    /// Append a region, keeping insertion order. Returns false if already covered.
    pub fn append_region(&self, region: impl Into<RegionId>) -> bool {
        let region = region.into();
        let mut content = self.content.lock();
        if content.region_ids.contains(&region) {
            return false;
        }
        content.region_ids.push(region);
        true
    }

    /// Add evidence that applies to the whole aggregate.
    pub fn add_evidence(&self, evidence: impl Into<EvidenceId>) {
        self.content.lock().evidence.entry(evidence.into()).or_default();
    }

    /// Record an event's region and link its evidence to that region.
    pub fn record_event(&self, event: &AlertEvent) {
        let mut content = self.content.lock();
        if !content.region_ids.contains(&event.region) {
            content.region_ids.push(event.region.clone());
        }
        let regions = content.evidence.entry(event.evidence_id.clone()).or_default();
        if !regions.contains(&event.region) {
            regions.push(event.region.clone());
        }
    }

    /// Whether this aggregate carries evidence that `known` has not seen.
    ///
    /// Only this side's novelty is checked; evidence present in `known` but
    /// missing here does not count.
    pub fn has_novel_evidence(&self, known: &AggregateAlert) -> bool {
        if std::ptr::eq(self, known) {
            return false;
        }
        let ids = self.evidence_ids();
        let known = known.content.lock();
        ids.iter().any(|id| !known.evidence.contains_key(id))
    }

    /// Whether both aggregates have a category and they differ.
    pub fn category_conflicts(&self, other: &AggregateAlert) -> bool {
        match (self.category(), other.category()) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    }

    /// Merge a correlated candidate into this aggregate.
    ///
    /// Adopts the candidate's category and instructions when this aggregate
    /// has none, and unions its evidence. Returns true when anything new was
    /// learned, in which case the aggregate is marked dirty and must be
    /// re-published.
    pub fn patch_data(&self, candidate: &AggregateAlert) -> bool {
        if std::ptr::eq(self, candidate) {
            return false;
        }
        let incoming = candidate.content.lock().clone();

        let mut changed = false;
        {
            let mut content = self.content.lock();
            if content.category.is_none() && incoming.category.is_some() {
                content.category = incoming.category;
                content.instructions = incoming.instructions;
                changed = true;
            }
            for (evidence, regions) in incoming.evidence {
                match content.evidence.get_mut(&evidence) {
                    Some(known) => {
                        for region in regions {
                            if !known.contains(&region) {
                                known.push(region);
                            }
                        }
                    }
                    None => {
                        content.evidence.insert(evidence, regions);
                        changed = true;
                    }
                }
            }
        }

        if changed {
            self.mark_dirty();
        }
        changed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Clear the dirty flag, returning whether it was set.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }

    /// Correlation key used to merge per-region records of one ingestion pass.
    ///
    /// Hashes instructions, category, safety seconds, the first evidence id and
    /// the publication date.
    pub fn identity_hash(&self) -> String {
        let content = self.content.lock();
        let evidence = content
            .evidence
            .keys()
            .next()
            .map(EvidenceId::as_str)
            .unwrap_or_default();
        let category = content.category.map(|c| c.as_str()).unwrap_or_default();
        let data = format!(
            "{}{}{}{}{}",
            content.instructions, category, self.safety_seconds, evidence, self.publication_date
        );

        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Split into consecutive chunks of at most `max_regions` regions.
    ///
    /// Scalar fields and the expiry deadline are cloned. Each chunk keeps only
    /// the evidence reported for its own regions plus evidence that applies to
    /// the whole aggregate.
    pub fn split(&self, max_regions: usize) -> Vec<AggregateAlert> {
        let content = self.content.lock().clone();

        content
            .region_ids
            .chunks(max_regions.max(1))
            .map(|chunk| {
                let evidence: IndexMap<EvidenceId, Vec<RegionId>> = content
                    .evidence
                    .iter()
                    .filter(|(_, regions)| {
                        regions.is_empty() || regions.iter().any(|r| chunk.contains(r))
                    })
                    .map(|(id, regions)| {
                        let kept: Vec<RegionId> = regions
                            .iter()
                            .filter(|r| chunk.contains(r))
                            .cloned()
                            .collect();
                        (id.clone(), kept)
                    })
                    .collect();

                let chunk_content = AlertContent {
                    instructions: content.instructions.clone(),
                    category: content.category,
                    region_ids: chunk.to_vec(),
                    evidence,
                };
                Self::from_parts(
                    chunk_content,
                    self.safety_seconds,
                    self.publication_date.clone(),
                    self.expire,
                )
            })
            .collect()
    }

    pub fn record_delivery(&self, delivery: Delivery) {
        self.deliveries.lock().push(delivery);
    }

    /// Copy of the delivery record.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    pub fn snapshot(&self) -> AlertSnapshot {
        let content = self.content.lock();
        AlertSnapshot {
            id: self.id,
            instructions: content.instructions.clone(),
            category: content.category,
            safety_seconds: self.safety_seconds,
            region_ids: content.region_ids.clone(),
            evidence_count: content.evidence.len(),
            publication_date: self.publication_date.clone(),
        }
    }
}

impl fmt::Debug for AggregateAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let content = self.content.lock();
        f.debug_struct("AggregateAlert")
            .field("id", &self.id)
            .field("category", &content.category)
            .field("instructions", &content.instructions)
            .field("regions", &content.region_ids.len())
            .field("evidence", &content.evidence.len())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rockets(region: &str, evidence: &str) -> AggregateAlert {
        AggregateAlert::from_event(&AlertEvent::new(Category::Rockets, region, evidence))
    }

    fn with_regions(count: usize) -> AggregateAlert {
        let alert = AggregateAlert::new("instructions", Some(Category::Rockets), 90, "10:00");
        for i in 0..count {
            let event = AlertEvent::new(Category::Rockets, format!("R{}", i), format!("ev{}", i / 10));
            alert.record_event(&event);
        }
        alert
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_has_floor() {
        let short = AggregateAlert::new("instructions", Some(Category::Rockets), 15, "");
        let long = AggregateAlert::new("instructions", Some(Category::Rockets), 90, "");

        let now = Instant::now();
        assert_eq!(short.expire(), now + MIN_ALERT_TTL);
        assert_eq!(long.expire(), now + Duration::from_secs(90));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(short.is_expired());
        assert!(!long.is_expired());
    }

    #[test]
    fn test_identity_hash() {
        let a = AggregateAlert::from_event(&AlertEvent::new(Category::Rockets, "R1", "ev1").with_published_at("10:00"));
        let b = AggregateAlert::from_event(&AlertEvent::new(Category::Rockets, "R2", "ev1").with_published_at("10:00"));
        let c = AggregateAlert::from_event(&AlertEvent::new(Category::Rockets, "R1", "ev1").with_published_at("10:01"));
        let d = AggregateAlert::from_event(&AlertEvent::new(Category::Uav, "R1", "ev1").with_published_at("10:00"));

        // Region is not part of the identity
        assert_eq!(a.identity_hash(), b.identity_hash());
        assert_ne!(a.identity_hash(), c.identity_hash());
        assert_ne!(a.identity_hash(), d.identity_hash());
        assert_eq!(a.identity_hash().len(), 64);
    }

    #[test]
    fn test_append_region_keeps_order() {
        let alert = AggregateAlert::new("instructions", None, 0, "");
        assert!(alert.append_region("R2"));
        assert!(alert.append_region("R1"));
        assert!(!alert.append_region("R2"));
        assert_eq!(alert.region_ids(), vec![RegionId::from("R2"), RegionId::from("R1")]);
    }

    #[test]
    fn test_patch_data_without_new_evidence() {
        let prev = rockets("R1", "ev1");
        let candidate = rockets("R1", "ev1");

        assert!(!prev.patch_data(&candidate));
        assert!(!prev.is_dirty());
    }

    #[test]
    fn test_patch_data_with_new_evidence() {
        let prev = rockets("R1", "ev1");
        let candidate = rockets("R1", "ev2");

        assert!(prev.patch_data(&candidate));
        assert!(prev.is_dirty());
        assert!(prev.has_evidence(&EvidenceId::from("ev1")));
        assert!(prev.has_evidence(&EvidenceId::from("ev2")));
        assert!(prev.take_dirty());
        assert!(!prev.is_dirty());
    }

    #[test]
    fn test_patch_data_adopts_category() {
        let prev = AggregateAlert::from_event(&AlertEvent::advisory("event_over", "R1", "ev1"));
        let candidate = AggregateAlert::from_event(&AlertEvent::new(Category::Uav, "R1", "ev1"));

        assert!(prev.patch_data(&candidate));
        assert_eq!(prev.category(), Some(Category::Uav));
        assert_eq!(prev.instructions(), "uav_instructions");
    }

    #[test]
    fn test_patch_data_keeps_category() {
        let prev = rockets("R1", "ev1");
        let candidate = AggregateAlert::from_event(&AlertEvent::advisory("event_over", "R1", "ev2"));

        assert!(prev.patch_data(&candidate));
        assert_eq!(prev.category(), Some(Category::Rockets));
        assert_eq!(prev.instructions(), "instructions");
    }

    #[test]
    fn test_patch_data_with_itself() {
        let prev = rockets("R1", "ev1");
        assert!(!prev.patch_data(&prev));
    }

    #[test]
    fn test_novel_evidence_is_asymmetric() {
        let known = rockets("R1", "ev1");
        known.add_evidence("ev2");

        let subset = rockets("R1", "ev1");
        let overlap = rockets("R1", "ev2");
        overlap.add_evidence("ev3");

        assert!(!subset.has_novel_evidence(&known));
        assert!(known.has_novel_evidence(&subset));
        assert!(overlap.has_novel_evidence(&known));
    }

    #[test]
    fn test_category_conflicts() {
        let rocket = rockets("R1", "ev1");
        let uav = AggregateAlert::from_event(&AlertEvent::new(Category::Uav, "R1", "ev2"));
        let advisory = AggregateAlert::from_event(&AlertEvent::advisory("event_over", "R1", "ev3"));

        assert!(rocket.category_conflicts(&uav));
        assert!(!rocket.category_conflicts(&advisory));
        assert!(!advisory.category_conflicts(&uav));
    }

    #[test]
    fn test_split_filters_evidence() {
        let alert = with_regions(45);
        let chunks = alert.split(20);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].region_count(), 20);
        assert_eq!(chunks[1].region_count(), 20);
        assert_eq!(chunks[2].region_count(), 5);

        // R0..R19 were reported under ev0 and ev1
        assert_eq!(
            chunks[0].evidence_ids(),
            vec![EvidenceId::from("ev0"), EvidenceId::from("ev1")]
        );
        // R40..R44 were reported under ev4 only
        assert_eq!(chunks[2].evidence_ids(), vec![EvidenceId::from("ev4")]);

        for chunk in &chunks {
            assert_eq!(chunk.category(), Some(Category::Rockets));
            assert_eq!(chunk.safety_seconds(), 90);
            assert_eq!(chunk.publication_date(), "10:00");
            assert_eq!(chunk.expire(), alert.expire());
            assert_ne!(chunk.id(), alert.id());
        }
    }

    #[test]
    fn test_split_round_trip() {
        let alert = with_regions(45);
        let original = alert.region_ids();

        let merged: Vec<RegionId> = alert
            .split(20)
            .iter()
            .flat_map(|chunk| chunk.region_ids())
            .collect();

        assert_eq!(merged, original);
        let unique: std::collections::HashSet<_> = merged.iter().collect();
        assert_eq!(unique.len(), 45);
    }

    #[test]
    fn test_split_keeps_global_evidence() {
        let alert = with_regions(25);
        alert.add_evidence("feed-poll");

        for chunk in alert.split(20) {
            assert!(chunk.has_evidence(&EvidenceId::from("feed-poll")));
        }
    }

    #[test]
    fn test_deliveries() {
        let alert = rockets("R1", "ev1");
        alert.record_delivery(Delivery {
            post_id: PostId::new("p1"),
            destination: Destination::group("g1", crate::Language::He),
        });

        let deliveries = alert.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].post_id.as_str(), "p1");
    }

    #[test]
    fn test_snapshot() {
        let alert = rockets("R1", "ev1");
        alert.add_evidence("ev2");

        let snapshot = alert.snapshot();
        assert_eq!(snapshot.id, alert.id());
        assert_eq!(snapshot.region_ids, vec![RegionId::from("R1")]);
        assert_eq!(snapshot.evidence_count, 2);
        assert_eq!(snapshot.category, Some(Category::Rockets));
    }
}
