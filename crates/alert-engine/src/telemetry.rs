//! Metric names and recording helpers.
//!
//! Everything goes through the `metrics` facade; without an installed
//! recorder the calls are no-ops.

use metrics::{counter, describe_counter, describe_histogram, histogram};

pub const SUBMITTED: &str = "alert_submitted_total";
pub const REGIONS_PER_ALERT: &str = "alert_regions_per_alert";
pub const POSTS_CREATED: &str = "alert_posts_created_total";
pub const POSTS_FAILED: &str = "alert_posts_failed_total";
pub const PATCHES: &str = "alert_patches_total";
pub const PATCHES_FAILED: &str = "alert_patches_failed_total";
pub const REACTIONS_FAILED: &str = "alert_reactions_failed_total";
pub const AGGREGATES_EXPIRED: &str = "alert_aggregates_expired_total";

/// Register descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(SUBMITTED, "Aggregates submitted to the intake queue");
    describe_histogram!(REGIONS_PER_ALERT, "Regions covered by each submitted aggregate");
    describe_counter!(POSTS_CREATED, "Posts created on destinations");
    describe_counter!(POSTS_FAILED, "Post creations that failed or timed out");
    describe_counter!(PATCHES, "Posts patched in place");
    describe_counter!(PATCHES_FAILED, "Patches that failed or timed out");
    describe_counter!(REACTIONS_FAILED, "Reactions that failed or timed out");
    describe_counter!(AGGREGATES_EXPIRED, "Region mappings removed by the sweeper");
}

pub(crate) fn record_submitted(regions: usize) {
    counter!(SUBMITTED).increment(1);
    histogram!(REGIONS_PER_ALERT).record(regions as f64);
}

pub(crate) fn record_post(ok: bool) {
    if ok {
        counter!(POSTS_CREATED).increment(1);
    } else {
        counter!(POSTS_FAILED).increment(1);
    }
}

pub(crate) fn record_patch(ok: bool) {
    if ok {
        counter!(PATCHES).increment(1);
    } else {
        counter!(PATCHES_FAILED).increment(1);
    }
}

pub(crate) fn record_reaction_failed() {
    counter!(REACTIONS_FAILED).increment(1);
}

pub(crate) fn record_expired(count: usize) {
    counter!(AGGREGATES_EXPIRED).increment(count as u64);
}
