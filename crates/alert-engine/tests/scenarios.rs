//! End-to-end dispatcher and sweeper behaviour against recording transports.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use alert_core::{
    batch_events, AggregateAlert, AlertEvent, Category, Destination, EvidenceId, Language, RegionId,
    TextPresenter, Transport,
};
use alert_engine::{AlertEngine, ConfigError, EngineConfig, EngineError, NovelEvidence};
use mock_transport::{DelayedTransport, FailingTransport, RecordingTransport, TransportOp};
use tokio_util::sync::CancellationToken;

fn destinations() -> Vec<Destination> {
    vec![
        Destination::group("he-alerts", Language::He),
        Destination::group("en-alerts", Language::En),
        Destination::direct("+15551234567", Language::Ru),
    ]
}

/// Config without settle patches, so only dispatcher work is observed.
fn quiet_config() -> EngineConfig {
    EngineConfig {
        settle_delay: None,
        ..EngineConfig::with_destinations(destinations())
    }
}

fn merge_config() -> EngineConfig {
    EngineConfig {
        novel_evidence: NovelEvidence::Merge,
        ..quiet_config()
    }
}

fn engine(transport: Arc<dyn Transport>, config: EngineConfig) -> AlertEngine {
    AlertEngine::new(config, transport, Arc::new(TextPresenter::default())).unwrap()
}

fn candidate(events: &[AlertEvent]) -> Arc<AggregateAlert> {
    let mut candidates = batch_events(events);
    assert_eq!(candidates.len(), 1, "events must batch into one candidate");
    Arc::new(candidates.remove(0))
}

fn rockets(region: &str, evidence: &str) -> AlertEvent {
    AlertEvent::new(Category::Rockets, region, evidence).with_published_at("2024-04-14T01:00:00")
}

fn regions(count: usize, evidence: &str) -> Vec<AlertEvent> {
    (0..count).map(|i| rockets(&format!("R{}", i), evidence)).collect()
}

#[tokio::test]
async fn test_new_alert_posts_to_every_destination() {
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = engine(transport.clone(), quiet_config()).dispatcher();

    let e1 = candidate(&[rockets("R1", "ev1")]);
    let report = dispatcher.process(e1.clone()).await;

    assert_eq!(report.published, 1);
    assert_eq!(report.posts_created, 3);
    assert_eq!(report.correlated, 0);
    assert_eq!(transport.create_count(), 3);
    assert_eq!(e1.deliveries().len(), destinations().len());

    let he = transport.post(&e1.deliveries()[0].post_id).unwrap();
    assert_eq!(he.title, "ירי רקטות וטילים");
}

#[tokio::test]
async fn test_same_evidence_correlates_without_patch() {
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = engine(transport.clone(), quiet_config()).dispatcher();

    dispatcher.process(candidate(&[rockets("R1", "ev1")])).await;
    let report = dispatcher.process(candidate(&[rockets("R1", "ev1")])).await;

    assert_eq!(report.correlated, 1);
    assert_eq!(report.merged, 0);
    assert_eq!(report.published, 0);
    assert_eq!(transport.patch_count(), 0);
    assert_eq!(transport.create_count(), 3);
}

#[tokio::test]
async fn test_new_evidence_patches_original_posts() {
    let transport = Arc::new(RecordingTransport::new());
    let alerts = engine(transport.clone(), merge_config());
    let dispatcher = alerts.dispatcher();

    let e1 = candidate(&[rockets("R1", "ev1")]);
    dispatcher.process(e1.clone()).await;
    let report = dispatcher.process(candidate(&[rockets("R1", "ev2")])).await;

    assert_eq!(report.correlated, 1);
    assert_eq!(report.merged, 1);
    assert_eq!(report.published, 0);
    assert_eq!(report.patches_sent, 3);

    // Exactly one patch per original destination
    assert_eq!(transport.patch_count(), 3);
    for delivery in e1.deliveries() {
        assert_eq!(transport.patches_for(&delivery.post_id).len(), 1);
    }

    assert!(e1.has_evidence(&EvidenceId::from("ev1")));
    assert!(e1.has_evidence(&EvidenceId::from("ev2")));
    assert!(!e1.is_dirty());

    let en = e1.deliveries().into_iter().find(|d| d.destination.language == Language::En).unwrap();
    assert_eq!(transport.post(&en.post_id).unwrap().title, "Rocket and missile fire (2)");
}

#[tokio::test]
async fn test_new_evidence_starts_new_alert_by_default() {
    let transport = Arc::new(RecordingTransport::new());
    let alerts = engine(transport.clone(), quiet_config());
    let dispatcher = alerts.dispatcher();

    let e1 = candidate(&[rockets("R1", "ev1")]);
    dispatcher.process(e1.clone()).await;
    let e3 = candidate(&[rockets("R1", "ev2")]);
    let report = dispatcher.process(e3.clone()).await;

    assert_eq!(report.correlated, 0);
    assert_eq!(report.published, 1);
    assert_eq!(transport.create_count(), 6);
    assert_eq!(transport.patch_count(), 0);
    assert!(!e1.has_evidence(&EvidenceId::from("ev2")));

    let owner = alerts.table().lookup(&RegionId::from("R1")).await.unwrap();
    assert!(Arc::ptr_eq(&owner, &e3));
}

#[tokio::test]
async fn test_category_mismatch_publishes_independently() {
    let transport = Arc::new(RecordingTransport::new());
    let alerts = engine(transport.clone(), merge_config());
    let dispatcher = alerts.dispatcher();

    let e4 = candidate(&[rockets("R2", "ev3")]);
    let e5 = candidate(&[AlertEvent::new(Category::Uav, "R2", "ev4")]);
    dispatcher.process(e4.clone()).await;
    let report = dispatcher.process(e5.clone()).await;

    assert_eq!(report.correlated, 0);
    assert_eq!(report.published, 1);
    assert_eq!(transport.create_count(), 6);
    assert_eq!(transport.patch_count(), 0);

    assert_eq!(e4.category(), Some(Category::Rockets));
    assert_eq!(e5.category(), Some(Category::Uav));
    assert_eq!(e4.deliveries().len(), 3);
    assert_eq!(e5.deliveries().len(), 3);

    let owner = alerts.table().lookup(&RegionId::from("R2")).await.unwrap();
    assert!(Arc::ptr_eq(&owner, &e5));
}

#[tokio::test]
async fn test_oversized_alert_is_split() {
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = engine(transport.clone(), quiet_config()).dispatcher();

    let report = dispatcher.process(candidate(&regions(25, "ev1"))).await;

    assert_eq!(report.chunks, 2);
    assert_eq!(report.published, 2);
    assert_eq!(report.posts_created, 6);

    let creates = transport.creates();
    assert_eq!(creates.len(), 6);
    let field_counts: Vec<usize> = creates
        .iter()
        .map(|op| match op {
            TransportOp::Create { content, .. } => content.fields.len(),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(field_counts, vec![20, 20, 20, 5, 5, 5]);
}

#[tokio::test]
async fn test_split_covers_every_region_once() {
    let transport = Arc::new(RecordingTransport::new());
    let alerts = engine(transport.clone(), quiet_config());
    let dispatcher = alerts.dispatcher();

    let original = candidate(&regions(45, "ev1"));
    let report = dispatcher.process(original.clone()).await;
    assert_eq!(report.chunks, 3);

    let mut owners: Vec<Arc<AggregateAlert>> = Vec::new();
    for region in original.region_ids() {
        let owner = alerts.table().lookup(&region).await.unwrap();
        assert!(owner.region_ids().contains(&region));
        if !owners.iter().any(|o| Arc::ptr_eq(o, &owner)) {
            owners.push(owner);
        }
    }

    let merged: Vec<RegionId> = owners.iter().flat_map(|o| o.region_ids()).collect();
    assert_eq!(merged, original.region_ids());
    assert_eq!(alerts.table().len().await, 45);
}

#[tokio::test]
async fn test_alert_without_regions_is_broadcast() {
    let transport = Arc::new(RecordingTransport::new());
    let alerts = engine(transport.clone(), EngineConfig::with_destinations(destinations()));
    let dispatcher = alerts.dispatcher();

    let advisory = Arc::new(AggregateAlert::new("uav_event_over", None, 0, ""));
    advisory.add_evidence("tg-1");
    let report = dispatcher.process(advisory.clone()).await;

    assert!(report.broadcast);
    assert_eq!(report.posts_created, 3);
    assert_eq!(advisory.deliveries().len(), 3);
    assert!(alerts.table().is_empty().await);

    // No follow-ups for broadcasts
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(transport.patch_count(), 0);
    assert_eq!(transport.reaction_count(), 0);
}

#[tokio::test]
async fn test_failing_destination_does_not_block_others() {
    let recording = Arc::new(RecordingTransport::new());
    let transport = Arc::new(FailingTransport::new(recording.clone()).failing("en-alerts"));
    let dispatcher = engine(transport, merge_config()).dispatcher();

    let e1 = candidate(&[rockets("R1", "ev1")]);
    let report = dispatcher.process(e1.clone()).await;
    assert_eq!(report.posts_created, 2);
    assert_eq!(report.posts_failed, 1);
    assert_eq!(e1.deliveries().len(), 2);

    // Later patches only touch recorded deliveries
    let report = dispatcher.process(candidate(&[rockets("R1", "ev2")])).await;
    assert_eq!(report.patches_sent, 2);
    assert_eq!(report.patches_failed, 0);
    assert_eq!(recording.patch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_transport_times_out() {
    let recording = Arc::new(RecordingTransport::new());
    let transport = Arc::new(DelayedTransport::with_secs(recording.clone(), 15));
    let dispatcher = engine(transport, quiet_config()).dispatcher();

    let e1 = candidate(&[rockets("R1", "ev1")]);
    let report = dispatcher.process(e1.clone()).await;

    assert_eq!(report.published, 1);
    assert_eq!(report.posts_created, 0);
    assert_eq!(report.posts_failed, 3);
    assert!(e1.deliveries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reaction_and_settle_patch() {
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = engine(transport.clone(), EngineConfig::with_destinations(destinations())).dispatcher();

    let uav = candidate(&[AlertEvent::new(Category::Uav, "R1", "ev1")]);
    dispatcher.process(uav.clone()).await;

    tokio::time::sleep(Duration::from_millis(300)).await;

    let reactions = transport.reactions();
    assert_eq!(reactions.len(), 3);
    assert!(reactions
        .iter()
        .all(|op| matches!(op, TransportOp::React { marker, .. } if marker == "uav-alert")));
    assert_eq!(transport.patch_count(), 3);

    // Rockets get the settle patch but no reaction
    dispatcher.process(candidate(&[rockets("R2", "ev2")])).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(transport.reaction_count(), 3);
    assert_eq!(transport.patch_count(), 6);
}

#[tokio::test]
async fn test_category_adopted_from_later_evidence() {
    let transport = Arc::new(RecordingTransport::new());
    let alerts = engine(transport.clone(), quiet_config());
    let dispatcher = alerts.dispatcher();

    let advisory = candidate(&[AlertEvent::advisory("event_over", "R1", "ev1")]);
    dispatcher.process(advisory.clone()).await;

    let report = dispatcher.process(candidate(&[AlertEvent::new(Category::Uav, "R1", "ev1")])).await;
    assert_eq!(report.merged, 1);
    assert_eq!(advisory.category(), Some(Category::Uav));
    assert_eq!(transport.patch_count(), 3);

    // Once set, a different category never overwrites it
    dispatcher.process(candidate(&[rockets("R1", "ev1")])).await;
    assert_eq!(advisory.category(), Some(Category::Uav));
    assert_eq!(transport.create_count(), 6);
}

#[tokio::test]
async fn test_evidence_only_grows() {
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = engine(transport, merge_config()).dispatcher();

    let first = candidate(&[rockets("R1", "ev0")]);
    dispatcher.process(first.clone()).await;

    let mut previous: HashSet<EvidenceId> = first.evidence_ids().into_iter().collect();
    for evidence in ["ev1", "ev0", "ev2", "ev1"] {
        dispatcher.process(candidate(&[rockets("R1", evidence)])).await;
        let current: HashSet<EvidenceId> = first.evidence_ids().into_iter().collect();
        assert!(current.is_superset(&previous));
        previous = current;
    }
    assert_eq!(previous.len(), 3);
}

#[tokio::test]
async fn test_sweeper_flushes_dirty_alerts() {
    let transport = Arc::new(RecordingTransport::new());
    let alerts = engine(transport.clone(), quiet_config());
    let dispatcher = alerts.dispatcher();
    let sweeper = alerts.sweeper();

    let e1 = candidate(&[rockets("R1", "ev1"), rockets("R2", "ev1")]);
    dispatcher.process(e1.clone()).await;

    assert_eq!(sweeper.sweep_once().await.flushed, 0);

    e1.add_evidence("ev9");
    e1.mark_dirty();
    let report = sweeper.sweep_once().await;
    assert_eq!(report.flushed, 1);
    assert_eq!(report.patches_sent, 3);
    assert!(!e1.is_dirty());

    // Patching the same content again leaves every post unchanged
    let before: Vec<_> = e1.deliveries().iter().map(|d| transport.post(&d.post_id)).collect();
    e1.mark_dirty();
    sweeper.sweep_once().await;
    let after: Vec<_> = e1.deliveries().iter().map(|d| transport.post(&d.post_id)).collect();
    assert_eq!(before, after);
    assert_eq!(transport.patch_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_evicts_expired_alerts() {
    let transport = Arc::new(RecordingTransport::new());
    let alerts = engine(transport, quiet_config());
    let dispatcher = alerts.dispatcher();
    let sweeper = alerts.sweeper();

    dispatcher.process(candidate(&[rockets("R1", "ev1"), rockets("R2", "ev1")])).await;
    dispatcher
        .process(candidate(&[rockets("R3", "ev2").with_safety_seconds(90)]))
        .await;

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(sweeper.sweep_once().await.expired, 0);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(sweeper.sweep_once().await.expired, 2);
    assert_eq!(alerts.table().len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_merge_does_not_extend_expiry() {
    let transport = Arc::new(RecordingTransport::new());
    let alerts = engine(transport.clone(), merge_config());
    let dispatcher = alerts.dispatcher();

    let e1 = candidate(&[rockets("R1", "ev1")]);
    dispatcher.process(e1.clone()).await;
    let deadline = e1.expire();

    tokio::time::advance(Duration::from_secs(20)).await;
    let report = dispatcher.process(candidate(&[rockets("R1", "ev2")])).await;
    assert_eq!(report.merged, 1);
    assert_eq!(e1.expire(), deadline);

    // Still receiving evidence, but the deadline from creation applies
    tokio::time::advance(Duration::from_secs(11)).await;
    let later = candidate(&[rockets("R1", "ev3")]);
    let report = dispatcher.process(later.clone()).await;
    assert_eq!(report.correlated, 0);
    assert_eq!(report.published, 1);

    let owner = alerts.table().lookup(&RegionId::from("R1")).await.unwrap();
    assert!(Arc::ptr_eq(&owner, &later));
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_stops_on_cancel() {
    let transport = Arc::new(RecordingTransport::new());
    let alerts = engine(transport, quiet_config());
    let cancel = CancellationToken::new();

    let handle = alerts.sweeper().spawn(cancel.clone());
    tokio::time::sleep(Duration::from_secs(3)).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("sweeper did not stop")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_keep_one_owner_per_region() {
    let transport = Arc::new(RecordingTransport::new());
    let running = engine(transport.clone(), quiet_config()).start(CancellationToken::new());
    let table = running.table().clone();

    let mut producers = Vec::new();
    for producer in 0..4 {
        let intake = running.intake();
        producers.push(tokio::spawn(async move {
            for round in 0..10 {
                let events: Vec<AlertEvent> = (0..5)
                    .map(|i| rockets(&format!("R{}", (producer + round + i) % 12), &format!("ev{}-{}", producer, round)))
                    .collect();
                for candidate in batch_events(&events) {
                    intake.submit(candidate).await.unwrap();
                }
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }
    running.shutdown().await.unwrap();

    assert_eq!(table.len().await, 12);
    for i in 0..12 {
        let region = RegionId::new(format!("R{}", i));
        let owner = table.lookup(&region).await.unwrap();
        assert!(owner.region_ids().contains(&region));
        assert_eq!(owner.deliveries().len(), 3);
    }
}

#[tokio::test]
async fn test_engine_requires_destinations() {
    let result = AlertEngine::new(
        EngineConfig::default(),
        Arc::new(RecordingTransport::new()),
        Arc::new(TextPresenter::default()),
    );
    assert!(matches!(result, Err(EngineError::Config(ConfigError::NoDestinations))));
}

#[tokio::test]
async fn test_shutdown_drains_queue() {
    let transport = Arc::new(RecordingTransport::new());
    let config = EngineConfig {
        intake_capacity: 8,
        ..quiet_config()
    };
    let running = engine(transport.clone(), config).start(CancellationToken::new());

    let intake = running.intake();
    for i in 0..5 {
        intake
            .submit(AggregateAlert::from_event(&rockets(&format!("R{}", i), "ev1")))
            .await
            .unwrap();
    }
    drop(intake);

    running.shutdown().await.unwrap();
    assert_eq!(transport.create_count(), 15);
}
