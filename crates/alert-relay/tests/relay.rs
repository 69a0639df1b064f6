//! End-to-end tests for the stdin relay loop.

use std::sync::Arc;

use alert_core::{Destination, Language, RegionDirectory, StaticRegionDirectory, TextPresenter};
use alert_engine::{intake, AlertEngine, EngineConfig};
use alert_relay::{load_directory, pump, PumpStats};
use mock_transport::{RecordingTransport, TransportOp};
use tokio_util::sync::CancellationToken;

const DIRECTORY_JSON: &str = r#"[
    {"id": "1", "names": {"en": "Sderot"}, "areas": {"en": "Gaza Envelope"}, "safety_seconds": 15},
    {"id": "2", "names": {"en": "Nir Am"}, "areas": {"en": "Gaza Envelope"}, "safety_seconds": 15},
    {"id": "3", "names": {"en": "Haifa"}, "areas": {"en": "Carmel"}, "safety_seconds": 60}
]"#;

fn directory() -> Arc<dyn RegionDirectory> {
    Arc::new(StaticRegionDirectory::from_json(DIRECTORY_JSON).unwrap())
}

fn engine(transport: Arc<RecordingTransport>, directory: Arc<dyn RegionDirectory>) -> AlertEngine {
    let config = EngineConfig {
        settle_delay: None,
        ..EngineConfig::with_destinations(vec![Destination::group("en-group", Language::En)])
    };
    AlertEngine::new(config, transport, Arc::new(TextPresenter::new(directory))).unwrap()
}

#[tokio::test]
async fn test_pump_publishes_records() {
    let transport = Arc::new(RecordingTransport::new());
    let directory = directory();
    let running = engine(transport.clone(), Arc::clone(&directory)).start(CancellationToken::new());
    let intake = running.intake();

    let input = concat!(
        r#"{"evidence_id":"ev1","category":"rockets","locations":["Sderot","Nir Am","Haifa","Atlantis"],"published_at":"10:00"}"#,
        "\n",
        "\n",
        "not json\n",
        r#"{"evidence_id":"ev2","instructions":"event_over"}"#,
        "\n",
    );

    let stats = pump(input.as_bytes(), directory.as_ref(), &intake).await.unwrap();
    assert_eq!(
        stats,
        PumpStats {
            lines: 3,
            malformed: 1,
            submitted: 3,
        }
    );

    drop(intake);
    running.shutdown().await.unwrap();

    // Two safety windows make two posts, plus the region-less broadcast
    assert_eq!(transport.create_count(), 3);
    let first = match &transport.creates()[0] {
        TransportOp::Create { content, .. } => content.clone(),
        other => panic!("unexpected op {:?}", other),
    };
    assert_eq!(first.title, "Rocket and missile fire");
    assert_eq!(first.fields.len(), 1);
    assert_eq!(first.fields[0].title, "Gaza Envelope");
    assert!(first.to_plain_text().contains("#Sderot #Nir_Am"));
}

#[tokio::test]
async fn test_repeated_record_is_not_reposted() {
    let transport = Arc::new(RecordingTransport::new());
    let directory = directory();
    let running = engine(transport.clone(), Arc::clone(&directory)).start(CancellationToken::new());
    let intake = running.intake();

    let line = r#"{"evidence_id":"ev1","category":"1","locations":["Sderot"]}"#;
    let input = format!("{line}\n{line}\n");

    let stats = pump(input.as_bytes(), directory.as_ref(), &intake).await.unwrap();
    assert_eq!(stats.submitted, 2);

    drop(intake);
    running.shutdown().await.unwrap();
    assert_eq!(transport.create_count(), 1);
}

#[tokio::test]
async fn test_pump_stops_on_closed_intake() {
    let (producer, receiver) = intake(1);
    drop(receiver);

    let input = r#"{"evidence_id":"ev1","category":"rockets","locations":["Sderot"]}"#;
    let stats = pump(input.as_bytes(), directory().as_ref(), &producer).await.unwrap();
    assert_eq!(stats.lines, 1);
    assert_eq!(stats.submitted, 0);
}

#[test]
fn test_load_directory() {
    assert!(load_directory(None).unwrap().is_empty());

    let path = std::env::temp_dir().join(format!("alert-relay-regions-{}.json", std::process::id()));
    std::fs::write(&path, DIRECTORY_JSON).unwrap();
    let loaded = load_directory(Some(path.as_path())).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded.len(), 3);

    let bad = std::env::temp_dir().join(format!("alert-relay-bad-{}.json", std::process::id()));
    std::fs::write(&bad, "{").unwrap();
    let err = load_directory(Some(bad.as_path())).unwrap_err();
    std::fs::remove_file(&bad).unwrap();
    assert!(matches!(err, alert_relay::RelayError::Regions(_)));
}
