// tests/integration/pipeline_tests.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use facewatch::{
    core::{gating::effects::ALERT_TOPIC, services::PipelineEvent},
    storage::{ProfileStore, ThreatLevel},
};

use crate::common::{face_at, png, test_config, turned, ScriptedDetector, TestContext};

const WAIT: Duration = Duration::from_secs(5);

async fn next_identified(
    events: &mut tokio::sync::broadcast::Receiver<PipelineEvent>,
) -> PipelineEvent {
    timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(event @ PipelineEvent::PersonIdentified { .. }) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event channel closed: {}", e),
            }
        }
    })
    .await
    .expect("no person identified in time")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_high_threat_sighting_alerts_logs_and_augments() {
    let detector = ScriptedDetector::always(vec![turned(
        face_at(120.0, 120.0, vec![0.9, 0.1, 0.0, 0.0]),
        25.0,
    )]);
    let ctx = TestContext::new(test_config(), Arc::new(detector));
    ctx.seed("p1", "Mallory", ThreatLevel::High, vec![1.0, 0.0, 0.0, 0.0])
        .await;
    ctx.services
        .effects
        .register_camera("cam-1", &["Lobby".to_string(), "Gate B".to_string()])
        .await
        .unwrap();

    let mut alerts = ctx.pubsub.subscribe(ALERT_TOPIC);
    let mut events = ctx.services.subscribe_events();

    ctx.relay.push("cam-1", png(320, 240));
    assert!(ctx.manager.start("cam-1"));

    match next_identified(&mut events).await {
        PipelineEvent::PersonIdentified {
            source, identity, ..
        } => {
            assert_eq!(source, "cam-1");
            assert_eq!(identity.id, "p1");
        }
        other => panic!("unexpected event {:?}", other),
    }

    let raw = timeout(WAIT, alerts.recv())
        .await
        .expect("no alert in time")
        .unwrap();
    let alert: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(alert["message"], "High Security Alert: Mallory spotted at cam-1");

    let activity = ctx.store.activity_report("p1", 10, None).await.unwrap();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].locations, vec!["Lobby", "Gate B"]);

    // The turned pose was stored as a second reference.
    timeout(WAIT, async {
        while ctx.store.find("p1").await.unwrap().unwrap().embeddings.len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("profile was not augmented");

    ctx.manager.shutdown_all().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_results_publish_and_clear_on_stop() {
    let detector = ScriptedDetector::always(vec![
        face_at(60.0, 60.0, vec![0.0, 0.0, 1.0, 0.0]),
        face_at(250.0, 60.0, vec![0.0, 0.0, 0.0, 1.0]),
    ]);
    let ctx = TestContext::new(test_config(), Arc::new(detector));

    ctx.relay.push("cam-1", png(320, 240));
    ctx.manager.start("cam-1");

    let faces = timeout(WAIT, async {
        loop {
            let faces = ctx.manager.latest_results("cam-1").unwrap();
            if !faces.is_empty() {
                return faces;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("no results published");

    let mut ids: Vec<u64> = faces.iter().map(|f| f.track_id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
    assert!(faces.iter().all(|f| f.name.is_none()));

    assert!(ctx.manager.stop("cam-1").await);
    assert!(ctx.manager.latest_results("cam-1").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_index_update_invalidates_stream_results() {
    let detector = ScriptedDetector::always(vec![face_at(60.0, 60.0, vec![1.0, 0.0, 0.0, 0.0])]);
    let ctx = TestContext::new(test_config(), Arc::new(detector));
    ctx.seed("p1", "Ada", ThreatLevel::Low, vec![1.0, 0.0, 0.0, 0.0])
        .await;

    let mut events = ctx.services.subscribe_events();
    ctx.relay.push("cam-1", png(160, 120));
    ctx.manager.start("cam-1");
    next_identified(&mut events).await;

    ctx.services.index.delete_profile("p1").await.unwrap();

    // The relay frame is not re-processed, so results stay cleared.
    timeout(WAIT, async {
        while !ctx.manager.latest_results("cam-1").unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("results were not cleared");

    ctx.manager.shutdown_all().await;
}
