// tests/integration/recognition_tests.rs
use std::sync::Arc;

use facewatch::{
    core::{
        detection::{BoundingBox, Detection, NullDetector},
        recognition::{Augmentation, RecognitionIndex, ValidationError},
    },
    storage::{NewProfile, ProfileStore, RocksProfileStore},
    utils::{
        config::{EvictionPolicy, RecognitionConfig},
        error::PipelineError,
    },
};
use tempfile::tempdir;

use crate::common::{png, test_config, MockFaceDetector, TestContext, DIM};

fn one_face(embedding: Vec<f32>) -> Vec<Detection> {
    vec![Detection::new(BoundingBox::new(8.0, 8.0, 40.0, 40.0), embedding)]
}

fn fields(id: &str, name: &str) -> NewProfile {
    NewProfile {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_enrollment_detects_exactly_once_and_is_searchable() {
    let mut detector = MockFaceDetector::new();
    detector
        .expect_detect()
        .times(1)
        .returning(|_| Ok(one_face(vec![0.0, 3.0, 4.0, 0.0])));

    let ctx = TestContext::new(test_config(), Arc::new(detector));
    let profile = ctx
        .services
        .index
        .enroll(&png(64, 64), fields("p1", "Ada"))
        .await
        .expect("enroll");

    assert_eq!(profile.embeddings, vec![vec![0.0, 0.6, 0.8, 0.0]]);
    assert!(!profile.thumbnail.is_empty());

    let hit = ctx
        .services
        .index
        .query(&[0.0, 0.6, 0.8, 0.0], 0.48)
        .unwrap()
        .expect("match");
    assert_eq!(hit.metadata.name, "Ada");
    assert!((hit.similarity - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_enrollment_with_crowd_is_rejected_without_writes() {
    let mut detector = MockFaceDetector::new();
    detector.expect_detect().returning(|_| {
        let mut faces = one_face(vec![1.0, 0.0, 0.0, 0.0]);
        faces.extend(one_face(vec![0.0, 1.0, 0.0, 0.0]));
        faces.extend(one_face(vec![0.0, 0.0, 1.0, 0.0]));
        Ok(faces)
    });

    let ctx = TestContext::new(test_config(), Arc::new(detector));
    let err = ctx
        .services
        .index
        .enroll(&png(64, 64), fields("p1", "Ada"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Validation(ValidationError::MultipleFaces(3))
    ));
    assert!(ctx.store.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_detector_failure_surfaces_on_enrollment() {
    let mut detector = MockFaceDetector::new();
    detector
        .expect_detect()
        .returning(|_| Err(PipelineError::Detector("model not loaded".into())));

    let ctx = TestContext::new(test_config(), Arc::new(detector));
    let err = ctx
        .services
        .index
        .enroll(&png(64, 64), fields("p1", "Ada"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Detector(_)));
}

#[tokio::test]
async fn test_profiles_survive_reopening_rocksdb() {
    let dir = tempdir().unwrap();
    let config = RecognitionConfig {
        dimension: DIM,
        ..Default::default()
    };

    {
        let mut detector = MockFaceDetector::new();
        detector
            .expect_detect()
            .returning(|_| Ok(one_face(vec![1.0, 0.0, 0.0, 0.0])));

        let store = Arc::new(RocksProfileStore::open(dir.path()).unwrap());
        let index = RecognitionIndex::new(store, Arc::new(detector), config.clone());
        index.enroll(&png(64, 64), fields("p1", "Ada")).await.unwrap();
    }

    let store = Arc::new(RocksProfileStore::open(dir.path()).unwrap());
    let index = RecognitionIndex::new(store, Arc::new(NullDetector), config);
    assert_eq!(index.rebuild().await.unwrap(), 1);

    let hit = index.query(&[1.0, 0.0, 0.0, 0.0], 0.48).unwrap().unwrap();
    assert_eq!(hit.metadata.id, "p1");
}

#[tokio::test]
async fn test_augmentation_cap_keeps_enrolled_reference() {
    let mut config = test_config();
    config.recognition.max_references = 3;
    config.recognition.eviction = EvictionPolicy::OldestFirst;

    let ctx = TestContext::new(config, Arc::new(NullDetector));
    ctx.seed("p1", "Ada", Default::default(), vec![1.0, 0.0, 0.0, 0.0])
        .await;

    let index = &ctx.services.index;
    let poses = [
        vec![0.9, 0.1, 0.0, 0.0],
        vec![0.9, 0.0, 0.1, 0.0],
        vec![0.9, 0.0, 0.0, 0.1],
    ];

    assert_eq!(
        index.augment("p1", &poses[0]).await.unwrap(),
        Augmentation::Appended { references: 2 }
    );
    assert_eq!(
        index.augment("p1", &poses[1]).await.unwrap(),
        Augmentation::Appended { references: 3 }
    );
    assert_eq!(
        index.augment("p1", &poses[2]).await.unwrap(),
        Augmentation::Replaced { evicted: 1, references: 3 }
    );

    let stored = ctx.store.find("p1").await.unwrap().unwrap();
    assert_eq!(stored.embeddings[0], vec![1.0, 0.0, 0.0, 0.0]);
    assert_eq!(stored.embeddings.len(), 3);
    assert_eq!(index.len(), 3);
}
