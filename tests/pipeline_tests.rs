use std::time::Duration;

use wayguide::config::GuidanceConfig;
use wayguide::perception::{Detection, DistanceCategory, FrameRecord, Position};
use wayguide::speech::{ScriptedBackend, SpokenLog};
use wayguide::{GuidancePipeline, Priority, SituationKind};

fn pipeline() -> (GuidancePipeline, SpokenLog) {
    let mut config = GuidanceConfig::default();
    config.delivery.high_priority_prefix = String::new();
    config.delivery.poll_interval_ms = 50;
    config.queue.capacity = 3;
    let (backend, log) = ScriptedBackend::new();
    (GuidancePipeline::start(&config, backend), log)
}

async fn wait_spoken(log: &SpokenLog, count: usize) {
    for _ in 0..300 {
        if log.spoken().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} utterances, got {:?}", count, log.spoken());
}

fn person_ahead() -> Vec<Detection> {
    vec![Detection::new("person", 0.9, Position::Center, DistanceCategory::Close)]
}

#[tokio::test]
async fn test_only_changes_are_spoken() {
    let (mut pipeline, log) = pipeline();

    let (situation, changed) = pipeline.observe(&person_ahead());
    assert!(changed);
    assert_eq!(situation.kind, SituationKind::Blocked);

    // Same scene on the next few frames: nothing new to say.
    for _ in 0..3 {
        let (_, changed) = pipeline.observe(&person_ahead());
        assert!(!changed);
    }

    let (situation, changed) = pipeline.observe(&[]);
    assert!(changed);
    assert_eq!(situation.kind, SituationKind::NoObstacles);

    wait_spoken(&log, 2).await;
    assert_eq!(log.spoken(), vec!["Stop", "Path is clear"]);

    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_confidence_jitter_reuses_last_situation() {
    let (mut pipeline, _log) = pipeline();

    pipeline.observe(&person_ahead());
    let jittered = vec![Detection::new("person", 0.55, Position::Center, DistanceCategory::Close)];
    let (situation, changed) = pipeline.observe(&jittered);

    assert!(!changed);
    assert_eq!(situation.kind, SituationKind::Blocked);
    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_guidance_override_keeps_classifier_priority() {
    let (mut pipeline, log) = pipeline();

    let description = "A person is standing directly ahead, stop and wait".to_string();
    let (situation, changed) = pipeline.observe_with_guidance(&person_ahead(), Some(description.clone()));

    assert!(changed);
    assert_eq!(situation.guidance_text, description);
    assert_eq!(situation.priority, Priority::High);

    wait_spoken(&log, 1).await;
    assert_eq!(log.spoken(), vec![description]);
    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_blank_override_falls_back_to_classifier_text() {
    let (mut pipeline, _log) = pipeline();

    let (situation, _) = pipeline.observe_with_guidance(&person_ahead(), Some("   ".to_string()));

    assert_eq!(situation.guidance_text, "Stop");
    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_override_on_unchanged_frame_updates_text_only() {
    let (mut pipeline, log) = pipeline();

    pipeline.observe(&person_ahead());
    let description = "A person is waiting at the door ahead".to_string();
    let (situation, changed) = pipeline.observe_with_guidance(&person_ahead(), Some(description.clone()));

    assert!(!changed);
    assert_eq!(situation.guidance_text, description);
    assert_eq!(situation.priority, Priority::High);

    // The override sticks for later identical frames.
    let (situation, _) = pipeline.observe(&person_ahead());
    assert_eq!(situation.guidance_text, description);

    pipeline.drained().await;
    assert_eq!(log.spoken(), vec!["Stop"], "An unchanged situation is not spoken again");
    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_json_frames_drive_the_pipeline() {
    let (mut pipeline, log) = pipeline();

    let frames = [
        r#"{"detections":[{"object":"person","confidence":0.91,"bbox":[280,40,360,300]}],"frame_size":[320,640]}"#,
        r#"{"detections":[{"object":"chair","confidence":0.8,"position":"left","distance":"close"}]}"#,
        r#"{"detections":[]}"#,
    ];
    let mut kinds = Vec::new();
    for line in frames {
        let detections = FrameRecord::parse(line).unwrap().into_detections();
        let (situation, _) = pipeline.observe(&detections);
        kinds.push(situation.kind);
    }

    assert_eq!(
        kinds,
        vec![SituationKind::Blocked, SituationKind::ObstacleLeft, SituationKind::NoObstacles]
    );

    wait_spoken(&log, 3).await;
    assert_eq!(log.spoken(), vec!["Stop", "Right", "Path is clear"]);

    // Stats land just after the utterance returns.
    let mut stats = pipeline.stats();
    for _ in 0..100 {
        if stats.messages_processed == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        stats = pipeline.stats();
    }
    assert_eq!(stats.messages_processed, 3);
    assert_eq!(stats.queue.admitted, 3);
    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_observe_never_waits_for_speech() {
    let (mut pipeline, log) = pipeline();
    log.set_speak_delay(Duration::from_millis(300));

    let started = std::time::Instant::now();
    pipeline.observe(&person_ahead());
    pipeline.observe(&[]);
    pipeline.observe(&person_ahead());

    assert!(started.elapsed() < Duration::from_millis(100), "Producer must not block on speech");
    pipeline.shutdown().await.unwrap();
}
