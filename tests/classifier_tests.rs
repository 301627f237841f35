use wayguide::config::ClassifierConfig;
use wayguide::perception::{Detection, DistanceCategory, DistanceConfidence, Position};
use wayguide::situation::{Priority, Situation, SituationClassifier, SituationKind};

fn det(object: &str, confidence: f32, position: Position, distance: DistanceCategory) -> Detection {
    Detection::new(object, confidence, position, distance)
}

#[test]
fn test_close_center_person_blocks() {
    let mut classifier = SituationClassifier::default();
    let (situation, changed) =
        classifier.classify(&[det("person", 0.9, Position::Center, DistanceCategory::Close)]);

    assert_eq!(situation.kind, SituationKind::Blocked);
    assert_eq!(situation.priority, Priority::High);
    assert!(!situation.safe_to_proceed);
    assert!(situation.guidance_text.contains("Stop"));
    assert!(changed, "First classification always reports a change");
}

#[test]
fn test_empty_frame_is_safe_and_low() {
    let mut classifier = SituationClassifier::default();
    let (situation, _) = classifier.classify(&[]);

    assert_eq!(situation.kind, SituationKind::NoObstacles);
    assert_eq!(situation.priority, Priority::Low);
    assert!(situation.safe_to_proceed);

    let mut affirming = SituationClassifier::new(ClassifierConfig {
        affirm_clear_path: true,
        ..ClassifierConfig::default()
    });
    let (situation, _) = affirming.classify(&[]);
    assert_eq!(situation.kind, SituationKind::PathClear);
    assert_eq!(situation.guidance_text, "Proceed");
    assert!(situation.safe_to_proceed);
}

#[test]
fn test_irrelevant_detections_never_raise_priority() {
    // Far away, or too faint to trust, in every position and combination.
    let frames = vec![
        vec![det("person", 0.9, Position::Center, DistanceCategory::Far)],
        vec![det("car", 0.3, Position::Center, DistanceCategory::Close)],
        vec![
            det("dog", 0.1, Position::Left, DistanceCategory::Close),
            det("bike", 0.99, Position::Right, DistanceCategory::Far),
            det("pole", 0.25, Position::Center, DistanceCategory::Medium),
        ],
    ];

    for frame in frames {
        let mut classifier = SituationClassifier::default();
        let (situation, _) = classifier.classify(&frame);
        assert_eq!(situation.priority, Priority::Low, "frame {:?}", frame);
        assert!(situation.safe_to_proceed, "frame {:?}", frame);
    }
}

#[test]
fn test_same_frame_twice_is_not_a_change() {
    let mut classifier = SituationClassifier::default();
    let frame = vec![det("chair", 0.8, Position::Left, DistanceCategory::Close)];

    let (_, first) = classifier.classify(&frame);
    let (_, second) = classifier.classify(&frame);

    assert!(first);
    assert!(!second, "Identical input must not report a change");
}

#[test]
fn test_close_left_steers_right() {
    let mut classifier = SituationClassifier::default();
    let (situation, _) = classifier.classify(&[det("chair", 0.8, Position::Left, DistanceCategory::Close)]);

    assert_eq!(situation.kind, SituationKind::ObstacleLeft);
    assert_eq!(situation.guidance_text, "Right");
    assert_eq!(situation.priority, Priority::High);
}

#[test]
fn test_close_right_steers_left() {
    let mut classifier = SituationClassifier::default();
    let (situation, _) = classifier.classify(&[det("bin", 0.8, Position::Right, DistanceCategory::Close)]);

    assert_eq!(situation.kind, SituationKind::ObstacleRight);
    assert_eq!(situation.guidance_text, "Left");
    assert_eq!(situation.priority, Priority::High);
}

#[test]
fn test_close_on_both_sides_avoids_the_left_one() {
    let mut classifier = SituationClassifier::default();
    let (situation, _) = classifier.classify(&[
        det("bin", 0.8, Position::Right, DistanceCategory::Close),
        det("chair", 0.8, Position::Left, DistanceCategory::Close),
    ]);

    assert_eq!(situation.kind, SituationKind::ObstacleLeft);
}

#[test]
fn test_medium_center_with_close_side_obstacle_blocks() {
    let mut classifier = SituationClassifier::default();
    let (situation, _) = classifier.classify(&[
        det("person", 0.7, Position::Center, DistanceCategory::Medium),
        det("wall", 0.7, Position::Right, DistanceCategory::Close),
    ]);

    assert_eq!(situation.kind, SituationKind::Blocked);
}

#[test]
fn test_medium_only_is_path_clear() {
    let mut classifier = SituationClassifier::default();
    let (situation, _) = classifier.classify(&[det("person", 0.7, Position::Center, DistanceCategory::Medium)]);

    assert_eq!(situation.kind, SituationKind::PathClear);
    assert_eq!(situation.priority, Priority::Low);
    assert_eq!(situation.guidance_text, "Proceed");
}

#[test]
fn test_blocked_guidance_carries_reliable_distance() {
    let mut classifier = SituationClassifier::default();
    let (situation, _) = classifier.classify(&[
        det("person", 0.9, Position::Center, DistanceCategory::Close).with_distance(1.24, DistanceConfidence::High),
        det("cart", 0.9, Position::Center, DistanceCategory::Close).with_distance(2.0, DistanceConfidence::Medium),
    ]);

    assert_eq!(situation.guidance_text, "Stop, person 1.2 meters ahead");
}

#[test]
fn test_low_confidence_distance_is_not_spoken() {
    let mut classifier = SituationClassifier::default();
    let (situation, _) = classifier.classify(&[
        det("person", 0.9, Position::Center, DistanceCategory::Close).with_distance(1.0, DistanceConfidence::Low),
    ]);

    assert_eq!(situation.guidance_text, "Stop");
}

#[test]
fn test_text_change_within_same_kind_is_not_a_change() {
    let mut classifier = SituationClassifier::default();
    let near = det("person", 0.9, Position::Center, DistanceCategory::Close).with_distance(1.0, DistanceConfidence::High);
    let nearer = det("person", 0.9, Position::Center, DistanceCategory::Close).with_distance(0.6, DistanceConfidence::High);

    let (first, _) = classifier.classify(&[near]);
    let (second, changed) = classifier.classify(&[nearer]);

    assert_ne!(first.guidance_text, second.guidance_text);
    assert_eq!(first, second, "Situations of the same kind compare equal");
    assert!(!changed);
}

#[test]
fn test_situations_of_different_kinds_are_not_equal() {
    let stop = Situation::plain(SituationKind::Blocked);
    let described = Situation::new(SituationKind::Blocked, "A person is standing ahead");
    let clear = Situation::plain(SituationKind::PathClear);

    assert_eq!(stop, described);
    assert_ne!(stop, clear);
}

#[test]
fn test_any_state_can_follow_any_state() {
    let mut classifier = SituationClassifier::default();
    let sequence = [
        (vec![det("person", 0.9, Position::Center, DistanceCategory::Close)], SituationKind::Blocked),
        (vec![], SituationKind::NoObstacles),
        (vec![det("chair", 0.9, Position::Left, DistanceCategory::Close)], SituationKind::ObstacleLeft),
        (vec![det("chair", 0.9, Position::Right, DistanceCategory::Close)], SituationKind::ObstacleRight),
        (vec![det("chair", 0.9, Position::Right, DistanceCategory::Medium)], SituationKind::PathClear),
        (vec![det("person", 0.9, Position::Center, DistanceCategory::Close)], SituationKind::Blocked),
    ];

    for (frame, expected) in sequence {
        let (situation, changed) = classifier.classify(&frame);
        assert_eq!(situation.kind, expected);
        assert!(changed, "{:?} should be reported as a change", expected);
    }
    assert_eq!(classifier.last_kind(), Some(SituationKind::Blocked));

    classifier.reset();
    let (_, changed) = classifier.classify(&[det("person", 0.9, Position::Center, DistanceCategory::Close)]);
    assert!(changed, "Reset forgets history");
}
