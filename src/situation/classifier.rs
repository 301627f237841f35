use tracing::debug;

use super::types::{Situation, SituationKind};
use crate::config::ClassifierConfig;
use crate::perception::{Detection, DistanceCategory, Position};

/// Turns a frame of detections into a `Situation` and remembers the last
/// kind it reported, so callers learn when the scene actually changed.
///
/// History is owned by the instance; run one classifier per perception loop.
#[derive(Debug, Clone)]
pub struct SituationClassifier {
    config: ClassifierConfig,
    last_kind: Option<SituationKind>,
}

impl Default for SituationClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl SituationClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            last_kind: None,
        }
    }

    pub fn last_kind(&self) -> Option<SituationKind> {
        self.last_kind
    }

    /// Forget history; the next call reports `changed = true`.
    pub fn reset(&mut self) {
        self.last_kind = None;
    }

    /// Classify one frame. `changed` is true when the kind differs from the
    /// previous call's, and always on the first call.
    pub fn classify(&mut self, detections: &[Detection]) -> (Situation, bool) {
        let situation = self.evaluate(detections);
        let changed = self.last_kind != Some(situation.kind);
        if changed {
            debug!(from = ?self.last_kind, to = ?situation.kind, "Situation changed");
        }
        self.last_kind = Some(situation.kind);
        (situation, changed)
    }

    /// Pure decision: detections -> situation. Does not touch history.
    pub fn evaluate(&self, detections: &[Detection]) -> Situation {
        let relevant: Vec<&Detection> = detections
            .iter()
            .filter(|d| d.distance_category != DistanceCategory::Far && d.confidence > self.config.min_confidence)
            .collect();

        if relevant.is_empty() {
            return if self.config.affirm_clear_path {
                Situation::plain(SituationKind::PathClear)
            } else {
                Situation::plain(SituationKind::NoObstacles)
            };
        }

        let has_close = relevant.iter().any(|d| d.distance_category == DistanceCategory::Close);
        let has_center = relevant
            .iter()
            .any(|d| d.position == Position::Center && d.distance_category != DistanceCategory::Far);
        let has_close_left = relevant
            .iter()
            .any(|d| d.position == Position::Left && d.distance_category == DistanceCategory::Close);

        // First match wins. A close obstacle on the left always steers right,
        // even when another close obstacle sits on the right.
        if has_close && has_center {
            Situation::new(SituationKind::Blocked, blocked_guidance(&relevant))
        } else if has_close && has_close_left {
            Situation::plain(SituationKind::ObstacleLeft)
        } else if has_close {
            Situation::plain(SituationKind::ObstacleRight)
        } else {
            Situation::plain(SituationKind::PathClear)
        }
    }
}

/// "Stop", with the nearest trustworthy centre distance when there is one.
fn blocked_guidance(relevant: &[&Detection]) -> String {
    let nearest = relevant
        .iter()
        .filter(|d| d.position == Position::Center)
        .filter_map(|d| d.reliable_distance().map(|m| (d, m)))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    match nearest {
        Some((det, meters)) => format!(
            "{}, {} {:.1} meters ahead",
            SituationKind::Blocked.base_guidance(),
            det.object_class,
            meters
        ),
        None => SituationKind::Blocked.base_guidance().to_string(),
    }
}
