use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    High,
}

/// Discrete navigational state derived from one frame of detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SituationKind {
    /// Nothing relevant in view.
    NoObstacles,
    /// Objects in view but none close; keep going.
    PathClear,
    /// Close obstacle with something ahead. Stop.
    Blocked,
    /// Close obstacle on the left; steer right.
    ObstacleLeft,
    /// Close obstacle off to the side (not left); steer left.
    ObstacleRight,
}

impl SituationKind {
    pub fn priority(self) -> Priority {
        match self {
            SituationKind::NoObstacles | SituationKind::PathClear => Priority::Low,
            SituationKind::Blocked | SituationKind::ObstacleLeft | SituationKind::ObstacleRight => {
                Priority::High
            }
        }
    }

    pub fn safe_to_proceed(self) -> bool {
        matches!(self, SituationKind::NoObstacles | SituationKind::PathClear)
    }

    /// Base instruction before any distance detail is appended.
    pub fn base_guidance(self) -> &'static str {
        match self {
            SituationKind::NoObstacles => "Path is clear",
            SituationKind::PathClear => "Proceed",
            SituationKind::Blocked => "Stop",
            SituationKind::ObstacleLeft => "Right",
            SituationKind::ObstacleRight => "Left",
        }
    }
}

/// Two situations are equal when their kinds are; the guidance text may
/// differ (distance detail, description override) without being a change.
#[derive(Debug, Clone, Serialize)]
pub struct Situation {
    pub kind: SituationKind,
    pub guidance_text: String,
    pub priority: Priority,
    pub safe_to_proceed: bool,
}

impl PartialEq for Situation {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Situation {}

impl Situation {
    pub fn new(kind: SituationKind, guidance_text: impl Into<String>) -> Self {
        Self {
            kind,
            guidance_text: guidance_text.into(),
            priority: kind.priority(),
            safe_to_proceed: kind.safe_to_proceed(),
        }
    }

    pub fn plain(kind: SituationKind) -> Self {
        Self::new(kind, kind.base_guidance())
    }
}
