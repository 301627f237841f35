use std::fmt;

use serde::{Deserialize, Serialize};

/// Horizontal third of the frame an object sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceCategory {
    Close,
    Medium,
    Far,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceConfidence {
    #[default]
    Low,
    Medium,
    High,
}

/// One object seen in one frame. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub object_class: String,
    pub confidence: f32,
    pub position: Position,
    pub distance_category: DistanceCategory,
    pub distance_meters: Option<f32>,
    pub distance_confidence: DistanceConfidence,
}

impl Detection {
    pub fn new(
        object_class: impl Into<String>,
        confidence: f32,
        position: Position,
        distance_category: DistanceCategory,
    ) -> Self {
        Self {
            object_class: object_class.into(),
            confidence: confidence.clamp(0.0, 1.0),
            position,
            distance_category,
            distance_meters: None,
            distance_confidence: DistanceConfidence::Low,
        }
    }

    pub fn with_distance(mut self, meters: f32, confidence: DistanceConfidence) -> Self {
        self.distance_meters = Some(meters);
        self.distance_confidence = confidence;
        self
    }

    /// Builds a detection from a detector bounding box `[x1, y1, x2, y2]` in
    /// pixels of a `frame_width` x `frame_height` frame.
    ///
    /// Position comes from the box centre (thirds of the width); the distance
    /// category comes from box height relative to the frame (taller than a
    /// third is close, shorter than a sixth is far).
    pub fn from_bbox(
        object_class: impl Into<String>,
        confidence: f32,
        bbox: [f32; 4],
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let [x1, y1, x2, y2] = bbox;
        let width = frame_width as f32;
        let height = frame_height as f32;

        let center_x = (x1 + x2) / 2.0;
        let position = if center_x < width / 3.0 {
            Position::Left
        } else if center_x > 2.0 * width / 3.0 {
            Position::Right
        } else {
            Position::Center
        };

        let box_height = (y2 - y1).abs();
        let distance_category = if box_height > height / 3.0 {
            DistanceCategory::Close
        } else if box_height < height / 6.0 {
            DistanceCategory::Far
        } else {
            DistanceCategory::Medium
        };

        Self::new(object_class, confidence, position, distance_category)
    }

    /// Missing metric distance always counts as low confidence.
    pub fn effective_distance_confidence(&self) -> DistanceConfidence {
        match self.distance_meters {
            Some(_) => self.distance_confidence,
            None => DistanceConfidence::Low,
        }
    }

    /// Metric distance only when it is trustworthy enough to speak aloud.
    pub fn reliable_distance(&self) -> Option<f32> {
        match self.effective_distance_confidence() {
            DistanceConfidence::Low => None,
            _ => self.distance_meters,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Position::Left => "left",
            Position::Center => "center",
            Position::Right => "right",
        })
    }
}

impl fmt::Display for DistanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DistanceCategory::Close => "close",
            DistanceCategory::Medium => "medium",
            DistanceCategory::Far => "far",
        })
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} in the {} ({:.0}% confidence)",
            self.object_class,
            self.distance_category,
            self.position,
            self.confidence * 100.0
        )?;
        if let Some(meters) = self.distance_meters {
            write!(f, " ~{:.1}m", meters)?;
        }
        Ok(())
    }
}
