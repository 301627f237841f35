use std::collections::HashSet;

use serde::Deserialize;
use tracing::debug;

use super::detection::{Detection, DistanceCategory, DistanceConfidence, Position};

/// Capture size the detector runs at when a frame does not say otherwise.
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 320;

/// One line of detector output as the driver reads it.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameRecord {
    #[serde(default)]
    pub detections: Vec<DetectionRecord>,
    /// `[height, width]` in pixels.
    #[serde(default)]
    pub frame_size: Option<[u32; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionRecord {
    pub object: String,
    pub confidence: f32,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub distance: Option<DistanceCategory>,
    #[serde(default)]
    pub distance_meters: Option<f32>,
    #[serde(default)]
    pub distance_confidence: Option<DistanceConfidence>,
    #[serde(default)]
    pub bbox: Option<[f32; 4]>,
}

impl FrameRecord {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Converts the records, deriving position and distance from the box when
    /// the detector left them out. Records with neither are skipped.
    pub fn into_detections(self) -> Vec<Detection> {
        let (height, width) = match self.frame_size {
            Some([h, w]) if h > 0 && w > 0 => (h, w),
            _ => (DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH),
        };

        self.detections
            .into_iter()
            .filter_map(|record| record.into_detection(width, height))
            .collect()
    }
}

impl DetectionRecord {
    fn into_detection(self, width: u32, height: u32) -> Option<Detection> {
        let mut detection = match (self.position, self.distance, self.bbox) {
            (Some(position), Some(distance), _) => {
                Detection::new(self.object, self.confidence, position, distance)
            }
            (position, distance, Some(bbox)) => {
                let mut derived = Detection::from_bbox(self.object, self.confidence, bbox, width, height);
                if let Some(p) = position {
                    derived.position = p;
                }
                if let Some(d) = distance {
                    derived.distance_category = d;
                }
                derived
            }
            _ => {
                debug!("Skipping '{}' record without position/distance or bbox", self.object);
                return None;
            }
        };

        detection.distance_meters = self.distance_meters;
        detection.distance_confidence = self.distance_confidence.unwrap_or_default();
        Some(detection)
    }
}

/// Coarse identity of a frame: which confident objects, how near, which side.
/// Confidence jitter above the floor and box wobble do not change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSignature {
    count: usize,
    entries: HashSet<(String, DistanceCategory, Position)>,
}

impl FrameSignature {
    pub fn of(detections: &[Detection], min_confidence: f32) -> Self {
        let entries: Vec<_> = detections
            .iter()
            .filter(|d| d.confidence > min_confidence)
            .map(|d| (d.object_class.clone(), d.distance_category, d.position))
            .collect();
        Self {
            count: entries.len(),
            entries: entries.into_iter().collect(),
        }
    }
}
