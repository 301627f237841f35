//! Detector-facing types. The detector itself lives outside this crate;
//! these are the shapes its per-frame output arrives in.

pub mod detection;
pub mod frame;

pub use detection::{Detection, DistanceCategory, DistanceConfidence, Position};
pub use frame::{DetectionRecord, FrameRecord, FrameSignature};
