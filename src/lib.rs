pub mod config;
pub mod error;
pub mod feedback;
pub mod perception;
pub mod pipeline;
pub mod situation;
pub mod speech;

pub use config::GuidanceConfig;
pub use error::{GuidanceError, SynthesisError};
pub use feedback::{DeliveryWorker, FeedbackQueue, FeedbackStats, Message};
pub use perception::Detection;
pub use pipeline::GuidancePipeline;
pub use situation::{Priority, Situation, SituationClassifier, SituationKind};
pub use speech::SpeechBackend;
