pub mod classifier;
pub mod types;

pub use classifier::SituationClassifier;
pub use types::{Priority, Situation, SituationKind};
