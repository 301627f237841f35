//! Spoken feedback delivery: a bounded mailbox and the single worker that
//! drains it into the speech backend.

pub mod message;
pub mod queue;
pub mod stats;
pub mod worker;

pub use message::Message;
pub use queue::{FeedbackQueue, SubmitOutcome};
pub use stats::{DeliveryStats, FeedbackStats, QueueCounters};
pub use worker::DeliveryWorker;
