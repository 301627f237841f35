use std::time::Duration;

use tokio::time::Instant;

/// Submit-side outcomes. Saturation and dedup are policy, not errors, but
/// they are counted so the UI can show them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounters {
    pub admitted: u64,
    pub deduplicated: u64,
    pub evicted: u64,
    pub dropped_full: u64,
}

/// Worker-side record. Written only by the delivery worker; callers get copies.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryStats {
    /// Messages that went through the speak path (spoken, or dropped after the retry failed).
    pub messages_processed: u64,
    pub last_processing_delay: Option<Duration>,
    pub last_processed_at: Option<Instant>,
    pub stale_dropped: u64,
    /// Failures that the reinit + retry recovered from.
    pub recovered_failures: u64,
    /// Messages dropped because the retry failed too.
    pub delivery_failures: u64,
}

/// Diagnostics snapshot for on-screen display.
#[derive(Debug, Clone, Default)]
pub struct FeedbackStats {
    pub queue_size: usize,
    pub messages_processed: u64,
    pub last_message_delay: Option<Duration>,
    pub time_since_last_processed: Option<Duration>,
    pub queue: QueueCounters,
    pub stale_dropped: u64,
    pub recovered_failures: u64,
    pub delivery_failures: u64,
}

impl FeedbackStats {
    pub fn compose(queue_size: usize, queue: QueueCounters, delivery: DeliveryStats, now: Instant) -> Self {
        Self {
            queue_size,
            messages_processed: delivery.messages_processed,
            last_message_delay: delivery.last_processing_delay,
            time_since_last_processed: delivery
                .last_processed_at
                .map(|at| now.saturating_duration_since(at)),
            queue,
            stale_dropped: delivery.stale_dropped,
            recovered_failures: delivery.recovered_failures,
            delivery_failures: delivery.delivery_failures,
        }
    }

    /// Everything the pipeline chose not to say.
    pub fn total_dropped(&self) -> u64 {
        self.queue.dropped_full + self.queue.evicted + self.stale_dropped + self.delivery_failures
    }
}
