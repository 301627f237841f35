use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use super::message::Message;
use super::stats::QueueCounters;
use crate::config::QueueConfig;
use crate::situation::Priority;

/// What `submit` did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    /// Queued after evicting the oldest Low priority entry.
    QueuedWithEviction,
    /// Same text was queued within the cooldown window.
    Deduplicated,
    /// Queue full and nothing it was allowed to evict.
    DroppedFull,
}

impl SubmitOutcome {
    pub fn was_queued(self) -> bool {
        matches!(self, SubmitOutcome::Queued | SubmitOutcome::QueuedWithEviction)
    }
}

#[derive(Debug)]
struct QueueState {
    pending: VecDeque<Message>,
    last_text: Option<String>,
    last_sent_at: Option<Instant>,
    counters: QueueCounters,
}

/// Bounded, priority-aware mailbox between the perception loop and the
/// delivery worker. The only state the two sides share.
///
/// Invariant: `pending.len() <= capacity`. A High message may displace a
/// Low one, never another High one.
#[derive(Debug)]
pub struct FeedbackQueue {
    capacity: usize,
    cooldown: Duration,
    state: Mutex<QueueState>,
    available: Notify,
}

impl FeedbackQueue {
    pub fn new(capacity: usize, cooldown: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            cooldown,
            state: Mutex::new(QueueState {
                pending: VecDeque::with_capacity(capacity),
                last_text: None,
                last_sent_at: None,
                counters: QueueCounters::default(),
            }),
            available: Notify::new(),
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.capacity, config.cooldown())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Every critical section leaves the state consistent, so a panic while
    // holding the lock does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Offer a message. Never blocks on the consumer.
    pub fn submit(&self, text: impl Into<String>, priority: Priority) -> SubmitOutcome {
        let text = text.into();
        let now = Instant::now();
        let mut state = self.lock();

        let repeat = state.last_text.as_deref() == Some(text.as_str())
            && state
                .last_sent_at
                .is_some_and(|at| now.saturating_duration_since(at) < self.cooldown);
        if repeat {
            state.counters.deduplicated += 1;
            debug!(text = %text, "Suppressed repeat within cooldown");
            return SubmitOutcome::Deduplicated;
        }

        let mut outcome = SubmitOutcome::Queued;
        if state.pending.len() >= self.capacity {
            let victim = match priority {
                Priority::High => state.pending.iter().position(|m| m.priority() == Priority::Low),
                Priority::Low => None,
            };
            match victim {
                Some(index) => {
                    if let Some(evicted) = state.pending.remove(index) {
                        debug!(id = %evicted.id(), "Evicted low priority message");
                    }
                    state.counters.evicted += 1;
                    outcome = SubmitOutcome::QueuedWithEviction;
                }
                None => {
                    state.counters.dropped_full += 1;
                    debug!(?priority, text = %text, "Queue saturated, dropping message");
                    return SubmitOutcome::DroppedFull;
                }
            }
        }

        let message = Message::new(text, priority);
        state.last_text = Some(message.text().to_string());
        state.last_sent_at = Some(message.enqueued_at());
        state.counters.admitted += 1;
        debug!(id = %message.id(), ?priority, "Queued message");
        state.pending.push_back(message);
        drop(state);

        self.available.notify_one();
        outcome
    }

    /// Pop the oldest pending message without waiting.
    pub fn try_take(&self) -> Option<Message> {
        self.lock().pending.pop_front()
    }

    /// Wait up to `timeout` for a message. `None` on timeout is normal.
    pub async fn take_next(&self, timeout: Duration) -> Option<Message> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(message) = self.try_take() {
                return Some(message);
            }
            // notify_one stores a permit when nobody is waiting, so a submit
            // landing between try_take and here is not lost.
            if tokio::time::timeout_at(deadline, self.available.notified()).await.is_err() {
                return self.try_take();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Texts in queue order, for diagnostics.
    pub fn pending_texts(&self) -> Vec<String> {
        self.lock().pending.iter().map(|m| m.text().to_string()).collect()
    }

    pub fn counters(&self) -> QueueCounters {
        self.lock().counters
    }
}
