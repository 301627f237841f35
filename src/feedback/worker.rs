use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::message::Message;
use super::queue::FeedbackQueue;
use super::stats::{DeliveryStats, FeedbackStats};
use crate::config::DeliveryConfig;
use crate::error::{GuidanceError, GuidanceResult, SynthesisError};
use crate::speech::SpeechBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Spoken,
    /// Spoken on the retry after a reinit.
    Recovered,
    Failed,
}

/// The single consumer of a `FeedbackQueue`. Owns the speech backend and
/// keeps speaking until shut down; no backend failure ends the loop.
///
/// Dropping the worker without `shutdown` still cancels the loop; it exits
/// after the current utterance.
pub struct DeliveryWorker {
    queue: Arc<FeedbackQueue>,
    stats: Arc<Mutex<DeliveryStats>>,
    // Messages the loop is done with, spoken or dropped.
    settled: watch::Receiver<u64>,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
    handle: JoinHandle<()>,
}

impl DeliveryWorker {
    /// Start the worker task. Must be called from within a tokio runtime.
    pub fn spawn<B: SpeechBackend>(queue: Arc<FeedbackQueue>, backend: B, config: &DeliveryConfig) -> Self {
        let stats = Arc::new(Mutex::new(DeliveryStats::default()));
        let cancel = CancellationToken::new();
        let (settled_tx, settled) = watch::channel(0);

        let delivery = DeliveryLoop {
            queue: Arc::clone(&queue),
            stats: Arc::clone(&stats),
            settled: settled_tx,
            cancel: cancel.clone(),
            backend: Some(Box::new(backend)),
            stale_threshold: config.stale_threshold(),
            poll_interval: config.poll_interval(),
            high_priority_prefix: config.high_priority_prefix.clone(),
        };
        let handle = tokio::spawn(delivery.run());

        Self {
            queue,
            stats,
            settled,
            _cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
            handle,
        }
    }

    /// Copy of the current diagnostics.
    pub fn stats(&self) -> FeedbackStats {
        let delivery = *lock_stats(&self.stats);
        FeedbackStats::compose(self.queue.len(), self.queue.counters(), delivery, Instant::now())
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Resolves once every message queued so far has been spoken or dropped,
    /// or when the loop has exited. Evicted messages never reach the worker
    /// and are not waited for.
    pub async fn drained(&self) {
        let counters = self.queue.counters();
        let target = counters.admitted.saturating_sub(counters.evicted);
        let mut settled = self.settled.clone();
        // Err means the loop is gone and nothing more will settle.
        let _ = settled.wait_for(|count| *count >= target).await;
    }

    /// Stop taking new messages and wait for the loop to exit. An utterance
    /// already in progress is allowed to finish.
    pub async fn shutdown(self, timeout: Duration) -> GuidanceResult<()> {
        info!("Delivery worker shutdown requested");
        self.cancel.cancel();
        match tokio::time::timeout(timeout, self.handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(GuidanceError::WorkerPanicked(e.to_string())),
            Err(_) => Err(GuidanceError::ShutdownTimedOut(timeout)),
        }
    }
}

fn lock_stats(stats: &Mutex<DeliveryStats>) -> MutexGuard<'_, DeliveryStats> {
    stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct DeliveryLoop {
    queue: Arc<FeedbackQueue>,
    stats: Arc<Mutex<DeliveryStats>>,
    settled: watch::Sender<u64>,
    cancel: CancellationToken,
    // Moved onto the blocking pool for each utterance and handed back after.
    backend: Option<Box<dyn SpeechBackend>>,
    stale_threshold: Duration,
    poll_interval: Duration,
    high_priority_prefix: String,
}

impl DeliveryLoop {
    async fn run(mut self) {
        info!(
            stale_ms = self.stale_threshold.as_millis() as u64,
            poll_ms = self.poll_interval.as_millis() as u64,
            "Delivery worker started"
        );

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = self.queue.take_next(self.poll_interval) => next,
            };
            // Timeout: go round and look at the cancel flag again.
            let Some(message) = next else { continue };
            self.handle(message).await;
            self.settled.send_modify(|count| *count += 1);
        }

        if let Some(mut backend) = self.backend.take() {
            let _ = tokio::task::spawn_blocking(move || backend.shutdown()).await;
        }
        info!("Delivery worker stopped");
    }

    async fn handle(&mut self, message: Message) {
        let delay = Instant::now().saturating_duration_since(message.enqueued_at());

        // A late "clear" is worse than silence; a late "stop" is still worth saying.
        if delay > self.stale_threshold && !message.is_high() {
            debug!(id = %message.id(), delay_ms = delay.as_millis() as u64, "Dropping stale message");
            lock_stats(&self.stats).stale_dropped += 1;
            return;
        }

        let text = self.render(&message);
        let outcome = self.deliver(message.id(), text).await;

        let mut stats = lock_stats(&self.stats);
        stats.messages_processed += 1;
        stats.last_processing_delay = Some(delay);
        stats.last_processed_at = Some(Instant::now());
        match outcome {
            Delivery::Spoken => {}
            Delivery::Recovered => stats.recovered_failures += 1,
            Delivery::Failed => stats.delivery_failures += 1,
        }
    }

    fn render(&self, message: &Message) -> String {
        if message.is_high() && !self.high_priority_prefix.is_empty() {
            format!("{}{}", self.high_priority_prefix, message.text())
        } else {
            message.text().to_string()
        }
    }

    async fn deliver(&mut self, id: Uuid, text: String) -> Delivery {
        let Some(mut backend) = self.backend.take() else {
            error!(id = %id, "No speech backend left, dropping message");
            return Delivery::Failed;
        };

        let joined = tokio::task::spawn_blocking(move || {
            let outcome = speak_with_recovery(backend.as_mut(), id, &text);
            (backend, outcome)
        })
        .await;

        match joined {
            Ok((backend, outcome)) => {
                self.backend = Some(backend);
                outcome
            }
            Err(e) => {
                // Only reachable if the backend panics outside speak/reinitialize.
                error!(id = %id, "Speech task failed, backend lost: {}", e);
                Delivery::Failed
            }
        }
    }
}

/// Speak once; on failure reinit the backend and retry exactly once.
/// A panicking backend counts as a failed attempt.
fn speak_with_recovery(backend: &mut dyn SpeechBackend, id: Uuid, text: &str) -> Delivery {
    let first = match guarded(|| backend.speak(text)) {
        Ok(()) => {
            debug!(id = %id, backend = backend.name(), "Spoken");
            return Delivery::Spoken;
        }
        Err(e) => e,
    };
    warn!(
        id = %id,
        backend = backend.name(),
        transient = first.is_transient(),
        "Speech failed, reinitialising: {}",
        first
    );

    if let Err(e) = guarded(|| backend.reinitialize()) {
        error!(id = %id, backend = backend.name(), "Reinitialisation failed, dropping message: {}", e);
        return Delivery::Failed;
    }

    match guarded(|| backend.speak(text)) {
        Ok(()) => {
            info!(id = %id, backend = backend.name(), "Spoken after reinitialisation");
            Delivery::Recovered
        }
        Err(e) => {
            error!(id = %id, backend = backend.name(), "Retry failed, dropping message: {}", e);
            Delivery::Failed
        }
    }
}

// The backend stays owned by the loop after a panic; reinitialize is
// expected to bring it back to a usable state.
fn guarded(call: impl FnOnce() -> Result<(), SynthesisError>) -> Result<(), SynthesisError> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        let reason = format!("backend panicked: {}", panic_message(&*payload));
        Err(SynthesisError::Rendering(reason))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string payload"
    }
}
