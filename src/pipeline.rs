use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::GuidanceConfig;
use crate::error::GuidanceResult;
use crate::feedback::{DeliveryWorker, FeedbackQueue, FeedbackStats, SubmitOutcome};
use crate::perception::{Detection, FrameSignature};
use crate::situation::{Priority, Situation, SituationClassifier};
use crate::speech::SpeechBackend;

/// Producer side of the alert path, owned by the perception loop.
///
/// Each analysed frame goes through the classifier; only a change of
/// situation reaches the queue. Speech happens on the worker, never here.
pub struct GuidancePipeline {
    classifier: SituationClassifier,
    min_confidence: f32,
    queue: Arc<FeedbackQueue>,
    worker: DeliveryWorker,
    last_frame: Option<(FrameSignature, Situation)>,
    shutdown_timeout: Duration,
}

impl GuidancePipeline {
    /// Build the queue and start the delivery worker. Needs a tokio runtime.
    pub fn start<B: SpeechBackend>(config: &GuidanceConfig, backend: B) -> Self {
        info!(
            capacity = config.queue.capacity,
            cooldown_ms = config.queue.cooldown_ms,
            backend = backend.name(),
            "Starting guidance pipeline"
        );
        let queue = Arc::new(FeedbackQueue::from_config(&config.queue));
        let worker = DeliveryWorker::spawn(Arc::clone(&queue), backend, &config.delivery);

        Self {
            classifier: SituationClassifier::new(config.classifier.clone()),
            min_confidence: config.classifier.min_confidence,
            queue,
            worker,
            last_frame: None,
            shutdown_timeout: config.delivery.shutdown_timeout(),
        }
    }

    pub fn observe(&mut self, detections: &[Detection]) -> (Situation, bool) {
        self.observe_with_guidance(detections, None)
    }

    /// Like `observe`, but `guidance` (e.g. a richer scene description)
    /// replaces the classifier's text. Priority still comes from the classifier.
    /// On an unchanged frame the override updates the returned situation but
    /// nothing is queued.
    pub fn observe_with_guidance(
        &mut self,
        detections: &[Detection],
        guidance: Option<String>,
    ) -> (Situation, bool) {
        let signature = FrameSignature::of(detections, self.min_confidence);
        if let Some((last_signature, last_situation)) = &mut self.last_frame {
            if *last_signature == signature {
                if let Some(text) = guidance.filter(|t| !t.trim().is_empty()) {
                    last_situation.guidance_text = text;
                }
                return (last_situation.clone(), false);
            }
        }

        for detection in detections {
            debug!("Detected {}", detection);
        }

        let (mut situation, changed) = self.classifier.classify(detections);
        if let Some(text) = guidance.filter(|t| !t.trim().is_empty()) {
            situation.guidance_text = text;
        }

        if changed {
            let outcome = self.queue.submit(situation.guidance_text.clone(), situation.priority);
            debug!(kind = ?situation.kind, ?outcome, "Submitted guidance");
        }

        self.last_frame = Some((signature, situation.clone()));
        (situation, changed)
    }

    /// Queue arbitrary text, bypassing the classifier.
    pub fn announce(&self, text: impl Into<String>, priority: Priority) -> SubmitOutcome {
        self.queue.submit(text, priority)
    }

    pub fn queue(&self) -> &Arc<FeedbackQueue> {
        &self.queue
    }

    pub fn stats(&self) -> FeedbackStats {
        self.worker.stats()
    }

    /// Wait until everything queued so far has been spoken or dropped.
    pub async fn drained(&self) {
        self.worker.drained().await
    }

    pub async fn shutdown(self) -> GuidanceResult<()> {
        self.worker.shutdown(self.shutdown_timeout).await
    }
}
