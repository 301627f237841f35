use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wayguide::config::{GuidanceConfig, CONFIG_ENV};
use wayguide::perception::{Detection, FrameRecord};
use wayguide::{speech, GuidancePipeline, Priority};

const STATS_EVERY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    let config = GuidanceConfig::load(config_path.as_deref()).context("loading configuration")?;

    // The only fatal runtime condition: nothing to speak with.
    let backend = speech::detect_backend(&config.speech).context("acquiring a speech backend")?;
    let mut pipeline = GuidancePipeline::start(&config, backend);
    pipeline.announce("Navigation assistance started", Priority::Low);

    // Detector output arrives as JSON lines; only the latest frame matters.
    let (frame_tx, frame_rx) = watch::channel::<Option<Vec<Detection>>>(None);
    let mut reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match FrameRecord::parse(&line) {
                Ok(record) => {
                    if frame_tx.send(Some(record.into_detections())).is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("Ignoring malformed frame: {}", e),
            }
        }
        tracing::info!("Detection stream closed");
    });

    let mut cadence = tokio::time::interval(config.analysis_interval());
    cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut report = tokio::time::interval(STATS_EVERY);
    report.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tracing::info!("Guidance loop active. Feed detection frames on stdin.");

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, stopping");
                break;
            }
            _ = &mut reader => {
                analyse_latest(&mut pipeline, &frame_rx);
                break;
            }
            _ = cadence.tick() => analyse_latest(&mut pipeline, &frame_rx),
            _ = report.tick() => {
                let stats = pipeline.stats();
                tracing::info!(
                    queue_size = stats.queue_size,
                    processed = stats.messages_processed,
                    last_delay_ms = stats.last_message_delay.map(|d| d.as_millis() as u64),
                    since_last_ms = stats.time_since_last_processed.map(|d| d.as_millis() as u64),
                    dropped = stats.total_dropped(),
                    "Feedback stats"
                );
            }
        }
    }

    // Let queued guidance drain before stopping the worker.
    tokio::select! {
        drained = tokio::time::timeout(config.delivery.stale_threshold(), pipeline.drained()) => {
            if drained.is_err() {
                tracing::warn!(pending = pipeline.queue().len(), "Drain timed out");
            }
        }
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted during drain"),
    }

    pipeline.shutdown().await.context("stopping delivery worker")?;
    Ok(())
}

fn analyse_latest(pipeline: &mut GuidancePipeline, frames: &watch::Receiver<Option<Vec<Detection>>>) {
    let frame = frames.borrow().clone();
    if let Some(detections) = frame {
        let (situation, changed) = pipeline.observe(&detections);
        if changed {
            tracing::info!(
                kind = ?situation.kind,
                safe = situation.safe_to_proceed,
                "Guidance: {}",
                situation.guidance_text
            );
        }
    }
}
