use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{GuidanceError, GuidanceResult};

pub const CONFIG_ENV: &str = "WAYGUIDE_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// Cadence at which the perception loop hands frames to the classifier.
    pub analysis_interval_ms: u64,
    pub queue: QueueConfig,
    pub delivery: DeliveryConfig,
    pub classifier: ClassifierConfig,
    pub speech: SpeechConfig,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            analysis_interval_ms: 1000,
            queue: QueueConfig::default(),
            delivery: DeliveryConfig::default(),
            classifier: ClassifierConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,
    /// Window during which an identical text is not queued again.
    pub cooldown_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 2,
            cooldown_ms: 1000,
        }
    }
}

impl QueueConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Low priority messages older than this at dequeue time are discarded.
    pub stale_threshold_ms: u64,
    /// Upper bound on a single TakeNext wait; bounds shutdown latency.
    pub poll_interval_ms: u64,
    pub shutdown_timeout_ms: u64,
    /// Spoken before High priority text.
    pub high_priority_prefix: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            stale_threshold_ms: 2000,
            poll_interval_ms: 250,
            shutdown_timeout_ms: 2000,
            high_priority_prefix: "Attention! ".to_string(),
        }
    }
}

impl DeliveryConfig {
    pub fn stale_threshold(&self) -> Duration {
        Duration::from_millis(self.stale_threshold_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Report an empty scene as PathClear ("Proceed") instead of NoObstacles.
    pub affirm_clear_path: bool,
    pub min_confidence: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            affirm_clear_path: false,
            min_confidence: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendChoice {
    /// Probe the platform at startup.
    Auto,
    Process,
    NativeEngine,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub backend: BackendChoice,
    /// Explicit speak command for the process backend; probed when absent.
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Words per minute handed to commands that accept a rate.
    pub rate_wpm: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: BackendChoice::Auto,
            command: None,
            args: Vec::new(),
            rate_wpm: 150,
        }
    }
}

impl GuidanceConfig {
    pub fn analysis_interval(&self) -> Duration {
        Duration::from_millis(self.analysis_interval_ms)
    }

    pub fn from_toml_str(raw: &str) -> GuidanceResult<Self> {
        let config: GuidanceConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file if one is given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> GuidanceResult<Self> {
        let mut config = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                let raw = std::fs::read_to_string(path)?;
                toml::from_str(&raw)?
            }
            None => GuidanceConfig::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_u64("WAYGUIDE_QUEUE_CAPACITY") {
            self.queue.capacity = v as usize;
        }
        if let Some(v) = env_u64("WAYGUIDE_COOLDOWN_MS") {
            self.queue.cooldown_ms = v;
        }
        if let Some(v) = env_u64("WAYGUIDE_STALE_MS") {
            self.delivery.stale_threshold_ms = v;
        }
        if let Ok(v) = std::env::var("WAYGUIDE_SPEECH_BACKEND") {
            match v.trim().to_ascii_lowercase().as_str() {
                "auto" => self.speech.backend = BackendChoice::Auto,
                "process" => self.speech.backend = BackendChoice::Process,
                "native-engine" => self.speech.backend = BackendChoice::NativeEngine,
                other => warn!("Ignoring unknown WAYGUIDE_SPEECH_BACKEND '{}'", other),
            }
        }
    }

    pub fn validate(&self) -> GuidanceResult<()> {
        if self.queue.capacity == 0 {
            return Err(GuidanceError::Config("queue.capacity must be at least 1".into()));
        }
        if self.delivery.poll_interval_ms == 0 {
            return Err(GuidanceError::Config("delivery.poll_interval_ms must be non-zero".into()));
        }
        if self.analysis_interval_ms == 0 {
            return Err(GuidanceError::Config("analysis_interval_ms must be non-zero".into()));
        }
        if !(0.0..=1.0).contains(&self.classifier.min_confidence) {
            return Err(GuidanceError::Config("classifier.min_confidence must be within [0, 1]".into()));
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring non-numeric {}='{}'", key, raw);
            None
        }
    }
}
