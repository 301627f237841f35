//! Speech synthesis backends.
//!
//! Backends are blocking: `speak` returns once the utterance is over. The
//! delivery worker runs them off the async runtime. Which backend is used is
//! decided once at startup by [`detect_backend`].

pub mod engine;
pub mod process;
pub mod scripted;

use tracing::{info, warn};

use crate::config::{BackendChoice, SpeechConfig};
use crate::error::{GuidanceError, GuidanceResult, SynthesisError};

pub use engine::{EngineFactory, PersistentEngineBackend, SynthesisEngine};
pub use process::ProcessInvocationBackend;
pub use scripted::{ScriptedBackend, SpokenLog};

#[cfg(feature = "native-tts")]
pub use engine::NativeEngine;

pub trait SpeechBackend: Send + 'static {
    fn name(&self) -> &str;

    fn speak(&mut self, text: &str) -> Result<(), SynthesisError>;

    /// Bring the backend back to a usable state after a failed utterance.
    fn reinitialize(&mut self) -> Result<(), SynthesisError>;

    /// Release engine resources when the worker exits.
    fn shutdown(&mut self) {}
}

impl SpeechBackend for Box<dyn SpeechBackend> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn speak(&mut self, text: &str) -> Result<(), SynthesisError> {
        (**self).speak(text)
    }

    fn reinitialize(&mut self) -> Result<(), SynthesisError> {
        (**self).reinitialize()
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

/// Picks the speech backend for this process. Failing to find any is fatal.
pub fn detect_backend(config: &SpeechConfig) -> GuidanceResult<Box<dyn SpeechBackend>> {
    let backend = match config.backend {
        BackendChoice::Process => process_backend(config)?,
        BackendChoice::NativeEngine => native_backend()?,
        BackendChoice::Auto => match native_backend() {
            Ok(backend) => backend,
            Err(e) => {
                info!("Native engine not usable ({}), probing speak commands", e);
                process_backend(config)?
            }
        },
    };
    info!("Speech backend selected: {}", backend.name());
    Ok(backend)
}

fn process_backend(config: &SpeechConfig) -> GuidanceResult<Box<dyn SpeechBackend>> {
    if let Some(command) = config.command.as_deref() {
        if process::find_on_path(command).is_none() {
            return Err(GuidanceError::NoSpeechBackend(format!("configured command '{}' not found", command)));
        }
        let backend = if config.args.is_empty() {
            ProcessInvocationBackend::for_known_command(command, config.rate_wpm)
        } else {
            ProcessInvocationBackend::new(command, config.args.clone())
        };
        return Ok(Box::new(backend));
    }

    match ProcessInvocationBackend::probe(config.rate_wpm) {
        Some(backend) => Ok(Box::new(backend)),
        None => {
            warn!("None of {:?} found on PATH", process::KNOWN_COMMANDS);
            Err(GuidanceError::NoSpeechBackend("no speak command on PATH".into()))
        }
    }
}

#[cfg(feature = "native-tts")]
fn native_backend() -> GuidanceResult<Box<dyn SpeechBackend>> {
    let backend = PersistentEngineBackend::<NativeEngine>::new("native", Box::new(NativeEngine::open))
        .map_err(|e| GuidanceError::NoSpeechBackend(e.to_string()))?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "native-tts"))]
fn native_backend() -> GuidanceResult<Box<dyn SpeechBackend>> {
    Err(GuidanceError::NoSpeechBackend(
        "built without the native-tts feature".into(),
    ))
}
