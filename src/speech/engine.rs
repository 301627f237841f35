use tracing::{debug, info};

use super::SpeechBackend;
use crate::error::SynthesisError;

/// A stateful synthesizer kept alive across utterances.
pub trait SynthesisEngine: Send + 'static {
    /// Render `text`, returning once the utterance has finished.
    fn say(&mut self, text: &str) -> Result<(), SynthesisError>;
    /// Halt output. Called before the engine is discarded.
    fn stop(&mut self);
}

pub type EngineFactory<E> = Box<dyn FnMut() -> Result<E, SynthesisError> + Send>;

/// Holds one engine across calls. After a failed utterance the engine may be
/// wedged, so recovery stops it and builds a fresh one from the factory.
pub struct PersistentEngineBackend<E: SynthesisEngine> {
    name: String,
    engine: Option<E>,
    factory: EngineFactory<E>,
}

impl<E: SynthesisEngine> PersistentEngineBackend<E> {
    /// Builds the first engine right away; failure here is a startup failure.
    pub fn new(name: impl Into<String>, mut factory: EngineFactory<E>) -> Result<Self, SynthesisError> {
        let engine = factory()?;
        let name = name.into();
        info!("Speech engine '{}' initialised", name);
        Ok(Self {
            name,
            engine: Some(engine),
            factory,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }
}

impl<E: SynthesisEngine> SpeechBackend for PersistentEngineBackend<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn speak(&mut self, text: &str) -> Result<(), SynthesisError> {
        match self.engine.as_mut() {
            Some(engine) => engine.say(text),
            None => Err(SynthesisError::Unavailable(format!("engine '{}' is not initialised", self.name))),
        }
    }

    fn reinitialize(&mut self) -> Result<(), SynthesisError> {
        if let Some(mut old) = self.engine.take() {
            old.stop();
        }
        debug!("Rebuilding speech engine '{}'", self.name);
        self.engine = Some((self.factory)()?);
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.stop();
        }
    }
}

#[cfg(feature = "native-tts")]
pub use native::NativeEngine;

#[cfg(feature = "native-tts")]
mod native {
    use std::time::{Duration, Instant};

    use super::SynthesisEngine;
    use crate::error::SynthesisError;

    const POLL: Duration = Duration::from_millis(20);
    const MAX_UTTERANCE: Duration = Duration::from_secs(30);

    /// Platform engine from the `tts` crate.
    pub struct NativeEngine {
        tts: tts::Tts,
    }

    impl NativeEngine {
        pub fn open() -> Result<Self, SynthesisError> {
            let tts = tts::Tts::default().map_err(|e| SynthesisError::Unavailable(e.to_string()))?;
            Ok(Self { tts })
        }
    }

    impl SynthesisEngine for NativeEngine {
        fn say(&mut self, text: &str) -> Result<(), SynthesisError> {
            self.tts
                .speak(text, false)
                .map_err(|e| SynthesisError::Rendering(e.to_string()))?;

            // speak() returns immediately on most platforms; wait it out so the
            // worker never overlaps utterances.
            let started = Instant::now();
            while started.elapsed() < MAX_UTTERANCE {
                match self.tts.is_speaking() {
                    Ok(true) => std::thread::sleep(POLL),
                    Ok(false) | Err(_) => return Ok(()),
                }
            }
            Err(SynthesisError::Rendering("utterance did not finish".into()))
        }

        fn stop(&mut self) {
            let _ = self.tts.stop();
        }
    }
}
