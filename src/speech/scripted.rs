use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::SpeechBackend;
use crate::error::SynthesisError;

#[derive(Debug, Default)]
struct Script {
    spoken: Vec<String>,
    attempts: usize,
    reinits: usize,
    fail_next: usize,
    fail_reinit: bool,
    shut_down: bool,
    speak_delay: Option<Duration>,
}

/// In-memory backend for tests and dry runs: records what it was asked to
/// say and fails on demand.
#[derive(Debug)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

/// Handle for inspecting and steering a `ScriptedBackend` after it has been
/// moved into a worker.
#[derive(Debug, Clone)]
pub struct SpokenLog {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    pub fn new() -> (Self, SpokenLog) {
        let script = Arc::new(Mutex::new(Script::default()));
        (
            Self {
                script: Arc::clone(&script),
            },
            SpokenLog { script },
        )
    }
}

fn lock(script: &Mutex<Script>) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SpeechBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn speak(&mut self, text: &str) -> Result<(), SynthesisError> {
        let delay = {
            let mut script = lock(&self.script);
            script.attempts += 1;
            if script.fail_next > 0 {
                script.fail_next -= 1;
                return Err(SynthesisError::Rendering("scripted failure".into()));
            }
            script.speak_delay
        };
        // Blocking on purpose: real backends block the worker for the
        // length of the utterance.
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        lock(&self.script).spoken.push(text.to_string());
        Ok(())
    }

    fn reinitialize(&mut self) -> Result<(), SynthesisError> {
        let mut script = lock(&self.script);
        script.reinits += 1;
        if script.fail_reinit {
            Err(SynthesisError::Unavailable("scripted reinit failure".into()))
        } else {
            Ok(())
        }
    }

    fn shutdown(&mut self) {
        lock(&self.script).shut_down = true;
    }
}

impl SpokenLog {
    pub fn spoken(&self) -> Vec<String> {
        lock(&self.script).spoken.clone()
    }

    pub fn attempts(&self) -> usize {
        lock(&self.script).attempts
    }

    pub fn reinits(&self) -> usize {
        lock(&self.script).reinits
    }

    pub fn was_shut_down(&self) -> bool {
        lock(&self.script).shut_down
    }

    /// Fail the next `count` speak calls.
    pub fn fail_next(&self, count: usize) {
        lock(&self.script).fail_next = count;
    }

    pub fn fail_reinit(&self, fail: bool) {
        lock(&self.script).fail_reinit = fail;
    }

    pub fn set_speak_delay(&self, delay: Duration) {
        lock(&self.script).speak_delay = Some(delay);
    }
}
