use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use super::SpeechBackend;
use crate::error::SynthesisError;

/// Speak commands probed in order when none is configured.
pub const KNOWN_COMMANDS: [&str; 4] = ["say", "espeak-ng", "espeak", "spd-say"];

/// Spawns an OS speak command per utterance. No engine state survives
/// between calls, so recovery is just checking the command is still there.
#[derive(Debug, Clone)]
pub struct ProcessInvocationBackend {
    program: String,
    args: Vec<String>,
}

impl ProcessInvocationBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Arguments that make the known commands block until done and use the
    /// requested speaking rate.
    pub fn for_known_command(program: &str, rate_wpm: u32) -> Self {
        let name = Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program);
        let args = match name {
            "say" => vec!["-r".to_string(), rate_wpm.to_string()],
            "espeak-ng" | "espeak" => vec!["-s".to_string(), rate_wpm.to_string()],
            "spd-say" => vec!["--wait".to_string()],
            _ => Vec::new(),
        };
        Self::new(program, args)
    }

    /// First known command present on `PATH`.
    pub fn probe(rate_wpm: u32) -> Option<Self> {
        KNOWN_COMMANDS
            .iter()
            .find(|cmd| find_on_path(cmd).is_some())
            .map(|cmd| Self::for_known_command(cmd, rate_wpm))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl SpeechBackend for ProcessInvocationBackend {
    fn name(&self) -> &str {
        &self.program
    }

    fn speak(&mut self, text: &str) -> Result<(), SynthesisError> {
        debug!(program = %self.program, "Spawning speak command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    SynthesisError::Unavailable(format!("'{}' not found", self.program))
                }
                _ => SynthesisError::Io(e),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(SynthesisError::Rendering(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )))
        }
    }

    fn reinitialize(&mut self) -> Result<(), SynthesisError> {
        match find_on_path(&self.program) {
            Some(_) => Ok(()),
            None => Err(SynthesisError::Unavailable(format!("'{}' not found", self.program))),
        }
    }
}

/// Resolves a bare command name against `PATH`; paths are checked directly.
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|full| full.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_commands_get_rate_arguments() {
        let say = ProcessInvocationBackend::for_known_command("say", 150);
        assert_eq!(say.args, vec!["-r", "150"]);

        let espeak = ProcessInvocationBackend::for_known_command("/usr/bin/espeak-ng", 170);
        assert_eq!(espeak.args, vec!["-s", "170"]);

        let other = ProcessInvocationBackend::for_known_command("my-tts", 150);
        assert!(other.args.is_empty());
    }

    #[test]
    fn missing_program_is_unavailable() {
        let mut backend = ProcessInvocationBackend::new("wayguide-no-such-speak-command", Vec::new());
        let err = backend.speak("hello").unwrap_err();
        assert!(matches!(err, SynthesisError::Unavailable(_)));
        assert!(backend.reinitialize().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn failing_program_is_a_rendering_error() {
        let mut backend = ProcessInvocationBackend::new("false", Vec::new());
        if find_on_path("false").is_none() {
            return;
        }
        let err = backend.speak("hello").unwrap_err();
        assert!(matches!(err, SynthesisError::Rendering(_)));
        assert!(err.is_transient());
    }
}
