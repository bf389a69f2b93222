//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools are available before starting operations
//! that would otherwise fail midway.

use crate::config::Preferences;
use crate::error::{HarvestError, Result};
use crate::retrieval::RetrievalMode;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Searching needs yt-dlp.
    Search,
    /// Retrieval needs yt-dlp, and ffmpeg when persisting.
    Retrieve(RetrievalMode),
    /// Voice capture needs ffmpeg, vosk-transcriber and a model.
    Listen,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, preferences: &Preferences) -> Result<()> {
    match operation {
        Operation::Search | Operation::Retrieve(RetrievalMode::Preview) => {
            check_tool("yt-dlp")?;
        }
        Operation::Retrieve(RetrievalMode::Persist) => {
            check_tool("yt-dlp")?;
            check_tool("ffmpeg")?;
        }
        Operation::Listen => {
            check_voice(preferences)?;
            check_tool("ffmpeg")?;
            check_tool("vosk-transcriber")?;
        }
    }
    Ok(())
}

fn check_voice(preferences: &Preferences) -> Result<()> {
    let voice = &preferences.voice;
    if !voice.enabled {
        return Err(HarvestError::Voice(
            "voice control is disabled. Enable it with: export HARVESTER_VOICE_ENABLED=true"
                .to_string(),
        ));
    }
    if !voice.model_path.is_dir() {
        return Err(HarvestError::Voice(format!(
            "Vosk model not found at {}",
            voice.model_path.display()
        )));
    }
    Ok(())
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    // ffmpeg uses -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(HarvestError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(HarvestError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(HarvestError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::runtime::tests::FakeProbe;
    use crate::config::PreferenceSources;

    #[test]
    fn test_listen_requires_enabled_voice() {
        let sources = PreferenceSources {
            root: std::path::PathBuf::from("/srv/harvester"),
            ..PreferenceSources::default()
        };
        let prefs = Preferences::resolve_from(&sources, &FakeProbe::with(&[]));
        match check(Operation::Listen, &prefs) {
            Err(HarvestError::Voice(msg)) => assert!(msg.contains("disabled")),
            other => panic!("expected a voice error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_tool_is_reported() {
        assert!(matches!(
            check_tool("harvester-no-such-tool"),
            Err(HarvestError::ToolNotFound(_))
        ));
    }
}
