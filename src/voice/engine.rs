//! Offline speech recognition.
//!
//! Engines are blocking; callers run them on a blocking worker.

use crate::error::{HarvestError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, instrument};

/// Engine names accepted by the `voice_engine` preference.
pub const VOICE_ENGINES: [&str; 1] = ["vosk_offline"];

/// Captures one utterance and returns the recognized text.
pub trait SpeechEngine: Send + Sync {
    fn recognize_once(&self, language: &str, phrase_seconds: u32) -> Result<String>;
}

/// Default microphone input for ffmpeg on this platform.
fn default_input() -> (&'static str, &'static str) {
    if cfg!(target_os = "macos") {
        ("avfoundation", ":0")
    } else if cfg!(target_os = "windows") {
        ("dshow", "audio=default")
    } else {
        ("alsa", "default")
    }
}

/// Vosk recognition via the `vosk-transcriber` tool; audio is captured with ffmpeg.
#[derive(Debug, Clone)]
pub struct VoskEngine {
    model_path: PathBuf,
    input_format: String,
    input_device: String,
}

impl VoskEngine {
    /// Fails when the model directory does not exist.
    pub fn new(model_path: impl Into<PathBuf>) -> Result<Self> {
        let model_path = model_path.into();
        if !model_path.is_dir() {
            return Err(HarvestError::Voice(format!(
                "Vosk model not found at {}",
                model_path.display()
            )));
        }
        let (format, device) = default_input();
        Ok(Self {
            model_path,
            input_format: format.to_string(),
            input_device: device.to_string(),
        })
    }

    /// Override the ffmpeg capture input (e.g. `pulse` / `default`).
    pub fn with_input(mut self, format: impl Into<String>, device: impl Into<String>) -> Self {
        self.input_format = format.into();
        self.input_device = device.into();
        self
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn capture_args(&self, wav: &Path, phrase_seconds: u32) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            self.input_format.clone(),
            "-i".into(),
            self.input_device.clone(),
            "-t".into(),
            phrase_seconds.to_string(),
            "-ac".into(),
            "1".into(),
            "-ar".into(),
            "16000".into(),
            "-y".into(),
            wav.to_string_lossy().into_owned(),
        ]
    }

    fn transcribe_args(&self, wav: &Path, text: &Path) -> Vec<String> {
        vec![
            "--model".into(),
            self.model_path.to_string_lossy().into_owned(),
            "--input".into(),
            wav.to_string_lossy().into_owned(),
            "--output".into(),
            text.to_string_lossy().into_owned(),
            "--output-type".into(),
            "txt".into(),
        ]
    }
}

fn run_tool(program: &str, args: &[String]) -> Result<()> {
    debug!("Running {} {}", program, args.join(" "));
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HarvestError::ToolNotFound(program.to_string())
            } else {
                HarvestError::ToolFailed(format!("{program} execution failed: {e}"))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HarvestError::ToolFailed(format!(
            "{program} failed: {}",
            stderr.trim()
        )));
    }
    Ok(())
}

impl SpeechEngine for VoskEngine {
    #[instrument(skip(self))]
    fn recognize_once(&self, language: &str, phrase_seconds: u32) -> Result<String> {
        let dir = tempfile::tempdir()?;
        let wav = dir.path().join("phrase.wav");
        let text = dir.path().join("phrase.txt");

        // The model fixes the language; the tag is only logged.
        debug!("Listening for {}s ({})", phrase_seconds, language);
        run_tool("ffmpeg", &self.capture_args(&wav, phrase_seconds.max(1)))?;
        run_tool("vosk-transcriber", &self.transcribe_args(&wav, &text))?;

        let recognized = std::fs::read_to_string(&text)?;
        let recognized = recognized.split_whitespace().collect::<Vec<_>>().join(" ");
        if recognized.is_empty() {
            return Err(HarvestError::Voice("could not understand speech".into()));
        }
        Ok(recognized)
    }
}

/// Build the engine named by the preferences.
pub fn engine_for(name: &str, model_path: &Path) -> Result<Box<dyn SpeechEngine>> {
    match name {
        "vosk_offline" => Ok(Box::new(VoskEngine::new(model_path)?)),
        other => Err(HarvestError::Voice(format!(
            "unsupported voice engine: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_reported() {
        let err = VoskEngine::new("/nonexistent/vosk-model").unwrap_err();
        assert!(err.to_string().contains("Vosk model not found"));
        assert!(engine_for("cloud", Path::new("/tmp")).is_err());
    }

    #[test]
    fn test_capture_and_transcribe_args() {
        let dir = tempfile::tempdir().unwrap();
        let engine = VoskEngine::new(dir.path())
            .unwrap()
            .with_input("pulse", "default");
        let wav = PathBuf::from("/tmp/p.wav");

        let capture = engine.capture_args(&wav, 4);
        assert!(capture.windows(2).any(|w| w == ["-f", "pulse"]));
        assert!(capture.windows(2).any(|w| w == ["-t", "4"]));
        assert_eq!(capture.last().map(String::as_str), Some("/tmp/p.wav"));

        let transcribe = engine.transcribe_args(&wav, Path::new("/tmp/p.txt"));
        assert_eq!(transcribe[1], dir.path().to_string_lossy());
    }
}
