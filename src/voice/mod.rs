//! Voice control: capture one phrase, parse it into a command.

mod engine;
mod parser;

pub use engine::{engine_for, SpeechEngine, VoskEngine, VOICE_ENGINES};
pub use parser::{normalize_phrase, ParseFailure, TransportAction, VoiceCommand, VoiceParser};

use crate::config::VoiceSettings;
use crate::error::{HarvestError, Result};
use std::sync::Arc;
use tracing::info;

/// Result of one listen: the parsed command (or why it failed) and the raw phrase.
pub type Heard = (std::result::Result<VoiceCommand, ParseFailure>, String);

/// Ties a speech engine to the phrase parser.
#[derive(Clone)]
pub struct VoiceController {
    settings: VoiceSettings,
    engine: Option<Arc<dyn SpeechEngine>>,
    parser: Arc<VoiceParser>,
}

impl VoiceController {
    /// Controller for the configured engine. No engine is built when voice is disabled.
    pub fn from_settings(settings: &VoiceSettings) -> Result<Self> {
        let engine = if settings.enabled {
            Some(Arc::from(engine_for(&settings.engine, &settings.model_path)?))
        } else {
            None
        };
        Ok(Self {
            settings: settings.clone(),
            engine,
            parser: Arc::new(VoiceParser::new()),
        })
    }

    pub fn with_engine(settings: &VoiceSettings, engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            settings: settings.clone(),
            engine: Some(engine),
            parser: Arc::new(VoiceParser::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled && self.engine.is_some()
    }

    pub fn parser(&self) -> &VoiceParser {
        &self.parser
    }

    /// Blocking: records one phrase and parses it.
    pub fn listen_once(&self) -> Result<Heard> {
        if !self.settings.enabled {
            return Err(HarvestError::Voice("voice control is disabled".into()));
        }
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| HarvestError::Voice("voice engine not available".into()))?;

        let phrase = engine.recognize_once(&self.settings.language, self.settings.phrase_seconds)?;
        info!("Heard: {}", phrase);
        Ok((self.parser.parse(&phrase), phrase))
    }
}
