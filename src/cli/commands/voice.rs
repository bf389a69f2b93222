//! Voice command: parse a phrase, or capture one from the microphone.

use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, VoiceAction};
use crate::config::Preferences;
use crate::voice::{Heard, VoiceController, VoiceParser};
use anyhow::Result;

/// Run the voice command.
pub async fn run_voice(action: &VoiceAction, preferences: Preferences) -> Result<()> {
    match action {
        VoiceAction::Parse { phrase } => {
            let phrase = phrase.join(" ");
            let parsed = VoiceParser::new().parse(&phrase);
            show((parsed, phrase))?;
        }

        VoiceAction::Listen => {
            if let Err(e) = preflight::check(Operation::Listen, &preferences) {
                Output::error(&format!("{}", e));
                Output::info("Run 'harvester doctor' for detailed diagnostics.");
                return Err(e.into());
            }

            let controller = VoiceController::from_settings(&preferences.voice)?;
            let spinner = Output::spinner(&format!(
                "Listening for {} seconds...",
                preferences.voice.phrase_seconds
            ));
            let heard = tokio::task::spawn_blocking(move || controller.listen_once()).await?;
            spinner.finish_and_clear();
            show(heard?)?;
        }
    }

    Ok(())
}

fn show((parsed, phrase): Heard) -> Result<()> {
    Output::kv("Heard", &phrase);
    match parsed {
        Ok(command) => {
            Output::success(&command.to_string());
            println!("{}", serde_json::to_string_pretty(&command)?);
        }
        Err(failure) => Output::warning(&failure.to_string()),
    }
    Ok(())
}
