//! Interactive session: typed commands, voice commands and background workers.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Preferences;
use crate::error::Result;
use crate::harvester::Harvester;
use crate::session::{Effect, Notice, Session, SessionCommand, SessionEvent};
use crate::voice::{VoiceController, VoiceParser};
use crate::worker::Dispatcher;
use console::style;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Run the interactive session.
pub async fn run_session(preferences: Preferences) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &preferences) {
        Output::error(&format!("{}", e));
        Output::info("Run 'harvester doctor' for detailed diagnostics.");
        return Err(e);
    }

    let voice = if preferences.voice.enabled {
        match VoiceController::from_settings(&preferences.voice) {
            Ok(controller) => Some(controller),
            Err(e) => {
                warn!("Voice control unavailable: {}", e);
                Output::warning(&format!("Voice control unavailable: {}", e));
                None
            }
        }
    } else {
        None
    };

    let harvester = Harvester::new(preferences.clone());
    let parser = VoiceParser::new();
    let mut session = Session::new(preferences.profile()).with_voice(voice.is_some());
    let (dispatcher, mut completions) = Dispatcher::<SessionEvent>::new();

    println!("\n{}", style("Harvester Session").bold().cyan());
    println!(
        "{}\n",
        style("Type 'help' for commands, or 'quit' to leave.").dim()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();

    loop {
        let effect = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    prompt();
                    continue;
                }
                match SessionCommand::parse_typed(&line, &parser) {
                    Ok(command) => session.apply(command),
                    Err(failure) => {
                        Output::warning(&failure.to_string());
                        None
                    }
                }
            }
            Some(completion) = completions.recv() => {
                debug!("{} job {} completed", completion.kind, completion.id);
                println!();
                session.complete(completion)
            }
        };

        render(session.drain_notices());

        match effect {
            Some(Effect::Quit) => break,
            Some(effect) => start(effect, &mut session, &dispatcher, &harvester, voice.as_ref()),
            None => {}
        }
        render(session.drain_notices());
        prompt();
    }

    Output::info("Goodbye!");
    Ok(())
}

/// Start the worker for an effect and record it as in flight.
fn start(
    effect: Effect,
    session: &mut Session,
    dispatcher: &Dispatcher<SessionEvent>,
    harvester: &Harvester,
    voice: Option<&VoiceController>,
) {
    let Some(kind) = effect.worker_kind() else {
        return;
    };

    let id = match effect {
        Effect::Search(criteria) => {
            let harvester = harvester.clone();
            dispatcher.submit(kind, async move {
                harvester.search(&criteria).await.map(SessionEvent::Searched)
            })
        }
        Effect::Retrieve { tracks, request } => {
            let harvester = harvester.clone();
            dispatcher.submit(kind, async move {
                Ok(SessionEvent::Retrieved(
                    harvester.retrieve(&tracks, &request).await,
                ))
            })
        }
        Effect::Listen => match voice {
            Some(controller) => {
                let controller = controller.clone();
                dispatcher.submit_blocking(kind, move || {
                    controller.listen_once().map(SessionEvent::Heard)
                })
            }
            None => {
                warn!("Listen requested without a speech engine");
                return;
            }
        },
        Effect::Quit => return,
    };

    session.started(kind, id);
}

fn render(notices: Vec<Notice>) {
    for notice in notices {
        match notice {
            Notice::Info(message) => Output::info(&message),
            Notice::Warning(message) => Output::warning(&message),
            Notice::Error(message) => Output::error(&message),
            Notice::Tracks(tracks) => Output::tracks(&tracks),
            Notice::NowPlaying { position, link } => {
                Output::success(&format!("Now playing track {} [{}]", position + 1, link.label));
                Output::kv("Stream", &link.url);
            }
            Notice::Saved(outcome) => Output::outcome(&outcome),
        }
    }
}

fn prompt() {
    if let Err(e) = write_prompt(&mut std::io::stdout()) {
        warn!("Failed to write prompt: {}", e);
    }
}

fn write_prompt(out: &mut impl Write) -> std::io::Result<()> {
    write!(out, "{} ", style("harvester>").green().bold())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_prompt_flush_failure_is_returned() {
        let err = write_prompt(&mut BrokenPipe).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let mut out = Vec::new();
        write_prompt(&mut out).unwrap();
        assert!(String::from_utf8_lossy(&out).contains("harvester>"));
    }
}
