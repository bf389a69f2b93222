//! Fetch command: search, then persist or preview every result.

use crate::cli::preflight::{self, Operation};
use crate::cli::{CriteriaArgs, Output};
use crate::config::Preferences;
use crate::harvester::Harvester;
use crate::retrieval::RetrievalMode;
use anyhow::Result;

/// Run the fetch command.
pub async fn run_fetch(
    criteria: &CriteriaArgs,
    mode: RetrievalMode,
    json: bool,
    preferences: Preferences,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Retrieve(mode), &preferences) {
        Output::error(&format!("{}", e));
        Output::info("Run 'harvester doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let harvester = Harvester::new(preferences);
    let criteria = criteria.to_criteria();

    let spinner = Output::spinner("Searching...");
    let results = harvester.search(&criteria).await;
    spinner.finish_and_clear();
    let results = results?;

    if results.tracks.is_empty() {
        Output::warning("No tracks matched the search.");
        return Ok(());
    }
    if !json {
        Output::info(&format!(
            "Found {} tracks for \"{}\"",
            results.tracks.len(),
            results.descriptor.term
        ));
    }

    let message = match mode {
        RetrievalMode::Persist => format!(
            "Downloading to {}...",
            harvester.preferences().download_dir.display()
        ),
        RetrievalMode::Preview => "Resolving stream links...".to_string(),
    };
    let spinner = Output::spinner(&message);
    let outcome = harvester
        .retrieve(&results.tracks, &results.request(mode))
        .await;
    spinner.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        Output::header(match mode {
            RetrievalMode::Persist => "Downloads",
            RetrievalMode::Preview => "Previews",
        });
        Output::outcome(&outcome);
    }

    if !outcome.is_complete_success() {
        anyhow::bail!(
            "{} of {} tracks failed",
            outcome.failure_count(),
            outcome.entries.len()
        );
    }
    Ok(())
}
