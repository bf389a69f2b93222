//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{CriteriaArgs, Output};
use crate::config::Preferences;
use crate::harvester::Harvester;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(criteria: &CriteriaArgs, json: bool, preferences: Preferences) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &preferences) {
        Output::error(&format!("{}", e));
        Output::info("Run 'harvester doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let harvester = Harvester::new(preferences);
    let spinner = Output::spinner("Searching...");
    let results = harvester.search(&criteria.to_criteria()).await;
    spinner.finish_and_clear();

    let results = match results {
        Ok(results) => results,
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results.tracks)?);
    } else if results.tracks.is_empty() {
        Output::warning("No tracks matched the search.");
    } else {
        Output::success(&format!(
            "Found {} tracks for \"{}\" ({} profile)",
            results.tracks.len(),
            results.descriptor.term,
            results.descriptor.profile.name
        ));
        Output::tracks(&results.tracks);
    }

    Ok(())
}
