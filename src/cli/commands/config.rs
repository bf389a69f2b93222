//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Preferences;
use anyhow::Result;
use std::path::Path;

/// Run the config command.
pub fn run_config(action: &ConfigAction, preferences: &Preferences, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&preferences.to_table())
                .map_err(|e| anyhow::anyhow!("Failed to serialize preferences: {}", e))?;
            println!("{}", toml_str);
            Output::kv("js_runtime source", &preferences.runtime_source.to_string());
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }

        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                Output::warning(&format!(
                    "{} already exists. Use --force to overwrite it.",
                    config_path.display()
                ));
                return Ok(());
            }
            preferences.save_to(config_path)?;
            Output::success(&format!("Wrote preferences to {}", config_path.display()));
        }
    }

    Ok(())
}
