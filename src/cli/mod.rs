//! CLI module for Harvester.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::config::PreferenceKey;
use crate::extractor::MediaKind;
use crate::request::{SearchCriteria, SearchOrder};
use crate::retrieval::RetrievalMode;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Harvester - search, preview and download media
///
/// Builds provider queries from genre, artist and keyword criteria, filters
/// the results, and either saves them locally or resolves playable links.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the preference file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Search criteria shared by `fetch` and `search`.
#[derive(Args, Debug, Clone, Default)]
pub struct CriteriaArgs {
    /// Genre or free-text search term
    pub genre: String,

    /// Artist to include in the query
    #[arg(short, long)]
    pub artist: Option<String>,

    /// Keywords; every keyword must appear in a result
    #[arg(short, long)]
    pub keywords: Option<String>,

    /// Result ordering (relevance, date, longest, shortest)
    #[arg(long, default_value = "relevance")]
    pub order: SearchOrder,

    /// Maximum number of results (1-100)
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    pub max_results: Option<i64>,

    /// Quality profile (high, medium, data_saving)
    #[arg(short = 'q', long)]
    pub quality_profile: Option<String>,

    /// Media kind to retrieve (audio, video)
    #[arg(long)]
    pub kind: Option<MediaKind>,

    /// Minimum duration in seconds
    #[arg(long, allow_negative_numbers = true)]
    pub min_duration: Option<i64>,

    /// Maximum duration in seconds
    #[arg(long, allow_negative_numbers = true)]
    pub max_duration: Option<i64>,

    /// Minimum view count
    #[arg(long, allow_negative_numbers = true)]
    pub min_views: Option<i64>,

    /// Maximum view count
    #[arg(long, allow_negative_numbers = true)]
    pub max_views: Option<i64>,

    /// Only results uploaded on or after this date (YYYY-MM-DD)
    #[arg(long)]
    pub upload_after: Option<NaiveDate>,

    /// Only results uploaded on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub upload_before: Option<NaiveDate>,

    /// Drop age-restricted results
    #[arg(long)]
    pub safe_for_work: bool,

    /// Keep live streams in the results
    #[arg(long)]
    pub allow_live: bool,
}

impl CriteriaArgs {
    pub fn to_criteria(&self) -> SearchCriteria {
        SearchCriteria {
            genre: Some(self.genre.clone()),
            artist: self.artist.clone(),
            keywords: self.keywords.clone(),
            order: self.order,
            max_results: self.max_results,
            min_duration: self.min_duration,
            max_duration: self.max_duration,
            min_views: self.min_views,
            max_views: self.max_views,
            upload_after: self.upload_after,
            upload_before: self.upload_before,
            safe_for_work: self.safe_for_work,
            allow_live: self.allow_live,
            quality_profile: self.quality_profile.clone(),
            kind: self.kind,
        }
    }
}

/// Preference overrides accepted on the command line.
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// Directory for persisted downloads
    #[arg(long)]
    pub download_dir: Option<String>,

    /// JavaScript runtime for the extractor (node, deno, bun)
    #[arg(long)]
    pub js_runtime: Option<String>,

    /// Path to the JavaScript runtime executable
    #[arg(long)]
    pub js_runtime_path: Option<String>,

    /// Remote helper component (repeatable)
    #[arg(long = "remote-component")]
    pub remote_components: Vec<String>,
}

impl OverrideArgs {
    /// Overrides as preference key/value pairs.
    pub fn pairs(&self) -> Vec<(PreferenceKey, String)> {
        let mut pairs = Vec::new();
        if let Some(dir) = &self.download_dir {
            pairs.push((PreferenceKey::DownloadDir, dir.clone()));
        }
        if let Some(runtime) = &self.js_runtime {
            pairs.push((PreferenceKey::JsRuntime, runtime.clone()));
        }
        if let Some(path) = &self.js_runtime_path {
            pairs.push((PreferenceKey::JsRuntimePath, path.clone()));
        }
        if !self.remote_components.is_empty() {
            pairs.push((
                PreferenceKey::RemoteComponents,
                self.remote_components.join(","),
            ));
        }
        pairs
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search, then download or preview every result
    Fetch {
        #[command(flatten)]
        criteria: CriteriaArgs,

        /// persist (download to disk) or preview (resolve playable links)
        #[arg(short, long, default_value = "persist")]
        mode: RetrievalMode,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Search and list matching tracks
    Search {
        #[command(flatten)]
        criteria: CriteriaArgs,

        /// Print the tracks as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Voice command tools
    Voice {
        #[command(subcommand)]
        action: VoiceAction,
    },

    /// Start an interactive session (typed and voice commands)
    Session {
        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Manage preferences
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check external tools, runtimes and directories
    Doctor,
}

impl Commands {
    /// Overrides carried by this command, if any.
    pub fn overrides(&self) -> Vec<(PreferenceKey, String)> {
        match self {
            Commands::Fetch { overrides, .. }
            | Commands::Search { overrides, .. }
            | Commands::Session { overrides } => overrides.pairs(),
            _ => Vec::new(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum VoiceAction {
    /// Parse a phrase as if it had been spoken
    Parse {
        /// The phrase, e.g. "play track number five"
        phrase: Vec<String>,
    },

    /// Capture one phrase from the microphone and parse it
    Listen,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show resolved preferences
    Show,

    /// Show preference file path
    Path,

    /// Write the resolved preferences to the preference file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_arguments() {
        let cli = Cli::try_parse_from([
            "harvester",
            "fetch",
            "trance",
            "--artist",
            "Armin",
            "--mode",
            "preview",
            "--kind",
            "video",
            "-n",
            "5",
            "--upload-after",
            "2023-01-01",
            "--remote-component",
            "ejs:github",
            "--remote-component",
            "ejs:npm",
        ])
        .unwrap();

        let overrides = cli.command.overrides();
        match cli.command {
            Commands::Fetch { criteria, mode, .. } => {
                let criteria = criteria.to_criteria();
                assert_eq!(mode, RetrievalMode::Preview);
                assert_eq!(criteria.genre.as_deref(), Some("trance"));
                assert_eq!(criteria.kind, Some(MediaKind::Video));
                assert_eq!(criteria.max_results, Some(5));
                assert_eq!(criteria.upload_after, NaiveDate::from_ymd_opt(2023, 1, 1));
                assert!(!criteria.allow_live);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(
            overrides,
            vec![(PreferenceKey::RemoteComponents, "ejs:github,ejs:npm".to_string())]
        );
    }

    #[test]
    fn test_negative_values_reach_validation() {
        let cli =
            Cli::try_parse_from(["harvester", "search", "jazz", "--min-views", "-5"]).unwrap();
        match cli.command {
            Commands::Search { criteria, .. } => assert_eq!(criteria.min_views, Some(-5)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["harvester", "-vv", "doctor", "--config", "/tmp/p.toml"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
    }
}
