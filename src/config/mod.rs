//! Configuration module for Harvester.
//!
//! Resolves preferences from defaults, the preference file and the environment,
//! and detects the script runtime yt-dlp needs for provider challenges.

mod preferences;
pub mod runtime;

pub use preferences::{
    PreferenceKey, PreferenceSources, Preferences, VoiceSettings, ENV_PREFIX, MAX_RESULTS_LIMIT,
};
pub use runtime::{JsRuntime, PathProbe, RuntimeHints, RuntimeProbe, RuntimeSource};
