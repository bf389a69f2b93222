//! Error types for Harvester.

use crate::extractor::MediaKind;
use thiserror::Error;

/// Why a provider query did not produce results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    /// DNS, connection or timeout problems.
    Network,
    /// The provider refused the request (403/429, bot confirmation, sign-in wall).
    Blocked,
    /// Anything else reported by the extraction tool.
    Failed,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderFailure::Network => write!(f, "network failure"),
            ProviderFailure::Blocked => write!(f, "request blocked"),
            ProviderFailure::Failed => write!(f, "provider error"),
        }
    }
}

/// Library-level error type for Harvester operations.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Unknown quality profile: {0}")]
    UnknownProfile(String),

    #[error("Provider {kind}: {message}")]
    Provider {
        kind: ProviderFailure,
        message: String,
    },

    #[error("No {kind} format matches the request for '{track}'")]
    NoMatchingFormat { track: String, kind: MediaKind },

    #[error("Invalid preview link: {0}")]
    InvalidLink(String),

    #[error("Voice control error: {0}")]
    Voice(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),
}

impl HarvestError {
    pub(crate) fn provider(kind: ProviderFailure, message: impl Into<String>) -> Self {
        HarvestError::Provider {
            kind,
            message: message.into(),
        }
    }
}

/// Result type alias for Harvester operations.
pub type Result<T> = std::result::Result<T, HarvestError>;
