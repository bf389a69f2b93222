//! Retrieval types shared by the orchestrator and the front ends.

mod naming;
mod select;

pub use naming::{build_file_stem, sanitize_filename};
pub use select::{preview_link, select_format};

use crate::config::RuntimeHints;
use crate::error::{HarvestError, ProviderFailure, Result};
use crate::extractor::{MediaKind, TrackRecord};
use crate::quality::QualityProfile;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Whether a batch is written to disk or resolved to playable links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    #[default]
    Persist,
    Preview,
}

impl std::str::FromStr for RetrievalMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "persist" | "download" => Ok(RetrievalMode::Persist),
            "preview" | "stream" => Ok(RetrievalMode::Preview),
            _ => Err(format!("Unknown retrieval mode: {}", s)),
        }
    }
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalMode::Persist => write!(f, "persist"),
            RetrievalMode::Preview => write!(f, "preview"),
        }
    }
}

/// One batch request: mode, optional media kind and the resolved profile.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalRequest {
    pub mode: RetrievalMode,
    /// `None` means the preference default (persist) or the track's own kind (preview).
    pub kind: Option<MediaKind>,
    pub profile: &'static QualityProfile,
}

/// Time-limited playable link for one track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewLink {
    pub url: String,
    pub format_id: String,
    pub label: String,
    pub kind: MediaKind,
    pub expires_at: Option<DateTime<Utc>>,
}

/// What a successful retrieval produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Artifact {
    File(PathBuf),
    Link(PreviewLink),
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Artifact::File(path) => write!(f, "{}", path.display()),
            Artifact::Link(link) => write!(f, "{} [{}]", link.url, link.label),
        }
    }
}

/// Why a single track could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum RetrievalFailure {
    #[error("no {0} format matches the request")]
    NoMatchingFormat(MediaKind),

    #[error("{kind}: {message}")]
    Provider {
        #[serde(skip)]
        kind: ProviderFailure,
        message: String,
    },

    #[error("invalid preview link: {0}")]
    InvalidLink(String),

    #[error("{0} is not installed")]
    ToolNotFound(String),

    #[error("{0}")]
    Failed(String),
}

impl From<HarvestError> for RetrievalFailure {
    fn from(err: HarvestError) -> Self {
        match err {
            HarvestError::NoMatchingFormat { kind, .. } => RetrievalFailure::NoMatchingFormat(kind),
            HarvestError::Provider { kind, message } => RetrievalFailure::Provider { kind, message },
            HarvestError::InvalidLink(url) => RetrievalFailure::InvalidLink(url),
            HarvestError::ToolNotFound(tool) => RetrievalFailure::ToolNotFound(tool),
            HarvestError::ToolFailed(message) => RetrievalFailure::Failed(message),
            other => RetrievalFailure::Failed(other.to_string()),
        }
    }
}

/// One input track paired with its result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackOutcome {
    pub track: TrackRecord,
    pub result: std::result::Result<Artifact, RetrievalFailure>,
}

/// Per-batch result: exactly one entry per input track, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalOutcome {
    pub mode: RetrievalMode,
    pub entries: Vec<TrackOutcome>,
}

impl RetrievalOutcome {
    pub fn successes(&self) -> impl Iterator<Item = (&TrackRecord, &Artifact)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().ok().map(|a| (&e.track, a)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&TrackRecord, &RetrievalFailure)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err().map(|f| (&e.track, f)))
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Everything the transcoder needs for one persisted download.
#[derive(Debug, Clone)]
pub struct PersistJob<'a> {
    pub url: &'a str,
    pub kind: MediaKind,
    /// Format selector derived from the quality profile.
    pub selector: String,
    /// Target container/codec (`mp3`, `mp4`, ...).
    pub container: &'a str,
    /// Audio quality passed to the post-processor, in kbps.
    pub audio_kbps: u32,
    pub output_dir: &'a Path,
    pub file_stem: String,
    pub hints: &'a RuntimeHints,
}

/// External transcoding pipeline producing a file on disk.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Download and convert; returns the final file path.
    async fn persist(&self, job: &PersistJob<'_>) -> Result<PathBuf>;
}
