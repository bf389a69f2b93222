//! Fetch orchestrator for Harvester.
//!
//! Runs a batch of tracks through either the persist pipeline (transcode to
//! disk) or preview resolution (time-limited link). One failing track never
//! aborts the batch.

use crate::config::Preferences;
use crate::error::{HarvestError, Result};
use crate::extractor::{normalize_formats, MediaKind, MediaProvider, TrackRecord, YtDlp};
use crate::retrieval::{
    build_file_stem, preview_link, select_format, Artifact, PersistJob, RetrievalMode,
    RetrievalOutcome, RetrievalRequest, TrackOutcome, Transcoder,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Drives persist and preview retrieval for batches of tracks.
#[derive(Clone)]
pub struct FetchOrchestrator {
    preferences: Arc<Preferences>,
    provider: Arc<dyn MediaProvider>,
    transcoder: Arc<dyn Transcoder>,
}

impl FetchOrchestrator {
    /// Orchestrator backed by the yt-dlp executable.
    pub fn new(preferences: Arc<Preferences>) -> Self {
        let ytdlp = Arc::new(YtDlp::new());
        Self {
            preferences,
            provider: ytdlp.clone(),
            transcoder: ytdlp,
        }
    }

    /// Orchestrator with custom components.
    pub fn with_components(
        preferences: Arc<Preferences>,
        provider: Arc<dyn MediaProvider>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            preferences,
            provider,
            transcoder,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Retrieve every track; the outcome has one entry per track, in order.
    #[instrument(skip(self, tracks, request), fields(mode = %request.mode, count = tracks.len()))]
    pub async fn run(&self, tracks: &[TrackRecord], request: &RetrievalRequest) -> RetrievalOutcome {
        let mut entries = Vec::with_capacity(tracks.len());

        for (index, track) in tracks.iter().enumerate() {
            info!(
                "[{}/{}] {} '{}'",
                index + 1,
                tracks.len(),
                request.mode,
                track.display_title()
            );

            let result = match request.mode {
                RetrievalMode::Persist => self.persist(track, request).await,
                RetrievalMode::Preview => self.preview(track, request).await,
            };

            if let Err(e) = &result {
                warn!("Failed to retrieve '{}': {}", track.display_title(), e);
            }

            entries.push(TrackOutcome {
                track: track.clone(),
                result: result.map_err(Into::into),
            });
        }

        let outcome = RetrievalOutcome {
            mode: request.mode,
            entries,
        };
        info!(
            "Retrieval finished: {} succeeded, {} failed",
            outcome.success_count(),
            outcome.failure_count()
        );
        outcome
    }

    async fn persist(&self, track: &TrackRecord, request: &RetrievalRequest) -> Result<Artifact> {
        let kind = request.kind.unwrap_or(self.preferences.default_kind);
        if kind == MediaKind::Video && track.kind == MediaKind::Audio {
            return Err(HarvestError::NoMatchingFormat {
                track: track.display_title().to_string(),
                kind,
            });
        }

        let profile = request.profile;
        let selector = match kind {
            MediaKind::Audio => profile.audio_selector(),
            MediaKind::Video => profile.video_audio_selector(),
        };
        let hints = self.preferences.runtime_hints();
        let job = PersistJob {
            url: &track.webpage_url,
            kind,
            selector,
            container: self.preferences.container_for(kind),
            audio_kbps: profile.max_audio_kbps,
            output_dir: &self.preferences.download_dir,
            file_stem: build_file_stem(&track.title, &track.id),
            hints: &hints,
        };

        let path = self.transcoder.persist(&job).await?;
        info!("Saved {}", path.display());
        Ok(Artifact::File(path))
    }

    async fn preview(&self, track: &TrackRecord, request: &RetrievalRequest) -> Result<Artifact> {
        let kind = request.kind.unwrap_or(track.kind);
        let hints = self.preferences.runtime_hints();

        let details = self.provider.describe(&track.webpage_url, &hints).await?;
        let mut formats = normalize_formats(&details);
        if formats.is_empty() {
            formats = track.formats.clone();
        }

        let format = select_format(&formats, kind, request.profile).ok_or_else(|| {
            HarvestError::NoMatchingFormat {
                track: track.display_title().to_string(),
                kind,
            }
        })?;

        Ok(Artifact::Link(preview_link(format, kind)?))
    }
}
