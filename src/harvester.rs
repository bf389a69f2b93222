//! Entry point shared by every front end.
//!
//! CLI commands, the interactive session and voice-triggered actions all go
//! through [`Harvester`], so identical inputs produce identical provider
//! queries and retrieval behavior regardless of where they came from.

use crate::config::Preferences;
use crate::error::Result;
use crate::extractor::{ExtractionAdapter, MediaProvider, TrackRecord, YtDlp};
use crate::orchestrator::FetchOrchestrator;
use crate::request::{self, QueryDescriptor, SearchCriteria};
use crate::retrieval::{RetrievalMode, RetrievalOutcome, RetrievalRequest, Transcoder};
use std::sync::Arc;

/// Search results together with the descriptor that produced them.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub descriptor: QueryDescriptor,
    pub tracks: Vec<TrackRecord>,
}

impl SearchResults {
    /// Retrieval request inheriting the search's kind and profile.
    pub fn request(&self, mode: RetrievalMode) -> RetrievalRequest {
        RetrievalRequest {
            mode,
            kind: self.descriptor.kind,
            profile: self.descriptor.profile,
        }
    }
}

/// Cheap to clone; workers take their own handle.
#[derive(Clone)]
pub struct Harvester {
    preferences: Arc<Preferences>,
    adapter: ExtractionAdapter,
    orchestrator: FetchOrchestrator,
}

impl Harvester {
    /// Harvester backed by yt-dlp for both extraction and transcoding.
    pub fn new(preferences: Preferences) -> Self {
        let ytdlp = Arc::new(YtDlp::new());
        Self::with_components(preferences, ytdlp.clone(), ytdlp)
    }

    pub fn with_components(
        preferences: Preferences,
        provider: Arc<dyn MediaProvider>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let preferences = Arc::new(preferences);
        Self {
            adapter: ExtractionAdapter::new(provider.clone()),
            orchestrator: FetchOrchestrator::with_components(
                preferences.clone(),
                provider,
                transcoder,
            ),
            preferences,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Validate criteria against this harvester's preferences.
    pub fn build(&self, criteria: &SearchCriteria) -> Result<QueryDescriptor> {
        request::build(criteria, &self.preferences)
    }

    pub async fn search(&self, criteria: &SearchCriteria) -> Result<SearchResults> {
        let descriptor = self.build(criteria)?;
        let tracks = self.adapter.search(&descriptor).await?;
        Ok(SearchResults { descriptor, tracks })
    }

    pub async fn retrieve(
        &self,
        tracks: &[TrackRecord],
        request: &RetrievalRequest,
    ) -> RetrievalOutcome {
        self.orchestrator.run(tracks, request).await
    }

    /// Search, then retrieve every track found.
    pub async fn fetch(
        &self,
        criteria: &SearchCriteria,
        mode: RetrievalMode,
    ) -> Result<(SearchResults, RetrievalOutcome)> {
        let results = self.search(criteria).await?;
        let outcome = self.retrieve(&results.tracks, &results.request(mode)).await;
        Ok((results, outcome))
    }
}
