//! Extraction adapter: provider output → filtered [`TrackRecord`]s.

pub mod filters;
mod normalize;
mod track;
mod ytdlp;

pub use normalize::{infer_kind, normalize_entry, normalize_format, normalize_formats};
pub use track::{format_duration, FormatDescriptor, MediaKind, TrackRecord};
pub use ytdlp::{classify_failure, YtDlp};

#[cfg(test)]
pub(crate) use track::tests as track_tests;

use crate::config::RuntimeHints;
use crate::error::Result;
use crate::request::QueryDescriptor;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Source of raw, provider-shaped metadata.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Run one search query; an empty result set is `Ok(vec![])`.
    async fn search(&self, query: &str, hints: &RuntimeHints) -> Result<Vec<Value>>;

    /// Full metadata (including fresh format URLs) for a single item.
    async fn describe(&self, url: &str, hints: &RuntimeHints) -> Result<Value>;
}

/// Turns a query descriptor into a bounded list of normalized tracks.
#[derive(Clone)]
pub struct ExtractionAdapter {
    provider: Arc<dyn MediaProvider>,
}

impl ExtractionAdapter {
    pub fn new(provider: Arc<dyn MediaProvider>) -> Self {
        Self { provider }
    }

    /// One provider query, then normalization, filtering and truncation.
    #[instrument(skip(self, descriptor), fields(query = %descriptor.provider_query()))]
    pub async fn search(&self, descriptor: &QueryDescriptor) -> Result<Vec<TrackRecord>> {
        let raw = self
            .provider
            .search(&descriptor.provider_query(), &descriptor.hints)
            .await?;
        let received = raw.len();

        let tracks: Vec<TrackRecord> = raw
            .iter()
            .filter_map(normalize_entry)
            .filter(|track| filters::passes(track, &descriptor.filters))
            .take(descriptor.max_results as usize)
            .collect();

        debug!("{} of {} provider records kept", tracks.len(), received);
        info!("Found {} tracks for '{}'", tracks.len(), descriptor.term);
        Ok(tracks)
    }
}
