//! Request building: raw search criteria + preferences → query descriptor.

use crate::config::{Preferences, RuntimeHints, MAX_RESULTS_LIMIT};
use crate::error::{HarvestError, Result};
use crate::extractor::MediaKind;
use crate::quality::{self, QualityProfile};
use chrono::NaiveDate;
use tracing::warn;

/// Search ordering understood by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchOrder {
    #[default]
    Relevance,
    Date,
    Longest,
    Shortest,
}

impl SearchOrder {
    fn prefix(&self) -> &'static str {
        match self {
            SearchOrder::Relevance => "ytsearch",
            SearchOrder::Date => "ytsearchdate",
            SearchOrder::Longest => "ytsearchlong",
            SearchOrder::Shortest => "ytsearchshort",
        }
    }
}

impl std::str::FromStr for SearchOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relevance" => Ok(SearchOrder::Relevance),
            "date" | "newest" => Ok(SearchOrder::Date),
            "longest" => Ok(SearchOrder::Longest),
            "shortest" => Ok(SearchOrder::Shortest),
            _ => Err(format!("Unknown search order: {}", s)),
        }
    }
}

impl std::fmt::Display for SearchOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchOrder::Relevance => write!(f, "relevance"),
            SearchOrder::Date => write!(f, "date"),
            SearchOrder::Longest => write!(f, "longest"),
            SearchOrder::Shortest => write!(f, "shortest"),
        }
    }
}

/// What the user asked for, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    pub genre: Option<String>,
    pub artist: Option<String>,
    pub keywords: Option<String>,
    pub order: SearchOrder,
    pub max_results: Option<i64>,
    pub min_duration: Option<i64>,
    pub max_duration: Option<i64>,
    pub min_views: Option<i64>,
    pub max_views: Option<i64>,
    pub upload_after: Option<NaiveDate>,
    pub upload_before: Option<NaiveDate>,
    pub safe_for_work: bool,
    pub allow_live: bool,
    pub quality_profile: Option<String>,
    pub kind: Option<MediaKind>,
}

impl SearchCriteria {
    /// Criteria for a plain free-text search.
    pub fn for_term(term: impl Into<String>) -> Self {
        Self {
            genre: Some(term.into()),
            ..Self::default()
        }
    }
}

/// Validated post-fetch filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub min_duration: Option<u64>,
    pub max_duration: Option<u64>,
    pub min_views: Option<u64>,
    pub max_views: Option<u64>,
    pub upload_after: Option<NaiveDate>,
    pub upload_before: Option<NaiveDate>,
    pub exclude_live: bool,
    pub safe_for_work: bool,
    /// Lowercased keyword tokens that must all match.
    pub keywords: Vec<String>,
}

/// Normalized, immutable description of one search request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub term: String,
    pub order: SearchOrder,
    pub max_results: u32,
    pub filters: SearchFilters,
    pub profile: &'static QualityProfile,
    pub kind: Option<MediaKind>,
    pub hints: RuntimeHints,
}

impl QueryDescriptor {
    /// Query string handed to the provider, e.g. `ytsearch12:deep house`.
    pub fn provider_query(&self) -> String {
        format!("{}{}:{}", self.order.prefix(), self.max_results, self.term)
    }
}

fn non_negative(name: &str, value: Option<i64>) -> Result<Option<u64>> {
    match value {
        None => Ok(None),
        Some(v) if v < 0 => Err(HarvestError::InvalidInput(format!(
            "{} must not be negative (got {})",
            name, v
        ))),
        Some(v) => Ok(Some(v as u64)),
    }
}

fn ordered(name: &str, min: Option<u64>, max: Option<u64>) -> Result<()> {
    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => Err(HarvestError::InvalidInput(format!(
            "minimum {} ({}) exceeds maximum ({})",
            name, lo, hi
        ))),
        _ => Ok(()),
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Validate criteria and combine them with preferences.
///
/// Pure: the same criteria and preferences always yield an equal descriptor.
pub fn build(criteria: &SearchCriteria, preferences: &Preferences) -> Result<QueryDescriptor> {
    let genre = trimmed(&criteria.genre);
    let artist = trimmed(&criteria.artist);
    let keywords = trimmed(&criteria.keywords);

    let term = [genre, artist, keywords]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if term.is_empty() {
        return Err(HarvestError::InvalidInput(
            "a genre, artist or keyword must be provided".to_string(),
        ));
    }

    let max_results = match criteria.max_results {
        None => preferences.max_results,
        Some(n) if n <= 0 => {
            return Err(HarvestError::InvalidInput(format!(
                "result count must be a positive integer (got {})",
                n
            )))
        }
        Some(n) if n > i64::from(MAX_RESULTS_LIMIT) => {
            warn!("Clamping result count {} to {}", n, MAX_RESULTS_LIMIT);
            MAX_RESULTS_LIMIT
        }
        Some(n) => n as u32,
    };

    let min_duration = non_negative("minimum duration", criteria.min_duration)?;
    let max_duration = non_negative("maximum duration", criteria.max_duration)?;
    let min_views = non_negative("minimum views", criteria.min_views)?;
    let max_views = non_negative("maximum views", criteria.max_views)?;
    ordered("duration", min_duration, max_duration)?;
    ordered("views", min_views, max_views)?;

    if let (Some(after), Some(before)) = (criteria.upload_after, criteria.upload_before) {
        if after > before {
            return Err(HarvestError::InvalidInput(format!(
                "upload window is empty ({} is after {})",
                after, before
            )));
        }
    }

    let profile = match trimmed(&criteria.quality_profile) {
        Some(name) => {
            quality::lookup(name).ok_or_else(|| HarvestError::UnknownProfile(name.to_string()))?
        }
        None => preferences.profile(),
    };

    let filters = SearchFilters {
        min_duration,
        max_duration,
        min_views,
        max_views,
        upload_after: criteria.upload_after,
        upload_before: criteria.upload_before,
        exclude_live: !criteria.allow_live,
        safe_for_work: criteria.safe_for_work,
        keywords: keywords
            .map(|k| k.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default(),
    };

    Ok(QueryDescriptor {
        term,
        order: criteria.order,
        max_results,
        filters,
        profile,
        kind: criteria.kind,
        hints: preferences.runtime_hints(),
    })
}
