//! Post-fetch filter predicates.
//!
//! Each predicate looks at one record and is conjunctive with the others, so
//! the order in [`passes`] only affects how early a record is rejected.

use super::track::TrackRecord;
use crate::request::SearchFilters;

/// A missing duration fails a minimum but passes a maximum.
pub fn duration_ok(track: &TrackRecord, filters: &SearchFilters) -> bool {
    bounded(track.duration_seconds, filters.min_duration, filters.max_duration)
}

/// Same missing-value rule as [`duration_ok`].
pub fn views_ok(track: &TrackRecord, filters: &SearchFilters) -> bool {
    bounded(track.view_count, filters.min_views, filters.max_views)
}

/// Records without an upload date pass the window.
pub fn upload_window_ok(track: &TrackRecord, filters: &SearchFilters) -> bool {
    let Some(date) = track.upload_date else {
        return true;
    };
    filters.upload_after.map_or(true, |after| date >= after)
        && filters.upload_before.map_or(true, |before| date <= before)
}

pub fn live_ok(track: &TrackRecord, filters: &SearchFilters) -> bool {
    !(filters.exclude_live && track.is_live)
}

/// Age-restricted records are dropped when safe content is requested.
pub fn safe_content_ok(track: &TrackRecord, filters: &SearchFilters) -> bool {
    !filters.safe_for_work || track.age_limit == 0
}

/// Every keyword token must occur in the record's search text.
pub fn keywords_ok(track: &TrackRecord, filters: &SearchFilters) -> bool {
    if filters.keywords.is_empty() {
        return true;
    }
    let blob = track.search_blob();
    filters.keywords.iter().all(|k| blob.contains(k.as_str()))
}

/// All predicates, in pipeline order.
pub fn passes(track: &TrackRecord, filters: &SearchFilters) -> bool {
    duration_ok(track, filters)
        && views_ok(track, filters)
        && upload_window_ok(track, filters)
        && live_ok(track, filters)
        && safe_content_ok(track, filters)
        && keywords_ok(track, filters)
}

fn bounded(value: Option<u64>, min: Option<u64>, max: Option<u64>) -> bool {
    match value {
        Some(v) => min.map_or(true, |lo| v >= lo) && max.map_or(true, |hi| v <= hi),
        None => min.is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::track::tests::track;
    use chrono::NaiveDate;

    #[test]
    fn test_duration_bounds() {
        let filters = SearchFilters {
            min_duration: Some(120),
            max_duration: Some(600),
            ..SearchFilters::default()
        };
        let mut record = track("a", "A");
        record.duration_seconds = Some(240);
        assert!(duration_ok(&record, &filters));
        record.duration_seconds = Some(60);
        assert!(!duration_ok(&record, &filters));
        record.duration_seconds = None;
        assert!(!duration_ok(&record, &filters));

        let max_only = SearchFilters {
            max_duration: Some(600),
            ..SearchFilters::default()
        };
        assert!(duration_ok(&record, &max_only));
    }

    #[test]
    fn test_views_and_safe_content() {
        let filters = SearchFilters {
            min_views: Some(10_000),
            safe_for_work: true,
            ..SearchFilters::default()
        };
        let mut record = track("a", "A");
        record.view_count = Some(50_000);
        assert!(passes(&record, &filters));
        record.age_limit = 18;
        assert!(!safe_content_ok(&record, &filters));
        assert!(!passes(&record, &filters));
    }

    #[test]
    fn test_upload_window_and_live() {
        let filters = SearchFilters {
            upload_after: NaiveDate::from_ymd_opt(2020, 1, 1),
            exclude_live: true,
            ..SearchFilters::default()
        };
        let mut record = track("a", "A");
        record.upload_date = NaiveDate::from_ymd_opt(2019, 6, 1);
        assert!(!upload_window_ok(&record, &filters));
        record.upload_date = None;
        assert!(upload_window_ok(&record, &filters));
        record.is_live = true;
        assert!(!live_ok(&record, &filters));
    }

    #[test]
    fn test_keywords_match_all_tokens() {
        let filters = SearchFilters {
            keywords: vec!["live".into(), "set".into()],
            ..SearchFilters::default()
        };
        let mut record = track("a", "Trance LIVE Set 2024");
        assert!(keywords_ok(&record, &filters));
        record.title = "Trance Live Mix".into();
        assert!(!keywords_ok(&record, &filters));
        record.tags = vec!["sunset".into()];
        assert!(keywords_ok(&record, &filters));
    }
}
