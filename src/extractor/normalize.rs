//! Maps heterogeneous provider records onto [`TrackRecord`].
//!
//! Every known field variant is tried in order; anything missing resolves to a
//! default. Only records without an id or title are rejected.

use super::track::{FormatDescriptor, MediaKind, TrackRecord};
use chrono::NaiveDate;
use serde_json::Value;

fn first_str<'a>(entry: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| entry.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Accepts integers, floats and numeric strings.
fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite() && *n >= 0.0)
}

fn count(value: Option<&Value>) -> Option<u64> {
    number(value).map(|n| n.round() as u64)
}

fn upload_date(entry: &Value) -> Option<NaiveDate> {
    let raw = match entry.get("upload_date")? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    NaiveDate::parse_from_str(&raw, "%Y%m%d").ok()
}

fn thumbnail(entry: &Value) -> Option<String> {
    entry
        .get("thumbnails")
        .and_then(Value::as_array)
        .and_then(|thumbs| {
            thumbs
                .iter()
                .find_map(|t| t.get("url").and_then(Value::as_str))
        })
        .or_else(|| entry.get("thumbnail").and_then(Value::as_str))
        .map(str::to_string)
}

fn is_live(entry: &Value) -> bool {
    entry.get("is_live").and_then(Value::as_bool).unwrap_or(false)
        || entry.get("live_status").and_then(Value::as_str) == Some("is_live")
}

/// Normalize one entry of a provider `formats` array.
pub fn normalize_format(entry: &Value) -> Option<FormatDescriptor> {
    let format_id = first_str(entry, &["format_id", "itag", "id"])?.to_string();
    let owned = |key: &str| first_str(entry, &[key]).map(|s| s.to_lowercase());
    Some(FormatDescriptor {
        format_id,
        url: first_str(entry, &["url"]).map(str::to_string),
        ext: owned("ext"),
        acodec: owned("acodec"),
        vcodec: owned("vcodec"),
        abr: number(entry.get("abr")),
        tbr: number(entry.get("tbr")),
        height: count(entry.get("height")).and_then(|h| u32::try_from(h).ok()),
        fps: number(entry.get("fps")),
    })
}

/// Normalize the `formats` array of a record (missing or malformed → empty).
pub fn normalize_formats(entry: &Value) -> Vec<FormatDescriptor> {
    entry
        .get("formats")
        .and_then(Value::as_array)
        .map(|formats| formats.iter().filter_map(normalize_format).collect())
        .unwrap_or_default()
}

/// Infer the media kind from format metadata.
///
/// Video when any format (or the record itself) carries a video stream, audio
/// when only audio streams are known, video when nothing is known.
pub fn infer_kind(entry: &Value, formats: &[FormatDescriptor]) -> MediaKind {
    if formats.iter().any(FormatDescriptor::has_video) {
        return MediaKind::Video;
    }
    if formats.iter().any(FormatDescriptor::has_audio) {
        return MediaKind::Audio;
    }
    let top = FormatDescriptor {
        vcodec: first_str(entry, &["vcodec"]).map(str::to_lowercase),
        acodec: first_str(entry, &["acodec"]).map(str::to_lowercase),
        height: count(entry.get("height")).and_then(|h| u32::try_from(h).ok()),
        ..FormatDescriptor::default()
    };
    if !top.has_video() && top.has_audio() {
        MediaKind::Audio
    } else {
        MediaKind::Video
    }
}

/// Normalize one provider record; `None` when required fields are missing.
pub fn normalize_entry(entry: &Value) -> Option<TrackRecord> {
    if !entry.is_object() {
        return None;
    }
    let id = first_str(entry, &["id", "video_id", "display_id"])?.to_string();
    let title = first_str(entry, &["title", "fulltitle"])?.to_string();

    let formats = normalize_formats(entry);
    let kind = infer_kind(entry, &formats);

    let webpage_url = first_str(entry, &["webpage_url", "original_url", "url"])
        .filter(|u| u.starts_with("http"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", id));

    Some(TrackRecord {
        uploader: first_str(entry, &["uploader", "channel", "creator"])
            .unwrap_or("unknown")
            .to_string(),
        duration_seconds: count(entry.get("duration")),
        view_count: count(entry.get("view_count")),
        upload_date: upload_date(entry),
        webpage_url,
        thumbnail: thumbnail(entry),
        description: first_str(entry, &["description"]).map(str::to_string),
        tags: entry
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        age_limit: count(entry.get("age_limit"))
            .and_then(|a| u32::try_from(a).ok())
            .unwrap_or(0),
        is_live: is_live(entry),
        kind,
        formats,
        id,
        title,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_full_entry() {
        let entry = json!({
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "channel": "Rick Astley",
            "duration": 212.0,
            "view_count": "1,500,000,000",
            "upload_date": "20091025",
            "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "thumbnails": [{"id": "0"}, {"url": "https://i.ytimg.com/vi/x.jpg"}],
            "tags": ["pop", 7],
            "formats": [
                {"format_id": "251", "acodec": "opus", "vcodec": "none", "abr": 129.5, "ext": "webm"},
                {"format_id": "137", "acodec": "none", "vcodec": "avc1.640028", "height": 1080, "ext": "mp4"}
            ]
        });

        let record = normalize_entry(&entry).unwrap();
        assert_eq!(record.uploader, "Rick Astley");
        assert_eq!(record.duration_seconds, Some(212));
        assert_eq!(record.view_count, Some(1_500_000_000));
        assert_eq!(record.upload_date, NaiveDate::from_ymd_opt(2009, 10, 25));
        assert_eq!(record.thumbnail.as_deref(), Some("https://i.ytimg.com/vi/x.jpg"));
        assert_eq!(record.tags, vec!["pop"]);
        assert_eq!(record.kind, MediaKind::Video);
        assert_eq!(record.formats.len(), 2);
        assert_eq!(record.age_limit, 0);
    }

    #[test]
    fn test_missing_required_fields_are_dropped() {
        assert!(normalize_entry(&json!({"title": "no id"})).is_none());
        assert!(normalize_entry(&json!({"id": "abc", "title": "  "})).is_none());
        assert!(normalize_entry(&json!("not an object")).is_none());
    }

    #[test]
    fn test_field_variants_and_defaults() {
        let record = normalize_entry(&json!({
            "video_id": "abc123",
            "fulltitle": "Mix",
            "url": "abc123",
            "live_status": "is_live",
            "age_limit": 18
        }))
        .unwrap();

        assert_eq!(record.id, "abc123");
        assert_eq!(record.title, "Mix");
        assert_eq!(record.uploader, "unknown");
        assert_eq!(record.webpage_url, "https://www.youtube.com/watch?v=abc123");
        assert!(record.is_live);
        assert_eq!(record.age_limit, 18);
        assert!(record.duration_seconds.is_none());
        assert_eq!(record.kind, MediaKind::Video);
    }

    #[test]
    fn test_audio_only_kind() {
        let record = normalize_entry(&json!({
            "id": "a1",
            "title": "Podcast",
            "formats": [{"format_id": "140", "acodec": "mp4a.40.2", "vcodec": "none", "abr": 128}]
        }))
        .unwrap();
        assert_eq!(record.kind, MediaKind::Audio);

        let top_level = normalize_entry(&json!({
            "id": "a2",
            "title": "Stream",
            "acodec": "opus",
            "vcodec": "none"
        }))
        .unwrap();
        assert_eq!(top_level.kind, MediaKind::Audio);
    }
}
