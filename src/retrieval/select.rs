//! Preview format selection.
//!
//! Candidates must match the requested kind exactly: audio previews use
//! audio-only streams, video previews use progressive streams carrying both
//! audio and video so a single link plays. Among candidates within the
//! profile ceiling the first in this order wins:
//!
//! * audio: bitrate desc, preferred codec, container (m4a, webm, other), format id
//! * video: height desc, fps desc, total bitrate desc, container (mp4, webm, other), format id

use super::PreviewLink;
use crate::error::{HarvestError, Result};
use crate::extractor::{FormatDescriptor, MediaKind};
use crate::quality::QualityProfile;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use url::Url;

fn is_candidate(format: &FormatDescriptor, kind: MediaKind) -> bool {
    if format.url.is_none() {
        return false;
    }
    match kind {
        MediaKind::Audio => format.has_audio() && !format.has_video(),
        MediaKind::Video => format.has_audio() && format.has_video(),
    }
}

fn audio_kbps(format: &FormatDescriptor) -> Option<f64> {
    format.abr.or(format.tbr)
}

fn within_ceiling(format: &FormatDescriptor, kind: MediaKind, profile: &QualityProfile) -> bool {
    match kind {
        MediaKind::Audio => {
            audio_kbps(format).map_or(true, |kbps| kbps <= f64::from(profile.max_audio_kbps))
        }
        MediaKind::Video => {
            format.height.map_or(true, |h| h <= profile.max_height)
                && format.fps.map_or(true, |fps| fps <= f64::from(profile.max_fps))
        }
    }
}

/// `opus`, `aac` (including `mp4a.*`) or the raw codec name.
fn codec_family(codec: &str) -> &str {
    if codec.starts_with("mp4a") {
        "aac"
    } else {
        codec.split('.').next().unwrap_or(codec)
    }
}

fn codec_rank(format: &FormatDescriptor, profile: &QualityProfile) -> usize {
    let family = format.acodec.as_deref().map(codec_family).unwrap_or_default();
    profile
        .preferred_audio_codecs
        .iter()
        .position(|c| *c == family)
        .unwrap_or(profile.preferred_audio_codecs.len())
}

fn container_rank(format: &FormatDescriptor, order: [&str; 2]) -> usize {
    let ext = format.ext.as_deref().unwrap_or_default();
    order.iter().position(|c| *c == ext).unwrap_or(order.len())
}

/// Descending on a possibly-missing float; missing sorts last.
fn desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.unwrap_or(-1.0);
    let b = b.unwrap_or(-1.0);
    b.total_cmp(&a)
}

fn compare(
    a: &FormatDescriptor,
    b: &FormatDescriptor,
    kind: MediaKind,
    profile: &QualityProfile,
) -> Ordering {
    let ranked = match kind {
        MediaKind::Audio => desc(audio_kbps(a), audio_kbps(b))
            .then_with(|| codec_rank(a, profile).cmp(&codec_rank(b, profile)))
            .then_with(|| container_rank(a, ["m4a", "webm"]).cmp(&container_rank(b, ["m4a", "webm"]))),
        MediaKind::Video => desc(a.height.map(f64::from), b.height.map(f64::from))
            .then_with(|| desc(a.fps, b.fps))
            .then_with(|| desc(a.tbr, b.tbr))
            .then_with(|| container_rank(a, ["mp4", "webm"]).cmp(&container_rank(b, ["mp4", "webm"]))),
    };
    ranked.then_with(|| a.format_id.cmp(&b.format_id))
}

/// Best format of exactly `kind` within the profile ceiling, if any.
pub fn select_format<'a>(
    formats: &'a [FormatDescriptor],
    kind: MediaKind,
    profile: &QualityProfile,
) -> Option<&'a FormatDescriptor> {
    formats
        .iter()
        .filter(|f| is_candidate(f, kind) && within_ceiling(f, kind, profile))
        .min_by(|a, b| compare(a, b, kind, profile))
}

/// Validate the selected format's URL and read its expiry, if advertised.
pub fn preview_link(format: &FormatDescriptor, kind: MediaKind) -> Result<PreviewLink> {
    let raw = format
        .url
        .as_deref()
        .ok_or_else(|| HarvestError::InvalidLink(format!("format {} has no url", format.format_id)))?;
    let url = Url::parse(raw).map_err(|e| HarvestError::InvalidLink(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(HarvestError::InvalidLink(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }

    let expires_at = url
        .query_pairs()
        .find(|(key, _)| key == "expire")
        .and_then(|(_, value)| value.parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    Ok(PreviewLink {
        url: url.to_string(),
        format_id: format.format_id.clone(),
        label: format.label(),
        kind,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality;

    fn audio(id: &str, codec: &str, ext: &str, abr: f64) -> FormatDescriptor {
        FormatDescriptor {
            format_id: id.into(),
            url: Some(format!("https://cdn.example.com/{id}")),
            ext: Some(ext.into()),
            acodec: Some(codec.into()),
            vcodec: Some("none".into()),
            abr: Some(abr),
            ..FormatDescriptor::default()
        }
    }

    fn video(id: &str, height: u32, fps: f64, with_audio: bool) -> FormatDescriptor {
        FormatDescriptor {
            format_id: id.into(),
            url: Some(format!("https://cdn.example.com/{id}")),
            ext: Some("mp4".into()),
            acodec: Some(if with_audio { "mp4a.40.2" } else { "none" }.into()),
            vcodec: Some("avc1.64001F".into()),
            height: Some(height),
            fps: Some(fps),
            ..FormatDescriptor::default()
        }
    }

    #[test]
    fn test_audio_prefers_bitrate_within_ceiling() {
        let formats = vec![
            audio("140", "mp4a.40.2", "m4a", 129.0),
            audio("251", "opus", "webm", 160.0),
            audio("774", "opus", "webm", 256.0),
            video("18", 360, 30.0, true),
        ];
        let medium = quality::lookup("medium").unwrap();
        assert_eq!(
            select_format(&formats, MediaKind::Audio, medium).map(|f| f.format_id.as_str()),
            Some("251")
        );
        let high = quality::lookup("high").unwrap();
        assert_eq!(
            select_format(&formats, MediaKind::Audio, high).map(|f| f.format_id.as_str()),
            Some("774")
        );
    }

    #[test]
    fn test_audio_ties_break_on_codec_then_container() {
        let formats = vec![
            audio("b", "mp4a.40.2", "m4a", 128.0),
            audio("a", "opus", "webm", 128.0),
        ];
        let profile = quality::default_profile();
        assert_eq!(
            select_format(&formats, MediaKind::Audio, profile).map(|f| f.format_id.as_str()),
            Some("a")
        );
    }

    #[test]
    fn test_video_requires_progressive_stream() {
        let formats = vec![
            video("137", 1080, 30.0, false),
            video("22", 720, 30.0, true),
            video("18", 360, 30.0, true),
        ];
        let profile = quality::default_profile();
        assert_eq!(
            select_format(&formats, MediaKind::Video, profile).map(|f| f.format_id.as_str()),
            Some("22")
        );

        let data_saving = quality::lookup("data_saving").unwrap();
        assert_eq!(
            select_format(&formats, MediaKind::Video, data_saving).map(|f| f.format_id.as_str()),
            Some("18")
        );
    }

    #[test]
    fn test_no_candidate_of_requested_kind() {
        let formats = vec![audio("251", "opus", "webm", 160.0)];
        assert!(select_format(&formats, MediaKind::Video, quality::default_profile()).is_none());
    }

    #[test]
    fn test_preview_link_reads_expiry() {
        let mut format = audio("251", "opus", "webm", 160.0);
        format.url = Some("https://rr1.example.com/videoplayback?expire=1700000000&id=x".into());
        let link = preview_link(&format, MediaKind::Audio).unwrap();
        assert_eq!(link.expires_at.map(|t| t.timestamp()), Some(1_700_000_000));
        assert_eq!(link.label, "160k webm");

        format.url = Some("file:///etc/passwd".into());
        assert!(matches!(
            preview_link(&format, MediaKind::Audio),
            Err(HarvestError::InvalidLink(_))
        ));
    }
}
