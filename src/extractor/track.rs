//! Normalized track and format records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether a track (or a requested retrieval) is audio-only or video-capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            _ => Err(format!("Unknown media kind: {}", s)),
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// One stream variant offered by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub format_id: String,
    pub url: Option<String>,
    pub ext: Option<String>,
    pub acodec: Option<String>,
    pub vcodec: Option<String>,
    /// Audio bitrate in kbps.
    pub abr: Option<f64>,
    /// Total bitrate in kbps.
    pub tbr: Option<f64>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
}

fn is_codec(codec: &Option<String>) -> bool {
    codec
        .as_deref()
        .is_some_and(|c| !c.is_empty() && c != "none")
}

impl FormatDescriptor {
    pub fn has_audio(&self) -> bool {
        is_codec(&self.acodec)
    }

    pub fn has_video(&self) -> bool {
        is_codec(&self.vcodec) || (self.vcodec.is_none() && self.height.is_some_and(|h| h > 0))
    }

    /// Short label such as `1080p60 mp4` or `160k webm`.
    pub fn label(&self) -> String {
        let ext = self.ext.as_deref().unwrap_or("?");
        match (self.has_video(), self.height) {
            (true, Some(height)) => match self.fps {
                Some(fps) if fps > 30.0 => format!("{}p{} {}", height, fps.round() as u32, ext),
                _ => format!("{}p {}", height, ext),
            },
            _ => match self.abr.or(self.tbr) {
                Some(kbps) => format!("{}k {}", kbps.round() as u32, ext),
                None => ext.to_string(),
            },
        }
    }
}

/// Normalized representation of one search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub title: String,
    pub uploader: String,
    pub duration_seconds: Option<u64>,
    pub view_count: Option<u64>,
    pub upload_date: Option<NaiveDate>,
    pub webpage_url: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub age_limit: u32,
    pub is_live: bool,
    pub kind: MediaKind,
    pub formats: Vec<FormatDescriptor>,
}

impl TrackRecord {
    /// Best label for status lines.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }

    /// Lowercased text searched by keyword filters and title lookups.
    pub fn search_blob(&self) -> String {
        let description: String = self
            .description
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(240)
            .collect();
        let tags = self.tags.iter().take(10).cloned().collect::<Vec<_>>().join(" ");
        [self.title.as_str(), self.uploader.as_str(), description.as_str(), tags.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Best audio bitrate and video height seen among the formats.
    pub fn quality_summary(&self) -> String {
        let height = self.formats.iter().filter_map(|f| f.height).max();
        let abr = self
            .formats
            .iter()
            .filter(|f| f.has_audio())
            .filter_map(|f| f.abr)
            .fold(None, |best: Option<f64>, b| Some(best.map_or(b, |x| x.max(b))));
        match (height, abr) {
            (Some(h), Some(a)) => format!("{}p / {}k", h, a.round() as u32),
            (Some(h), None) => format!("{}p", h),
            (None, Some(a)) => format!("{}k", a.round() as u32),
            (None, None) => "-".to_string(),
        }
    }
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_duration(seconds: Option<u64>) -> String {
    let Some(total) = seconds else {
        return "--:--".to_string();
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn track(id: &str, title: &str) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            title: title.to_string(),
            uploader: "uploader".to_string(),
            duration_seconds: Some(240),
            view_count: Some(1_000),
            upload_date: None,
            webpage_url: format!("https://www.youtube.com/watch?v={}", id),
            thumbnail: None,
            description: None,
            tags: Vec::new(),
            age_limit: 0,
            is_live: false,
            kind: MediaKind::Video,
            formats: Vec::new(),
        }
    }

    #[test]
    fn test_media_kind_parse() {
        assert_eq!("Audio".parse::<MediaKind>(), Ok(MediaKind::Audio));
        assert!("podcast".parse::<MediaKind>().is_err());
        assert_eq!(MediaKind::Video.to_string(), "video");
    }

    #[test]
    fn test_format_label() {
        let video = FormatDescriptor {
            format_id: "299".into(),
            ext: Some("mp4".into()),
            vcodec: Some("avc1".into()),
            acodec: Some("none".into()),
            height: Some(1080),
            fps: Some(60.0),
            ..FormatDescriptor::default()
        };
        assert_eq!(video.label(), "1080p60 mp4");
        assert!(!video.has_audio());

        let audio = FormatDescriptor {
            format_id: "251".into(),
            ext: Some("webm".into()),
            vcodec: Some("none".into()),
            acodec: Some("opus".into()),
            abr: Some(129.4),
            ..FormatDescriptor::default()
        };
        assert_eq!(audio.label(), "129k webm");
        assert!(!audio.has_video());
    }

    #[test]
    fn test_search_blob_truncates_description() {
        let mut record = track("abc", "Night Drive");
        record.description = Some("x".repeat(500));
        record.tags = vec!["Synthwave".into()];
        let blob = record.search_blob();
        assert!(blob.starts_with("night drive uploader"));
        assert!(blob.ends_with("synthwave"));
        assert_eq!(blob.matches('x').count(), 240);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(65)), "01:05");
        assert_eq!(format_duration(Some(3725)), "01:02:05");
        assert_eq!(format_duration(None), "--:--");
    }
}
