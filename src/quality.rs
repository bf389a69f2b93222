//! Shared quality profiles for audio/video selection.
//!
//! A profile bundles the bitrate floors that drive persisted downloads and the
//! ceilings that bound preview links. The table is static; lookups by an
//! unknown name return `None`, and callers decide whether that is an error
//! (request building) or a fallback (preference resolution).

use serde::Serialize;

/// Profile used when nothing else is configured.
pub const DEFAULT_PROFILE_NAME: &str = "high";

/// Minimum requirements for a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoRequirement {
    pub min_height: u32,
    pub min_fps: Option<u32>,
}

impl VideoRequirement {
    const fn new(min_height: u32, min_fps: Option<u32>) -> Self {
        Self {
            min_height,
            min_fps,
        }
    }
}

/// Named bundle of bitrate and resolution thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityProfile {
    pub name: &'static str,
    /// Preferred audio bitrates in kbps, best first.
    pub audio_floors: &'static [u32],
    /// Highest audio bitrate a selection may use, in kbps.
    pub max_audio_kbps: u32,
    /// Preferred video shapes, best first.
    pub video_floors: &'static [VideoRequirement],
    pub max_height: u32,
    pub max_fps: u32,
    /// Audio codecs in order of preference.
    pub preferred_audio_codecs: &'static [&'static str],
}

static PROFILES: [QualityProfile; 3] = [
    QualityProfile {
        name: "high",
        audio_floors: &[256, 160, 128],
        max_audio_kbps: 320,
        video_floors: &[
            VideoRequirement::new(1080, Some(60)),
            VideoRequirement::new(1080, None),
            VideoRequirement::new(720, Some(60)),
            VideoRequirement::new(720, None),
        ],
        max_height: 1080,
        max_fps: 60,
        preferred_audio_codecs: &["opus", "aac"],
    },
    QualityProfile {
        name: "medium",
        audio_floors: &[160, 128],
        max_audio_kbps: 192,
        video_floors: &[
            VideoRequirement::new(720, None),
            VideoRequirement::new(480, Some(60)),
            VideoRequirement::new(480, None),
        ],
        max_height: 720,
        max_fps: 60,
        preferred_audio_codecs: &["opus", "aac"],
    },
    QualityProfile {
        name: "data_saving",
        audio_floors: &[128, 96],
        max_audio_kbps: 128,
        video_floors: &[
            VideoRequirement::new(480, None),
            VideoRequirement::new(360, None),
        ],
        max_height: 480,
        max_fps: 30,
        preferred_audio_codecs: &["opus", "aac"],
    },
];

/// All known profiles, in table order.
pub fn profiles() -> &'static [QualityProfile] {
    &PROFILES
}

/// Names of all known profiles.
pub fn profile_names() -> Vec<&'static str> {
    PROFILES.iter().map(|p| p.name).collect()
}

/// Look up a profile by name (case-insensitive).
pub fn lookup(name: &str) -> Option<&'static QualityProfile> {
    let wanted = name.trim().to_lowercase();
    PROFILES.iter().find(|p| p.name == wanted)
}

/// The profile used when nothing valid is configured.
pub fn default_profile() -> &'static QualityProfile {
    lookup(DEFAULT_PROFILE_NAME).unwrap_or(&PROFILES[0])
}

fn push_unique(selectors: &mut Vec<String>, candidate: String) {
    if !selectors.contains(&candidate) {
        selectors.push(candidate);
    }
}

impl QualityProfile {
    /// Audio-only selectors, best first, ending in unconstrained fallbacks.
    pub fn audio_selectors(&self) -> Vec<String> {
        let cap = self.max_audio_kbps;
        let mut selectors = Vec::new();
        for floor in self.audio_floors.iter().filter(|f| **f <= cap) {
            push_unique(&mut selectors, format!("bestaudio[abr>={floor}][abr<={cap}]"));
        }
        push_unique(&mut selectors, format!("bestaudio[abr<={cap}]"));
        push_unique(&mut selectors, "bestaudio".to_string());
        selectors
    }

    /// Video-only selectors, best first.
    pub fn video_selectors(&self) -> Vec<String> {
        let ceiling = format!("[height<={}][fps<={}]", self.max_height, self.max_fps);
        let mut selectors = Vec::new();
        for requirement in self.video_floors {
            let mut selector = format!("bestvideo[height>={}]", requirement.min_height);
            if let Some(fps) = requirement.min_fps {
                selector.push_str(&format!("[fps>={fps}]"));
            }
            selector.push_str(&ceiling);
            push_unique(&mut selectors, selector);
        }
        push_unique(&mut selectors, format!("bestvideo{ceiling}"));
        selectors
    }

    /// Full yt-dlp format expression for audio extraction.
    pub fn audio_selector(&self) -> String {
        let mut selectors = self.audio_selectors();
        push_unique(&mut selectors, "best".to_string());
        selectors.join("/")
    }

    /// Full yt-dlp format expression for merged video + audio downloads.
    pub fn video_audio_selector(&self) -> String {
        let audio = self.audio_selectors();
        let mut combos = Vec::new();
        for video in self.video_selectors() {
            for track in &audio {
                push_unique(&mut combos, format!("{video}+{track}"));
            }
        }
        push_unique(&mut combos, "bestvideo+bestaudio".to_string());
        push_unique(&mut combos, "best".to_string());
        combos.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup("HIGH").map(|p| p.name), Some("high"));
        assert_eq!(lookup(" data_saving ").map(|p| p.name), Some("data_saving"));
        assert!(lookup("ultra").is_none());
    }

    #[test]
    fn test_default_profile() {
        assert_eq!(default_profile().name, DEFAULT_PROFILE_NAME);
        assert_eq!(profile_names(), vec!["high", "medium", "data_saving"]);
    }

    #[test]
    fn test_audio_selector_respects_ceiling() {
        let profile = lookup("medium").unwrap();
        assert_eq!(
            profile.audio_selector(),
            "bestaudio[abr>=160][abr<=192]/bestaudio[abr>=128][abr<=192]/bestaudio[abr<=192]/bestaudio/best"
        );
    }

    #[test]
    fn test_video_selectors_are_capped() {
        let profile = lookup("data_saving").unwrap();
        let selectors = profile.video_selectors();
        assert_eq!(selectors[0], "bestvideo[height>=480][height<=480][fps<=30]");
        assert!(selectors.iter().all(|s| s.contains("[height<=480][fps<=30]")));
    }

    #[test]
    fn test_video_audio_selector_has_fallbacks() {
        let selector = lookup("high").unwrap().video_audio_selector();
        assert!(selector.starts_with("bestvideo[height>=1080][fps>=60]"));
        assert!(selector.ends_with("bestvideo+bestaudio/best"));
        let parts: Vec<&str> = selector.split('/').collect();
        let mut unique = parts.clone();
        unique.dedup();
        assert_eq!(parts.len(), unique.len());
    }
}
