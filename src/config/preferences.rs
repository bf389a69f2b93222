//! Preference resolution.
//!
//! Preferences are built once per process by overlaying, lowest to highest
//! precedence: built-in defaults, the TOML preference file, `HARVESTER_*`
//! environment variables and finally explicit command-line overrides. A
//! malformed value only resets its own field to the default.

use super::runtime::{self, JsRuntime, RuntimeHints, RuntimeProbe, RuntimeSource};
use crate::extractor::MediaKind;
use crate::quality::{self, QualityProfile, DEFAULT_PROFILE_NAME};
use crate::voice::VOICE_ENGINES;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "HARVESTER_";

/// Upper bound for the result-count cap.
pub const MAX_RESULTS_LIMIT: u32 = 100;

const AUDIO_FORMATS: [&str; 7] = ["mp3", "m4a", "aac", "opus", "flac", "wav", "ogg"];
const VIDEO_FORMATS: [&str; 3] = ["mp4", "mkv", "webm"];
const DEFAULT_MODEL_NAME: &str = "vosk-model-small-en-us-0.15";

/// Every recognized preference key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    DownloadDir,
    AudioFormat,
    VideoFormat,
    DefaultKind,
    QualityProfile,
    MaxResults,
    JsRuntime,
    JsRuntimePath,
    RemoteComponents,
    VoiceEnabled,
    VoiceEngine,
    VoiceModelsDir,
    VoiceModelName,
    VoiceModelPath,
    VoiceLanguage,
    VoicePhraseSeconds,
}

impl PreferenceKey {
    pub const ALL: [PreferenceKey; 16] = [
        PreferenceKey::DownloadDir,
        PreferenceKey::AudioFormat,
        PreferenceKey::VideoFormat,
        PreferenceKey::DefaultKind,
        PreferenceKey::QualityProfile,
        PreferenceKey::MaxResults,
        PreferenceKey::JsRuntime,
        PreferenceKey::JsRuntimePath,
        PreferenceKey::RemoteComponents,
        PreferenceKey::VoiceEnabled,
        PreferenceKey::VoiceEngine,
        PreferenceKey::VoiceModelsDir,
        PreferenceKey::VoiceModelName,
        PreferenceKey::VoiceModelPath,
        PreferenceKey::VoiceLanguage,
        PreferenceKey::VoicePhraseSeconds,
    ];

    /// Key as written in the preference file.
    pub fn name(&self) -> &'static str {
        match self {
            PreferenceKey::DownloadDir => "download_dir",
            PreferenceKey::AudioFormat => "audio_format",
            PreferenceKey::VideoFormat => "video_format",
            PreferenceKey::DefaultKind => "default_kind",
            PreferenceKey::QualityProfile => "quality_profile",
            PreferenceKey::MaxResults => "max_results",
            PreferenceKey::JsRuntime => "js_runtime",
            PreferenceKey::JsRuntimePath => "js_runtime_path",
            PreferenceKey::RemoteComponents => "remote_components",
            PreferenceKey::VoiceEnabled => "voice_enabled",
            PreferenceKey::VoiceEngine => "voice_engine",
            PreferenceKey::VoiceModelsDir => "voice_models_dir",
            PreferenceKey::VoiceModelName => "voice_model_name",
            PreferenceKey::VoiceModelPath => "voice_model_path",
            PreferenceKey::VoiceLanguage => "voice_language",
            PreferenceKey::VoicePhraseSeconds => "voice_phrase_seconds",
        }
    }

    /// Environment variable overriding this key.
    pub fn env_var(&self) -> String {
        format!("{}{}", ENV_PREFIX, self.name().to_uppercase())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|k| k.name() == wanted)
    }
}

/// Voice subsystem defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub enabled: bool,
    pub engine: String,
    pub models_dir: PathBuf,
    pub model_name: String,
    pub model_path: PathBuf,
    pub language: String,
    pub phrase_seconds: u32,
}

/// Resolved, immutable settings shared by every entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub root: PathBuf,
    pub download_dir: PathBuf,
    pub audio_format: String,
    pub video_format: String,
    pub default_kind: MediaKind,
    pub quality_profile: String,
    pub max_results: u32,
    pub js_runtime: Option<JsRuntime>,
    pub runtime_source: RuntimeSource,
    pub remote_components: Vec<String>,
    pub voice: VoiceSettings,
}

/// The inputs resolution reads: a file path, an environment snapshot and
/// command-line overrides.
#[derive(Debug, Clone, Default)]
pub struct PreferenceSources {
    /// Base for relative paths.
    pub root: PathBuf,
    pub file: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub overrides: HashMap<PreferenceKey, String>,
}

impl PreferenceSources {
    /// Snapshot the current process environment.
    pub fn from_process(config: Option<PathBuf>) -> Self {
        Self {
            root: Preferences::default_root(),
            file: Some(config.unwrap_or_else(Preferences::default_config_path)),
            env: std::env::vars()
                .filter(|(k, _)| k.starts_with(ENV_PREFIX))
                .collect(),
            overrides: HashMap::new(),
        }
    }

    /// Add a highest-precedence value (blank values are ignored).
    pub fn with_override(mut self, key: PreferenceKey, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.overrides.insert(key, value);
        }
        self
    }
}

impl Preferences {
    /// Resolve preferences from the process environment and default file.
    pub fn resolve() -> Self {
        Self::resolve_from(&PreferenceSources::from_process(None), &runtime::PathProbe)
    }

    /// Resolve preferences from explicit sources.
    pub fn resolve_from(sources: &PreferenceSources, probe: &dyn RuntimeProbe) -> Self {
        let mut layered = match &sources.file {
            Some(path) => load_file_layer(path),
            None => HashMap::new(),
        };
        for key in PreferenceKey::ALL {
            if let Some(value) = sources.env.get(&key.env_var()) {
                if !value.trim().is_empty() {
                    layered.insert(key, value.clone());
                }
            }
        }
        layered.extend(sources.overrides.clone());

        let layer = Layer {
            values: layered,
            root: &sources.root,
        };

        let default_kind = layer.parse(PreferenceKey::DefaultKind, MediaKind::Audio, |v| {
            v.parse::<MediaKind>().ok()
        });

        let quality_profile = layer.parse(
            PreferenceKey::QualityProfile,
            DEFAULT_PROFILE_NAME.to_string(),
            |v| quality::lookup(v).map(|p| p.name.to_string()),
        );

        let max_results = layer.parse(PreferenceKey::MaxResults, 12, |v| {
            v.trim()
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=MAX_RESULTS_LIMIT).contains(n))
        });

        let (js_runtime, runtime_source) = resolve_runtime(&layer, probe);

        let remote_components = layer
            .get(PreferenceKey::RemoteComponents)
            .map(split_list)
            .unwrap_or_default();

        let models_dir = layer.path(
            PreferenceKey::VoiceModelsDir,
            sources.root.join("vosk-models"),
        );
        let model_name = layer.parse(
            PreferenceKey::VoiceModelName,
            DEFAULT_MODEL_NAME.to_string(),
            |v| Some(v.trim().to_string()).filter(|s| !s.is_empty()),
        );
        let model_path = layer.path(PreferenceKey::VoiceModelPath, models_dir.join(&model_name));

        let voice = VoiceSettings {
            enabled: layer.parse(PreferenceKey::VoiceEnabled, false, parse_bool),
            engine: layer.parse(PreferenceKey::VoiceEngine, VOICE_ENGINES[0].to_string(), |v| {
                one_of(v, &VOICE_ENGINES)
            }),
            models_dir,
            model_name,
            model_path,
            language: layer.parse(PreferenceKey::VoiceLanguage, "en-US".to_string(), |v| {
                Some(v.trim().to_string()).filter(|s| is_language_tag(s))
            }),
            phrase_seconds: layer.parse(PreferenceKey::VoicePhraseSeconds, 5, |v| {
                v.trim().parse::<u32>().ok().filter(|n| (1..=30).contains(n))
            }),
        };

        let preferences = Self {
            root: sources.root.clone(),
            download_dir: layer.path(PreferenceKey::DownloadDir, sources.root.join("downloads")),
            audio_format: layer.parse(PreferenceKey::AudioFormat, "mp3".to_string(), |v| {
                one_of(v, &AUDIO_FORMATS)
            }),
            video_format: layer.parse(PreferenceKey::VideoFormat, "mp4".to_string(), |v| {
                one_of(v, &VIDEO_FORMATS)
            }),
            default_kind,
            quality_profile,
            max_results,
            js_runtime,
            runtime_source,
            remote_components,
            voice,
        };
        debug!(?preferences, "Resolved preferences");
        preferences
    }

    /// Get the default preference file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("harvester")
            .join("preferences.toml")
    }

    /// Base directory for relative paths.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("harvester")
    }

    /// Expand `~` and anchor relative paths at `root`.
    pub fn expand_path(raw: &str, root: &Path) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(raw.trim()).to_string());
        if expanded.is_absolute() {
            expanded
        } else {
            root.join(expanded)
        }
    }

    /// The profile named by `quality_profile`.
    pub fn profile(&self) -> &'static QualityProfile {
        quality::lookup(&self.quality_profile).unwrap_or_else(quality::default_profile)
    }

    /// Hints injected into every provider and transcoder call.
    pub fn runtime_hints(&self) -> RuntimeHints {
        RuntimeHints {
            js_runtime: self.js_runtime.clone(),
            remote_components: self.remote_components.clone(),
        }
    }

    /// Output container for a persisted download of the given kind.
    pub fn container_for(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Audio => &self.audio_format,
            MediaKind::Video => &self.video_format,
        }
    }

    /// Flat table using the same keys as the preference file.
    pub fn to_table(&self) -> toml::Table {
        let mut table = toml::Table::new();
        let mut put = |key: PreferenceKey, value: toml::Value| {
            table.insert(key.name().to_string(), value);
        };
        let path = |p: &Path| toml::Value::String(p.display().to_string());

        put(PreferenceKey::DownloadDir, path(&self.download_dir));
        put(PreferenceKey::AudioFormat, self.audio_format.clone().into());
        put(PreferenceKey::VideoFormat, self.video_format.clone().into());
        put(PreferenceKey::DefaultKind, self.default_kind.to_string().into());
        put(PreferenceKey::QualityProfile, self.quality_profile.clone().into());
        put(PreferenceKey::MaxResults, i64::from(self.max_results).into());
        if let Some(runtime) = &self.js_runtime {
            put(PreferenceKey::JsRuntime, runtime.name.clone().into());
            if let Some(p) = &runtime.path {
                put(PreferenceKey::JsRuntimePath, path(p));
            }
        }
        put(
            PreferenceKey::RemoteComponents,
            self.remote_components.join(",").into(),
        );
        put(PreferenceKey::VoiceEnabled, self.voice.enabled.into());
        put(PreferenceKey::VoiceEngine, self.voice.engine.clone().into());
        put(PreferenceKey::VoiceModelsDir, path(&self.voice.models_dir));
        put(PreferenceKey::VoiceModelName, self.voice.model_name.clone().into());
        put(PreferenceKey::VoiceModelPath, path(&self.voice.model_path));
        put(PreferenceKey::VoiceLanguage, self.voice.language.clone().into());
        put(
            PreferenceKey::VoicePhraseSeconds,
            i64::from(self.voice.phrase_seconds).into(),
        );
        table
    }

    /// Write the flat table to a preference file.
    pub fn save_to(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.to_table())?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Merged raw values plus the root used for path values.
struct Layer<'a> {
    values: HashMap<PreferenceKey, String>,
    root: &'a Path,
}

impl Layer<'_> {
    fn get(&self, key: PreferenceKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Parse a value, falling back to `default` when absent or malformed.
    fn parse<T>(&self, key: PreferenceKey, default: T, parse: impl Fn(&str) -> Option<T>) -> T {
        match self.get(key) {
            None => default,
            Some(raw) => parse(raw).unwrap_or_else(|| {
                warn!("Ignoring malformed value for {}: {:?}", key.name(), raw);
                default
            }),
        }
    }

    fn path(&self, key: PreferenceKey, default: PathBuf) -> PathBuf {
        self.parse(key, default, |v| {
            Some(v.trim())
                .filter(|s| !s.is_empty())
                .map(|s| Preferences::expand_path(s, self.root))
        })
    }
}

fn resolve_runtime(layer: &Layer<'_>, probe: &dyn RuntimeProbe) -> (Option<JsRuntime>, RuntimeSource) {
    let explicit_path = layer
        .get(PreferenceKey::JsRuntimePath)
        .map(|p| Preferences::expand_path(p, layer.root));

    let configured = match (layer.get(PreferenceKey::JsRuntime), explicit_path) {
        (Some(name), path) => {
            let runtime = runtime::from_config(name, path, probe);
            if runtime.is_none() {
                warn!("Ignoring malformed value for js_runtime: {:?}", name);
            }
            runtime
        }
        (None, Some(path)) => runtime::from_config(&path.to_string_lossy(), None, probe),
        (None, None) => None,
    };

    match configured {
        Some(runtime) => (Some(runtime), RuntimeSource::Configured),
        None => match runtime::detect(probe) {
            Some(runtime) => (Some(runtime), RuntimeSource::Detected),
            None => (None, RuntimeSource::None),
        },
    }
}

/// Read the preference file into raw key/value pairs.
///
/// A missing file is silent; an unreadable or invalid one is ignored with a warning.
fn load_file_layer(path: &Path) -> HashMap<PreferenceKey, String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!("Cannot read preference file {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    let table: toml::Table = match toml::from_str(&content) {
        Ok(table) => table,
        Err(e) => {
            warn!("Ignoring invalid preference file {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    let mut values = HashMap::new();
    for (name, value) in table {
        let Some(key) = PreferenceKey::from_name(&name) else {
            warn!("Unknown preference key in {}: {}", path.display(), name);
            continue;
        };
        match value_text(&value) {
            Some(text) => {
                values.insert(key, text);
            }
            None => warn!("Ignoring non-scalar value for {}", name),
        }
    }
    values
}

fn value_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(items) => {
            let parts: Option<Vec<String>> = items
                .iter()
                .map(|item| match item {
                    toml::Value::Array(_) | toml::Value::Table(_) => None,
                    scalar => value_text(scalar),
                })
                .collect();
            parts.map(|p| p.join(","))
        }
        toml::Value::Table(_) => None,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.to_string());
        }
    }
    items
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn one_of(raw: &str, allowed: &[&str]) -> Option<String> {
    let value = raw.trim().trim_start_matches('.').to_lowercase();
    allowed.contains(&value.as_str()).then_some(value)
}

fn is_language_tag(tag: &str) -> bool {
    let mut parts = tag.split('-');
    let language_ok = parts
        .next()
        .is_some_and(|l| (2..=3).contains(&l.len()) && l.chars().all(|c| c.is_ascii_alphabetic()));
    let region_ok = match parts.next() {
        None => true,
        Some(r) => r.len() == 2 && r.chars().all(|c| c.is_ascii_alphabetic()),
    };
    language_ok && region_ok && parts.next().is_none()
}
