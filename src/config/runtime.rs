//! Script-runtime detection and the hints passed to every yt-dlp invocation.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Runtimes probed, in order, when none is configured.
pub const KNOWN_RUNTIMES: [&str; 3] = ["node", "deno", "bun"];

/// Locates executables without running them.
pub trait RuntimeProbe {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Probe backed by a `PATH` lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathProbe;

impl RuntimeProbe for PathProbe {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// A JavaScript runtime yt-dlp can use to solve provider challenges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsRuntime {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl JsRuntime {
    /// yt-dlp `--js-runtimes` value: `name` or `name:path`.
    pub fn to_arg(&self) -> String {
        match &self.path {
            Some(path) => format!("{}:{}", self.name, path.display()),
            None => self.name.clone(),
        }
    }
}

/// Where the runtime in the preferences came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeSource {
    Configured,
    Detected,
    None,
}

impl std::fmt::Display for RuntimeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeSource::Configured => write!(f, "configured"),
            RuntimeSource::Detected => write!(f, "detected"),
            RuntimeSource::None => write!(f, "none"),
        }
    }
}

/// Probe the known runtimes and return the first one present.
pub fn detect(probe: &dyn RuntimeProbe) -> Option<JsRuntime> {
    KNOWN_RUNTIMES.iter().find_map(|name| {
        probe.locate(name).map(|path| JsRuntime {
            name: (*name).to_string(),
            path: Some(path),
        })
    })
}

/// Build a runtime from a configured name (or executable path) and optional path.
///
/// Returns `None` when the name is blank.
pub fn from_config(
    name: &str,
    explicit_path: Option<PathBuf>,
    probe: &dyn RuntimeProbe,
) -> Option<JsRuntime> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let as_path = Path::new(name);
    if as_path.is_absolute() || name.contains(std::path::MAIN_SEPARATOR) {
        let stem = as_path.file_stem()?.to_string_lossy().to_lowercase();
        return Some(JsRuntime {
            name: stem,
            path: Some(explicit_path.unwrap_or_else(|| as_path.to_path_buf())),
        });
    }

    let name = name.to_lowercase();
    let path = explicit_path.or_else(|| probe.locate(&name));
    Some(JsRuntime { name, path })
}

/// Runtime settings injected into every extraction and retrieval call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeHints {
    pub js_runtime: Option<JsRuntime>,
    pub remote_components: Vec<String>,
}

impl RuntimeHints {
    /// Command-line arguments understood by yt-dlp.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(runtime) = &self.js_runtime {
            args.push("--js-runtimes".to_string());
            args.push(runtime.to_arg());
        }
        for component in &self.remote_components {
            args.push("--remote-components".to_string());
            args.push(component.clone());
        }
        args
    }
}
