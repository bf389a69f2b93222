//! yt-dlp integration.
//!
//! `YtDlp` is both the extraction provider (search and per-track format
//! lookup via `--dump-json`) and the transcoder for persisted downloads, where
//! yt-dlp drives ffmpeg for audio extraction and merging. Runtime hints are
//! appended to every invocation through [`RuntimeHints::to_args`].

use super::{MediaKind, MediaProvider};
use crate::config::RuntimeHints;
use crate::error::{HarvestError, ProviderFailure, Result};
use crate::retrieval::{PersistJob, Transcoder};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Handle to the yt-dlp executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlp {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<Output> {
        debug!("Running {} {}", self.program.display(), args.join(" "));
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    HarvestError::ToolNotFound("yt-dlp".into())
                } else {
                    HarvestError::ToolFailed(format!("yt-dlp execution failed: {e}"))
                }
            })
    }
}

/// Classify a yt-dlp error message.
pub fn classify_failure(stderr: &str) -> ProviderFailure {
    let lower = stderr.to_lowercase();
    const BLOCKED: [&str; 6] = [
        "http error 403",
        "http error 429",
        "sign in to confirm",
        "not a bot",
        "too many requests",
        "blocked",
    ];
    const NETWORK: [&str; 8] = [
        "unable to download webpage",
        "failed to resolve",
        "name or service not known",
        "temporary failure in name resolution",
        "getaddrinfo",
        "timed out",
        "connection refused",
        "network is unreachable",
    ];

    if BLOCKED.iter().any(|p| lower.contains(p)) {
        ProviderFailure::Blocked
    } else if NETWORK.iter().any(|p| lower.contains(p)) {
        ProviderFailure::Network
    } else {
        ProviderFailure::Failed
    }
}

/// Last `ERROR:` line of yt-dlp's stderr, or the whole text.
fn error_summary(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .unwrap_or(stderr.trim())
        .to_string()
}

/// Parse `--dump-json` output: one JSON object per line, bad lines skipped.
pub fn parse_json_lines(stdout: &str) -> Vec<Value> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping unparseable yt-dlp record: {}", e);
                None
            }
        })
        .collect()
}

fn provider_args(hints: &RuntimeHints, extra: &[&str], target: &str) -> Vec<String> {
    let mut args: Vec<String> = ["--skip-download", "--no-playlist", "--no-warnings"]
        .iter()
        .chain(extra)
        .map(|s| s.to_string())
        .collect();
    args.extend(hints.to_args());
    args.push("--".to_string());
    args.push(target.to_string());
    args
}

#[async_trait]
impl MediaProvider for YtDlp {
    #[instrument(skip(self, hints))]
    async fn search(&self, query: &str, hints: &RuntimeHints) -> Result<Vec<Value>> {
        let output = self
            .run(&provider_args(hints, &["--dump-json"], query))
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let entries = parse_json_lines(&stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if entries.is_empty() {
                return Err(HarvestError::provider(
                    classify_failure(&stderr),
                    error_summary(&stderr),
                ));
            }
            warn!(
                "yt-dlp reported errors but returned {} records: {}",
                entries.len(),
                error_summary(&stderr)
            );
        }

        Ok(entries)
    }

    #[instrument(skip(self, hints))]
    async fn describe(&self, url: &str, hints: &RuntimeHints) -> Result<Value> {
        let output = self
            .run(&provider_args(hints, &["--dump-single-json"], url))
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HarvestError::provider(
                classify_failure(&stderr),
                error_summary(&stderr),
            ));
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

/// Arguments for one persisted download.
pub fn persist_args(job: &PersistJob<'_>) -> Vec<String> {
    let template = job.output_dir.join(format!("{}.%(ext)s", job.file_stem));
    let mut args = vec!["--format".to_string(), job.selector.clone()];

    match job.kind {
        MediaKind::Audio => {
            args.extend(
                [
                    "--extract-audio",
                    "--audio-format",
                    job.container,
                    "--audio-quality",
                ]
                .map(String::from),
            );
            args.push(format!("{}K", job.audio_kbps));
        }
        MediaKind::Video => {
            args.push("--merge-output-format".to_string());
            args.push(job.container.to_string());
        }
    }

    args.extend(
        [
            "--embed-metadata",
            "--no-playlist",
            "--no-warnings",
            "--no-simulate",
            "--print",
            "after_move:filepath",
            "--output",
        ]
        .map(String::from),
    );
    args.push(template.to_string_lossy().into_owned());
    args.extend(job.hints.to_args());
    args.push("--".to_string());
    args.push(job.url.to_string());
    args
}

/// Locates a downloaded file by stem when yt-dlp did not print its path.
fn find_downloaded(dir: &Path, stem: &str, container: &str) -> Result<PathBuf> {
    let expected = dir.join(format!("{}.{}", stem, container));
    if expected.exists() {
        return Ok(expected);
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| HarvestError::ToolFailed(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(extension) = name.strip_prefix(stem) else {
            continue;
        };
        // The stem must end right before the extension: "Song_a" is not "Song_a_live".
        if extension.starts_with('.') && !name.ends_with(".part") && !name.ends_with(".ytdl") {
            return Ok(entry.path());
        }
    }

    Err(HarvestError::ToolFailed(
        "Downloaded file not found after transcoding".into(),
    ))
}

#[async_trait]
impl Transcoder for YtDlp {
    #[instrument(skip(self, job), fields(url = %job.url, kind = %job.kind))]
    async fn persist(&self, job: &PersistJob<'_>) -> Result<PathBuf> {
        tokio::fs::create_dir_all(job.output_dir).await?;
        info!("Downloading {} to {}", job.url, job.output_dir.display());

        let output = self.run(&persist_args(job)).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HarvestError::ToolFailed(format!(
                "yt-dlp failed: {}",
                error_summary(&stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().map(str::trim).rfind(|l| !l.is_empty()) {
            Some(printed) if Path::new(printed).exists() => Ok(PathBuf::from(printed)),
            _ => find_downloaded(job.output_dir, &job.file_stem, job.container),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JsRuntime;

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure("ERROR: [youtube] x: Sign in to confirm you're not a bot"),
            ProviderFailure::Blocked
        );
        assert_eq!(
            classify_failure("ERROR: Unable to download webpage: <urlopen error [Errno -2] Name or service not known>"),
            ProviderFailure::Network
        );
        assert_eq!(
            classify_failure("ERROR: Video unavailable"),
            ProviderFailure::Failed
        );
    }

    #[test]
    fn test_parse_json_lines_skips_garbage() {
        let stdout = "{\"id\": \"a\"}\n\nnot json\n{\"id\": \"b\"}\n";
        let values = parse_json_lines(stdout);
        assert_eq!(values.len(), 2);
        assert_eq!(values[1]["id"], "b");
    }

    #[test]
    fn test_error_summary_prefers_error_line() {
        let stderr = "WARNING: something\nERROR: the real problem\n";
        assert_eq!(error_summary(stderr), "ERROR: the real problem");
        assert_eq!(error_summary("  plain  "), "plain");
    }

    #[test]
    fn test_persist_args_carry_hints_and_selector() {
        let hints = RuntimeHints {
            js_runtime: Some(JsRuntime {
                name: "deno".into(),
                path: None,
            }),
            remote_components: vec!["ejs:github".into()],
        };
        let dir = PathBuf::from("/music");
        let job = PersistJob {
            url: "https://www.youtube.com/watch?v=abc",
            kind: MediaKind::Audio,
            selector: "bestaudio/best".into(),
            container: "mp3",
            audio_kbps: 320,
            output_dir: &dir,
            file_stem: "Song_abc".into(),
            hints: &hints,
        };
        let args = persist_args(&job);

        assert_eq!(&args[..2], &["--format", "bestaudio/best"]);
        assert!(args.windows(2).any(|w| w == ["--audio-quality", "320K"]));
        assert!(args.windows(2).any(|w| w == ["--js-runtimes", "deno"]));
        assert!(args.windows(2).any(|w| w == ["--remote-components", "ejs:github"]));
        assert!(args
            .windows(2)
            .any(|w| w[0] == "--output" && w[1].ends_with("Song_abc.%(ext)s")));
        assert_eq!(args.last().map(String::as_str), Some(job.url));
    }

    #[test]
    fn test_find_downloaded_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Song_abc.m4a.part"), b"").unwrap();
        std::fs::write(dir.path().join("Song_abc.m4a"), b"").unwrap();
        let found = find_downloaded(dir.path(), "Song_abc", "mp3").unwrap();
        assert_eq!(found, dir.path().join("Song_abc.m4a"));
        assert!(find_downloaded(dir.path(), "missing", "mp3").is_err());
    }

    #[test]
    fn test_find_downloaded_ignores_longer_stems() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Song_a_live.m4a"), b"").unwrap();
        assert!(find_downloaded(dir.path(), "Song_a", "mp3").is_err());

        std::fs::write(dir.path().join("Song_a.opus"), b"").unwrap();
        let found = find_downloaded(dir.path(), "Song_a", "mp3").unwrap();
        assert_eq!(found, dir.path().join("Song_a.opus"));
    }

    #[tokio::test]
    async fn test_persist_creates_output_dir_before_running() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("downloads").join("trance");
        let hints = RuntimeHints::default();
        let job = PersistJob {
            url: "https://www.youtube.com/watch?v=abc",
            kind: MediaKind::Audio,
            selector: "bestaudio/best".into(),
            container: "mp3",
            audio_kbps: 320,
            output_dir: &dir,
            file_stem: "Song_abc".into(),
            hints: &hints,
        };

        let missing = YtDlp::with_program(root.path().join("no-such-yt-dlp"));
        match missing.persist(&job).await {
            Err(HarvestError::ToolNotFound(tool)) => assert_eq!(tool, "yt-dlp"),
            other => panic!("expected a missing tool, got {:?}", other),
        }
        assert!(dir.is_dir());
    }
}
