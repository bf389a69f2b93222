//! Doctor command - verify external tools, runtimes and directories.

use crate::cli::Output;
use crate::config::Preferences;
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn section(title: &str, results: Vec<CheckResult>, all: &mut Vec<CheckResult>) {
    println!("{}", style(title).bold());
    for result in &results {
        result.print();
    }
    println!();
    all.extend(results);
}

/// Run all diagnostic checks.
pub fn run_doctor(preferences: &Preferences, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Harvester Doctor");
    println!();
    println!("Checking external tools and preferences...\n");

    let mut checks = Vec::new();

    section(
        "External Tools",
        vec![
            check_tool("yt-dlp", "--version", install_hint_ytdlp()),
            check_tool("ffmpeg", "-version", install_hint_ffmpeg()),
        ],
        &mut checks,
    );
    section("JavaScript Runtime", vec![check_js_runtime(preferences)], &mut checks);
    section(
        "Directories",
        vec![check_download_dir(&preferences.download_dir)],
        &mut checks,
    );
    section("Configuration", vec![check_config_file(config_path)], &mut checks);
    section("Voice Control", check_voice(preferences), &mut checks);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Harvester.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Harvester is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, version_arg: &str, hint: &str) -> CheckResult {
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            let version_display: String = if version.chars().count() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else {
                version
            };
            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

fn check_js_runtime(preferences: &Preferences) -> CheckResult {
    match &preferences.js_runtime {
        Some(runtime) => {
            let location = runtime
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "on PATH".to_string());
            CheckResult::ok(
                &runtime.name,
                &format!("{} ({})", location, preferences.runtime_source),
            )
        }
        None => CheckResult::warning(
            "js_runtime",
            "none found",
            "Some videos need one. Install node, deno or bun, or set HARVESTER_JS_RUNTIME",
        ),
    }
}

fn check_download_dir(dir: &Path) -> CheckResult {
    if dir.is_dir() {
        CheckResult::ok("Download directory", &format!("{}", dir.display()))
    } else {
        CheckResult::warning(
            "Download directory",
            &format!("{} (will be created)", dir.display()),
            "Directory will be created on first download",
        )
    }
}

fn check_config_file(path: &Path) -> CheckResult {
    if path.exists() {
        CheckResult::ok("Preference file", &format!("{}", path.display()))
    } else {
        CheckResult::warning(
            "Preference file",
            "using defaults",
            "Create with: harvester config init",
        )
    }
}

fn check_voice(preferences: &Preferences) -> Vec<CheckResult> {
    let voice = &preferences.voice;
    if !voice.enabled {
        return vec![CheckResult::ok("Voice", "disabled")];
    }

    let model = if voice.model_path.is_dir() {
        CheckResult::ok("Vosk model", &format!("{}", voice.model_path.display()))
    } else {
        CheckResult::error(
            "Vosk model",
            &format!("{} not found", voice.model_path.display()),
            &format!(
                "Download {} from https://alphacephei.com/vosk/models into {}",
                voice.model_name,
                voice.models_dir.display()
            ),
        )
    };
    vec![
        model,
        check_tool(
            "vosk-transcriber",
            "--help",
            "Install with: pip install vosk",
        ),
    ]
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::runtime::tests::FakeProbe;
    use crate::config::PreferenceSources;
    use std::path::PathBuf;

    fn preferences(runtimes: &[&str]) -> Preferences {
        let sources = PreferenceSources {
            root: PathBuf::from("/srv/harvester"),
            ..PreferenceSources::default()
        };
        Preferences::resolve_from(&sources, &FakeProbe::with(runtimes))
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_missing_runtime_is_a_warning() {
        let result = check_js_runtime(&preferences(&[]));
        assert_eq!(result.status, CheckStatus::Warning);

        let result = check_js_runtime(&preferences(&["deno"]));
        assert_eq!(result.status, CheckStatus::Ok);
        assert_eq!(result.name, "deno");
        assert!(result.message.contains("detected"));
    }

    #[test]
    fn test_disabled_voice_needs_nothing() {
        let checks = check_voice(&preferences(&[]));
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].status, CheckStatus::Ok);
    }
}
