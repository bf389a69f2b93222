use regex::Regex;
use std::sync::OnceLock;

fn disallowed() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9 _\-.]").expect("Invalid regex"))
}

/// Keep only filesystem-safe characters; falls back to `track`.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = disallowed().replace_all(name, "");
    let trimmed = cleaned.trim_matches(|c| matches!(c, ' ' | '.' | '-' | '_'));
    if trimmed.is_empty() {
        "track".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<sanitized title>_<id>`, unique per track within a directory.
pub fn build_file_stem(title: &str, id: &str) -> String {
    format!("{}_{}", sanitize_filename(title), sanitize_filename(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("AC/DC: Back in Black!"), "ACDC Back in Black");
        assert_eq!(sanitize_filename("  ..--Über__ "), "ber");
        assert_eq!(sanitize_filename("日本語"), "track");
    }

    #[test]
    fn test_build_file_stem() {
        assert_eq!(build_file_stem("Night Drive (Live)", "abc-123"), "Night Drive Live_abc-123");
    }
}
