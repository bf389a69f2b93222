//! Phrase → command parsing.

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Playback control words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportAction {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
}

impl std::fmt::Display for TransportAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransportAction::Play => "play",
            TransportAction::Pause => "pause",
            TransportAction::Stop => "stop",
            TransportAction::Next => "next",
            TransportAction::Previous => "previous",
        };
        write!(f, "{}", name)
    }
}

/// A recognized voice command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum VoiceCommand {
    Search { query: String },
    PlayAll,
    PlaySpecific { title: String },
    /// 0-based position in the current result list.
    PlayByIndex { index: usize },
    Transport { action: TransportAction },
}

impl std::fmt::Display for VoiceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoiceCommand::Search { query } => write!(f, "search \"{}\"", query),
            VoiceCommand::PlayAll => write!(f, "play all"),
            VoiceCommand::PlaySpecific { title } => write!(f, "play \"{}\"", title),
            VoiceCommand::PlayByIndex { index } => write!(f, "play track #{}", index + 1),
            VoiceCommand::Transport { action } => write!(f, "{}", action),
        }
    }
}

/// An unrecognized phrase; shown as status, never escalated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not understand \"{phrase}\": {reason}")]
pub struct ParseFailure {
    pub phrase: String,
    pub reason: String,
}

const PLAY_ALL_TRIGGERS: [&str; 4] = [
    "play all",
    "play everything",
    "start playing all",
    "play the whole list",
];

const SEARCH_PREFIXES: [&str; 5] = [
    "search youtube for ",
    "search for ",
    "find ",
    "play some ",
    "look up ",
];

const TITLE_PREFIXES: [&str; 5] = [
    "play the song ",
    "play song ",
    "play the track ",
    "play track ",
    "play ",
];

const TRANSPORT_WORDS: [(&str, TransportAction); 15] = [
    ("pause", TransportAction::Pause),
    ("play", TransportAction::Play),
    ("resume", TransportAction::Play),
    ("continue", TransportAction::Play),
    ("playback", TransportAction::Play),
    ("stop", TransportAction::Stop),
    ("next", TransportAction::Next),
    ("next song", TransportAction::Next),
    ("next track", TransportAction::Next),
    ("skip", TransportAction::Next),
    ("previous", TransportAction::Previous),
    ("previous song", TransportAction::Previous),
    ("previous track", TransportAction::Previous),
    ("back", TransportAction::Previous),
    ("go back", TransportAction::Previous),
];

const NUMBER_WORDS: [(&str, &str); 20] = [
    ("one", "first"),
    ("two", "second"),
    ("three", "third"),
    ("four", "fourth"),
    ("five", "fifth"),
    ("six", "sixth"),
    ("seven", "seventh"),
    ("eight", "eighth"),
    ("nine", "ninth"),
    ("ten", "tenth"),
    ("eleven", "eleventh"),
    ("twelve", "twelfth"),
    ("thirteen", "thirteenth"),
    ("fourteen", "fourteenth"),
    ("fifteen", "fifteenth"),
    ("sixteen", "sixteenth"),
    ("seventeen", "seventeenth"),
    ("eighteen", "eighteenth"),
    ("nineteen", "nineteenth"),
    ("twenty", "twentieth"),
];

/// 1-based position from digits, digit ordinals or number words.
fn track_number(token: &str) -> Option<usize> {
    if let Ok(n) = token.parse::<usize>() {
        return Some(n);
    }
    if let Some(digits) = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| token.strip_suffix(suffix))
    {
        if let Ok(n) = digits.parse::<usize>() {
            return Some(n);
        }
    }
    if token == "zero" {
        return Some(0);
    }
    NUMBER_WORDS
        .iter()
        .position(|(cardinal, ordinal)| token == *cardinal || token == *ordinal)
        .map(|i| i + 1)
}

/// Case-fold, drop punctuation and collapse whitespace.
pub fn normalize_phrase(phrase: &str) -> String {
    let stripped: String = phrase
        .chars()
        .filter(|c| !c.is_ascii_punctuation() || *c == '-')
        .collect();
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered pattern table; the first matching pattern wins.
pub struct VoiceParser {
    numbered: Regex,
}

impl Default for VoiceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceParser {
    pub fn new() -> Self {
        let numbered = Regex::new(
            r"^play(?:\s+the)?\s+(?:track|song)?\s*(?:number\s*)?(\d+|[a-z-]+)",
        )
        .expect("Invalid regex");
        Self { numbered }
    }

    pub fn parse(&self, phrase: &str) -> Result<VoiceCommand, ParseFailure> {
        let fail = |reason: &str| ParseFailure {
            phrase: phrase.to_string(),
            reason: reason.to_string(),
        };

        let normalized = normalize_phrase(phrase);
        if normalized.is_empty() {
            return Err(fail("empty phrase"));
        }

        if PLAY_ALL_TRIGGERS.iter().any(|t| normalized.contains(t)) {
            return Ok(VoiceCommand::PlayAll);
        }

        if let Some(query) = SEARCH_PREFIXES
            .iter()
            .find_map(|prefix| normalized.strip_prefix(prefix))
        {
            let query = query.trim();
            if query.is_empty() {
                return Err(fail("no search query"));
            }
            return Ok(VoiceCommand::Search {
                query: query.to_string(),
            });
        }

        if let Some(number) = self
            .numbered
            .captures(&normalized)
            .and_then(|caps| caps.get(1))
            .and_then(|m| track_number(m.as_str()))
        {
            return match number.checked_sub(1) {
                Some(index) => Ok(VoiceCommand::PlayByIndex { index }),
                None => Err(fail("track numbers start at one")),
            };
        }

        if let Some(title) = TITLE_PREFIXES
            .iter()
            .filter_map(|prefix| normalized.strip_prefix(prefix))
            .map(str::trim)
            .find(|rest| !rest.is_empty())
        {
            return Ok(VoiceCommand::PlaySpecific {
                title: title.to_string(),
            });
        }

        if let Some((_, action)) = TRANSPORT_WORDS.iter().find(|(word, _)| *word == normalized) {
            return Ok(VoiceCommand::Transport { action: *action });
        }

        Err(fail("no matching command"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(phrase: &str) -> Result<VoiceCommand, ParseFailure> {
        VoiceParser::new().parse(phrase)
    }

    #[test]
    fn test_search_phrase() {
        assert_eq!(
            parse("Search for trance"),
            Ok(VoiceCommand::Search {
                query: "trance".into()
            })
        );
        assert_eq!(
            parse("search YouTube for deep house!"),
            Ok(VoiceCommand::Search {
                query: "deep house".into()
            })
        );
        assert!(parse("search for").is_err());
    }

    #[test]
    fn test_numbered_play() {
        assert_eq!(
            parse("Play track number five"),
            Ok(VoiceCommand::PlayByIndex { index: 4 })
        );
        assert_eq!(
            parse("play the third song"),
            Ok(VoiceCommand::PlayByIndex { index: 2 })
        );
        assert_eq!(parse("play 12"), Ok(VoiceCommand::PlayByIndex { index: 11 }));
        assert_eq!(
            parse("play the 3rd track"),
            Ok(VoiceCommand::PlayByIndex { index: 2 })
        );
        assert_eq!(
            parse("play song twentieth"),
            Ok(VoiceCommand::PlayByIndex { index: 19 })
        );
        assert!(parse("play track zero").is_err());
    }

    #[test]
    fn test_title_and_play_all() {
        assert_eq!(
            parse("Play the song Blue Monday."),
            Ok(VoiceCommand::PlaySpecific {
                title: "blue monday".into()
            })
        );
        assert_eq!(parse("please play all of them"), Ok(VoiceCommand::PlayAll));
    }

    #[test]
    fn test_transport_words() {
        assert_eq!(
            parse("Pause"),
            Ok(VoiceCommand::Transport {
                action: TransportAction::Pause
            })
        );
        assert_eq!(
            parse("play"),
            Ok(VoiceCommand::Transport {
                action: TransportAction::Play
            })
        );
        assert_eq!(
            parse("Skip."),
            Ok(VoiceCommand::Transport {
                action: TransportAction::Next
            })
        );
        assert_eq!(
            parse("back"),
            Ok(VoiceCommand::Transport {
                action: TransportAction::Previous
            })
        );
    }

    #[test]
    fn test_gibberish_is_a_parse_failure() {
        let failure = parse("asdf gibberish").unwrap_err();
        assert_eq!(failure.phrase, "asdf gibberish");
        assert!(parse("   ").is_err());
    }
}
