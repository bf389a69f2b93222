//! Interactive session state.
//!
//! Typed lines and voice captures both become [`SessionCommand`]s and go
//! through [`Session::apply`]. The session decides which worker to start
//! (returned as an [`Effect`]) and folds worker completions back into its
//! state. It performs no I/O itself.

use crate::extractor::{MediaKind, TrackRecord};
use crate::harvester::SearchResults;
use crate::quality::{self, QualityProfile};
use crate::request::SearchCriteria;
use crate::retrieval::{
    Artifact, PreviewLink, RetrievalMode, RetrievalOutcome, RetrievalRequest,
};
use crate::voice::{Heard, ParseFailure, TransportAction, VoiceCommand, VoiceParser};
use crate::worker::{Completion, JobId, WorkerKind};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

pub const HELP: &str = "\
Commands:
  search <terms>        search for tracks (also: find, look up, play some)
  list                  show the current results
  play <n> | play <title> | play all
  pause | resume | stop | next | previous
  download [n]          save all results, or track n
  listen                capture one voice command
  help | quit";

/// One user intent, independent of how it was entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Voice(VoiceCommand),
    Download(Option<usize>),
    Listen,
    List,
    Help,
    Quit,
}

impl From<VoiceCommand> for SessionCommand {
    fn from(command: VoiceCommand) -> Self {
        SessionCommand::Voice(command)
    }
}

impl SessionCommand {
    /// Session keywords first, then the same phrase table voice input uses.
    pub fn parse_typed(line: &str, parser: &VoiceParser) -> Result<Self, ParseFailure> {
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();
        let mut words = lower.split_whitespace();

        match (words.next(), words.next(), words.next()) {
            (Some("quit" | "exit"), None, _) => return Ok(SessionCommand::Quit),
            (Some("help" | "?"), None, _) => return Ok(SessionCommand::Help),
            (Some("list" | "ls"), None, _) => return Ok(SessionCommand::List),
            (Some("listen"), None, _) => return Ok(SessionCommand::Listen),
            (Some("download" | "save"), None, _) => return Ok(SessionCommand::Download(None)),
            (Some("download" | "save"), Some(n), None) => {
                return match n.parse::<usize>() {
                    Ok(n) if n > 0 => Ok(SessionCommand::Download(Some(n - 1))),
                    _ => Err(ParseFailure {
                        phrase: trimmed.to_string(),
                        reason: "expected a track number".to_string(),
                    }),
                };
            }
            _ => {}
        }

        parser.parse(trimmed).map(SessionCommand::Voice)
    }
}

/// Simulated player state; the link is handed to whatever plays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Loading,
    Playing,
    Paused,
    Stopped,
}

/// Work the front end should start on a worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Search(SearchCriteria),
    Retrieve {
        tracks: Vec<TrackRecord>,
        request: RetrievalRequest,
    },
    Listen,
    Quit,
}

impl Effect {
    pub fn worker_kind(&self) -> Option<WorkerKind> {
        match self {
            Effect::Search(_) => Some(WorkerKind::Search),
            Effect::Retrieve { .. } => Some(WorkerKind::Retrieval),
            Effect::Listen => Some(WorkerKind::VoiceListen),
            Effect::Quit => None,
        }
    }
}

/// Worker results the session understands.
#[derive(Debug)]
pub enum SessionEvent {
    Searched(SearchResults),
    Retrieved(RetrievalOutcome),
    Heard(Heard),
}

/// Something to show the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Warning(String),
    Error(String),
    Tracks(Vec<TrackRecord>),
    NowPlaying { position: usize, link: PreviewLink },
    Saved(RetrievalOutcome),
}

pub struct Session {
    tracks: Vec<TrackRecord>,
    kind: Option<MediaKind>,
    profile: &'static QualityProfile,
    position: Option<usize>,
    player: PlayerState,
    now_playing: Option<PreviewLink>,
    /// Resolved links waiting behind the current one, with their positions.
    queue: VecDeque<(usize, PreviewLink)>,
    voice: bool,
    in_flight: HashMap<WorkerKind, JobId>,
    notices: Vec<Notice>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(quality::default_profile())
    }
}

impl Session {
    pub fn new(profile: &'static QualityProfile) -> Self {
        Self {
            tracks: Vec::new(),
            kind: None,
            profile,
            position: None,
            player: PlayerState::Idle,
            now_playing: None,
            queue: VecDeque::new(),
            voice: false,
            in_flight: HashMap::new(),
            notices: Vec::new(),
        }
    }

    /// Whether a speech engine is available for `listen`.
    pub fn with_voice(mut self, available: bool) -> Self {
        self.voice = available;
        self
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn player(&self) -> PlayerState {
        self.player
    }

    pub fn now_playing(&self) -> Option<&PreviewLink> {
        self.now_playing.as_ref()
    }

    /// Positions of the tracks queued behind the current one.
    pub fn queued(&self) -> Vec<usize> {
        self.queue.iter().map(|(position, _)| *position).collect()
    }

    pub fn is_busy(&self, kind: WorkerKind) -> bool {
        self.in_flight.contains_key(&kind)
    }

    /// Notices accumulated since the last call.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Record that a worker was started for an effect.
    pub fn started(&mut self, kind: WorkerKind, id: JobId) {
        if let Some(previous) = self.in_flight.insert(kind, id) {
            debug!("{} job {} superseded by {}", kind, previous, id);
        }
    }

    fn info(&mut self, message: impl Into<String>) {
        self.notices.push(Notice::Info(message.into()));
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.notices.push(Notice::Warning(message.into()));
    }

    /// Handle one command; returns the work to start, if any.
    pub fn apply(&mut self, command: SessionCommand) -> Option<Effect> {
        match command {
            SessionCommand::Quit => Some(Effect::Quit),
            SessionCommand::Help => {
                self.info(HELP);
                None
            }
            SessionCommand::List => {
                if self.tracks.is_empty() {
                    self.warn("No results yet. Try: search <terms>");
                } else {
                    self.notices.push(Notice::Tracks(self.tracks.clone()));
                }
                None
            }
            SessionCommand::Listen => {
                if !self.voice {
                    self.warn(
                        "Voice control is disabled. Set HARVESTER_VOICE_ENABLED=true and install a Vosk model.",
                    );
                    return None;
                }
                if self.is_busy(WorkerKind::VoiceListen) {
                    self.warn("Already listening");
                    return None;
                }
                self.info("Listening...");
                Some(Effect::Listen)
            }
            SessionCommand::Download(index) => self.download(index),
            SessionCommand::Voice(command) => self.voice(command),
        }
    }

    fn voice(&mut self, command: VoiceCommand) -> Option<Effect> {
        match command {
            VoiceCommand::Search { query } => {
                // A newer search supersedes the running one; its result is dropped.
                self.info(format!("Searching for \"{}\"...", query));
                Some(Effect::Search(SearchCriteria::for_term(query)))
            }
            VoiceCommand::PlayAll => self.play_all(),
            VoiceCommand::PlayByIndex { index } => self.play_at(index),
            VoiceCommand::PlaySpecific { title } => {
                let wanted = title.to_lowercase();
                match self
                    .tracks
                    .iter()
                    .position(|t| t.title.to_lowercase().contains(&wanted))
                {
                    Some(index) => self.play_at(index),
                    None => {
                        self.warn(format!("No track matching \"{}\"", title));
                        None
                    }
                }
            }
            VoiceCommand::Transport { action } => self.transport(action),
        }
    }

    fn transport(&mut self, action: TransportAction) -> Option<Effect> {
        match action {
            TransportAction::Pause => {
                if self.player == PlayerState::Playing {
                    self.player = PlayerState::Paused;
                    self.info("Paused");
                } else {
                    self.warn("Nothing is playing");
                }
                None
            }
            TransportAction::Play => match (self.player, self.position) {
                (PlayerState::Paused, _) => {
                    self.player = PlayerState::Playing;
                    self.info("Resumed");
                    None
                }
                (PlayerState::Playing | PlayerState::Loading, _) => None,
                (_, Some(position)) => self.play_at(position),
                (_, None) => self.play_at(0),
            },
            TransportAction::Stop => {
                self.player = PlayerState::Stopped;
                self.now_playing = None;
                self.queue.clear();
                self.info("Stopped");
                None
            }
            TransportAction::Next => {
                if let Some((position, link)) = self.queue.pop_front() {
                    self.start_playing(position, link);
                    return None;
                }
                self.step_forward()
            }
            TransportAction::Previous => match self.position {
                Some(p) if p > 0 => self.play_at(p - 1),
                _ => {
                    self.warn("Already at the first track");
                    None
                }
            },
        }
    }

    fn step_forward(&mut self) -> Option<Effect> {
        match self.position {
            Some(p) if p + 1 < self.tracks.len() => self.play_at(p + 1),
            _ => {
                self.warn("Already at the last track");
                None
            }
        }
    }

    fn request(&self, mode: RetrievalMode) -> RetrievalRequest {
        RetrievalRequest {
            mode,
            kind: self.kind,
            profile: self.profile,
        }
    }

    fn play_at(&mut self, index: usize) -> Option<Effect> {
        if self.tracks.is_empty() {
            self.warn("No results yet. Try: search <terms>");
            return None;
        }
        let Some(track) = self.tracks.get(index).cloned() else {
            self.warn(format!(
                "There is no track {} (results: {})",
                index + 1,
                self.tracks.len()
            ));
            return None;
        };
        if self.is_busy(WorkerKind::Retrieval) {
            self.warn("A retrieval is already running");
            return None;
        }
        self.position = Some(index);
        self.player = PlayerState::Loading;
        self.queue.clear();
        self.info(format!("Loading \"{}\"...", track.display_title()));
        Some(Effect::Retrieve {
            tracks: vec![track],
            request: self.request(RetrievalMode::Preview),
        })
    }

    /// Resolve links for every result at once; `next` then walks the queue.
    fn play_all(&mut self) -> Option<Effect> {
        if self.tracks.is_empty() {
            self.warn("No results yet. Try: search <terms>");
            return None;
        }
        if self.is_busy(WorkerKind::Retrieval) {
            self.warn("A retrieval is already running");
            return None;
        }
        self.position = Some(0);
        self.player = PlayerState::Loading;
        self.queue.clear();
        self.info(format!("Loading {} track(s)...", self.tracks.len()));
        Some(Effect::Retrieve {
            tracks: self.tracks.clone(),
            request: self.request(RetrievalMode::Preview),
        })
    }

    fn download(&mut self, index: Option<usize>) -> Option<Effect> {
        if self.is_busy(WorkerKind::Retrieval) {
            self.warn("A retrieval is already running");
            return None;
        }
        let tracks = match index {
            None => self.tracks.clone(),
            Some(i) => self.tracks.get(i).cloned().into_iter().collect(),
        };
        if tracks.is_empty() {
            self.warn("Nothing to download");
            return None;
        }
        self.info(format!("Downloading {} track(s)...", tracks.len()));
        Some(Effect::Retrieve {
            tracks,
            request: self.request(RetrievalMode::Persist),
        })
    }

    /// Fold a worker completion into the state. Completions for superseded
    /// job ids are ignored.
    pub fn complete(&mut self, completion: Completion<SessionEvent>) -> Option<Effect> {
        if self.in_flight.get(&completion.kind) != Some(&completion.id) {
            debug!(
                "Ignoring stale {} completion {}",
                completion.kind, completion.id
            );
            return None;
        }
        self.in_flight.remove(&completion.kind);

        let event = match completion.result {
            Ok(event) => event,
            Err(e) => {
                if completion.kind == WorkerKind::Retrieval && self.player == PlayerState::Loading {
                    self.player = PlayerState::Idle;
                }
                self.notices.push(Notice::Error(e.to_string()));
                return None;
            }
        };

        match event {
            SessionEvent::Searched(results) => {
                self.kind = results.descriptor.kind;
                self.profile = results.descriptor.profile;
                self.tracks = results.tracks;
                self.position = None;
                if self.tracks.is_empty() {
                    self.warn("No tracks found");
                } else {
                    self.notices.push(Notice::Tracks(self.tracks.clone()));
                }
                None
            }
            SessionEvent::Retrieved(outcome) => {
                match outcome.mode {
                    RetrievalMode::Preview => self.previewed(outcome),
                    RetrievalMode::Persist => self.notices.push(Notice::Saved(outcome)),
                }
                None
            }
            SessionEvent::Heard((parsed, phrase)) => match parsed {
                Ok(command) => {
                    self.info(format!("Heard \"{}\": {}", phrase, command));
                    self.apply(command.into())
                }
                Err(failure) => {
                    self.warn(failure.to_string());
                    None
                }
            },
        }
    }

    fn previewed(&mut self, outcome: RetrievalOutcome) {
        let mut links = VecDeque::new();
        for entry in outcome.entries {
            match entry.result {
                Ok(Artifact::Link(link)) => {
                    let position = self
                        .tracks
                        .iter()
                        .position(|t| t.id == entry.track.id)
                        .or(self.position)
                        .unwrap_or_default();
                    links.push_back((position, link));
                }
                Ok(Artifact::File(path)) => self.info(format!("Saved {}", path.display())),
                Err(failure) => self.notices.push(Notice::Error(format!(
                    "{}: {}",
                    entry.track.display_title(),
                    failure
                ))),
            }
        }

        match links.pop_front() {
            Some((position, link)) => {
                self.queue = links;
                self.start_playing(position, link);
            }
            None => self.player = PlayerState::Idle,
        }
    }

    fn start_playing(&mut self, position: usize, link: PreviewLink) {
        self.position = Some(position);
        self.player = PlayerState::Playing;
        self.now_playing = Some(link.clone());
        self.notices.push(Notice::NowPlaying { position, link });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::track_tests::track;
    use crate::harvester::tests::harvester;
    use crate::retrieval::{RetrievalFailure, TrackOutcome};
    use crate::worker::WorkerError;

    fn typed(line: &str) -> SessionCommand {
        SessionCommand::parse_typed(line, &VoiceParser::new()).unwrap()
    }

    fn completion(id: JobId, kind: WorkerKind, event: SessionEvent) -> Completion<SessionEvent> {
        Completion {
            id,
            kind,
            result: Ok(event),
        }
    }

    fn loaded_session() -> Session {
        let mut session = Session::default();
        session.tracks = vec![track("a", "Alpha"), track("b", "Beta"), track("c", "Gamma")];
        session
    }

    fn link(id: &str) -> PreviewLink {
        PreviewLink {
            url: format!("https://cdn.example.com/{id}"),
            format_id: "22".into(),
            label: "720p mp4".into(),
            kind: MediaKind::Video,
            expires_at: None,
        }
    }

    #[test]
    fn test_typed_and_voice_input_share_commands() {
        let parser = VoiceParser::new();
        let spoken = parser.parse("play track number two").unwrap();
        assert_eq!(typed("play 2"), SessionCommand::from(spoken));
        assert_eq!(typed("download 3"), SessionCommand::Download(Some(2)));
        assert_eq!(typed("QUIT"), SessionCommand::Quit);
        assert!(SessionCommand::parse_typed("download zero", &parser).is_err());
        assert!(SessionCommand::parse_typed("asdf gibberish", &parser).is_err());
    }

    #[test]
    fn test_play_requests_single_preview() {
        let mut session = loaded_session();
        match session.apply(typed("play the second song")) {
            Some(Effect::Retrieve { tracks, request }) => {
                assert_eq!(tracks.len(), 1);
                assert_eq!(tracks[0].id, "b");
                assert_eq!(request.mode, RetrievalMode::Preview);
            }
            other => panic!("expected a preview, got {:?}", other),
        }
        assert_eq!(session.player(), PlayerState::Loading);
        assert_eq!(session.position(), Some(1));

        assert!(session.apply(typed("play 9")).is_none());
        assert!(matches!(
            session.drain_notices().last(),
            Some(Notice::Warning(_))
        ));
    }

    #[test]
    fn test_busy_retrieval_rejects_second_request() {
        let mut session = loaded_session();
        session.apply(typed("play 1")).unwrap();
        session.started(WorkerKind::Retrieval, JobId::for_tests(1));

        assert!(session.is_busy(WorkerKind::Retrieval));
        assert!(session.apply(typed("download")).is_none());
        assert!(session.apply(typed("next")).is_none());
    }

    #[tokio::test]
    async fn test_stale_search_results_are_ignored() {
        let mut session = Session::default();
        let harvester = harvester();

        let (old, new) = (JobId::for_tests(1), JobId::for_tests(2));
        session.started(WorkerKind::Search, old);
        session.started(WorkerKind::Search, new);

        let stale = harvester.search(&SearchCriteria::for_term("old")).await.unwrap();
        let fresh = harvester.search(&SearchCriteria::for_term("new")).await.unwrap();

        assert!(session
            .complete(completion(old, WorkerKind::Search, SessionEvent::Searched(stale)))
            .is_none());
        assert!(session.tracks().is_empty());

        session.complete(completion(new, WorkerKind::Search, SessionEvent::Searched(fresh)));
        assert_eq!(session.tracks().len(), 3);
        assert!(session.tracks()[0].title.starts_with("new"));
        assert!(!session.is_busy(WorkerKind::Search));
    }

    #[test]
    fn test_preview_completion_and_transport() {
        let mut session = loaded_session();
        session.apply(typed("play all")).unwrap();
        let id = JobId::for_tests(1);
        session.started(WorkerKind::Retrieval, id);

        let outcome = RetrievalOutcome {
            mode: RetrievalMode::Preview,
            entries: vec![TrackOutcome {
                track: track("a", "Alpha"),
                result: Ok(Artifact::Link(link("a"))),
            }],
        };
        session.complete(completion(id, WorkerKind::Retrieval, SessionEvent::Retrieved(outcome)));
        assert_eq!(session.player(), PlayerState::Playing);
        assert_eq!(session.now_playing().map(|l| l.url.as_str()), Some("https://cdn.example.com/a"));

        assert!(session.apply(typed("pause")).is_none());
        assert_eq!(session.player(), PlayerState::Paused);
        assert!(session.apply(typed("resume")).is_none());
        assert_eq!(session.player(), PlayerState::Playing);

        match session.apply(typed("next")) {
            Some(Effect::Retrieve { tracks, .. }) => assert_eq!(tracks[0].id, "b"),
            other => panic!("expected next track, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_preview_and_heard_commands() {
        let mut session = loaded_session();
        session.apply(typed("play gamma")).unwrap();
        let id = JobId::for_tests(1);
        session.started(WorkerKind::Retrieval, id);

        let outcome = RetrievalOutcome {
            mode: RetrievalMode::Preview,
            entries: vec![TrackOutcome {
                track: track("c", "Gamma"),
                result: Err(RetrievalFailure::NoMatchingFormat(MediaKind::Video)),
            }],
        };
        session.complete(completion(id, WorkerKind::Retrieval, SessionEvent::Retrieved(outcome)));
        assert_eq!(session.player(), PlayerState::Idle);
        assert!(session
            .drain_notices()
            .iter()
            .any(|n| matches!(n, Notice::Error(m) if m.contains("Gamma"))));

        let listen = JobId::for_tests(2);
        session.started(WorkerKind::VoiceListen, listen);
        let heard = (
            Ok(VoiceCommand::Search {
                query: "trance".into(),
            }),
            "search for trance".to_string(),
        );
        assert_eq!(
            session.complete(completion(listen, WorkerKind::VoiceListen, SessionEvent::Heard(heard))),
            Some(Effect::Search(SearchCriteria::for_term("trance")))
        );
    }

    #[test]
    fn test_worker_error_is_reported() {
        let mut session = loaded_session();
        session.apply(typed("play 1"));
        let id = JobId::for_tests(7);
        session.started(WorkerKind::Retrieval, id);
        session.complete(Completion {
            id,
            kind: WorkerKind::Retrieval,
            result: Err(WorkerError {
                context: WorkerKind::Retrieval,
                message: "worker panicked".into(),
            }),
        });
        assert_eq!(session.player(), PlayerState::Idle);
        assert!(!session.is_busy(WorkerKind::Retrieval));
    }

    #[test]
    fn test_play_all_queues_every_resolved_track() {
        let mut session = loaded_session();
        match session.apply(typed("play all")) {
            Some(Effect::Retrieve { tracks, request }) => {
                assert_eq!(tracks.len(), 3);
                assert_eq!(request.mode, RetrievalMode::Preview);
            }
            other => panic!("expected a preview of every track, got {:?}", other),
        }
        let id = JobId::for_tests(1);
        session.started(WorkerKind::Retrieval, id);

        let outcome = RetrievalOutcome {
            mode: RetrievalMode::Preview,
            entries: vec![
                TrackOutcome {
                    track: track("a", "Alpha"),
                    result: Ok(Artifact::Link(link("a"))),
                },
                TrackOutcome {
                    track: track("b", "Beta"),
                    result: Err(RetrievalFailure::NoMatchingFormat(MediaKind::Video)),
                },
                TrackOutcome {
                    track: track("c", "Gamma"),
                    result: Ok(Artifact::Link(link("c"))),
                },
            ],
        };
        session.complete(completion(id, WorkerKind::Retrieval, SessionEvent::Retrieved(outcome)));
        assert_eq!(session.position(), Some(0));
        assert_eq!(session.queued(), vec![2]);
        assert!(session
            .drain_notices()
            .iter()
            .any(|n| matches!(n, Notice::Error(m) if m.contains("Beta"))));

        // The queued link plays without another retrieval.
        assert!(session.apply(typed("next")).is_none());
        assert_eq!(session.position(), Some(2));
        assert_eq!(session.player(), PlayerState::Playing);
        assert_eq!(session.now_playing().map(|l| l.url.as_str()), Some("https://cdn.example.com/c"));
        assert!(session.queued().is_empty());

        assert!(session.apply(typed("next")).is_none());
        assert!(matches!(
            session.drain_notices().last(),
            Some(Notice::Warning(m)) if m.contains("last track")
        ));
    }

    #[test]
    fn test_stop_clears_the_queue() {
        let mut session = loaded_session();
        session.apply(typed("play all")).unwrap();
        let id = JobId::for_tests(1);
        session.started(WorkerKind::Retrieval, id);
        let outcome = RetrievalOutcome {
            mode: RetrievalMode::Preview,
            entries: vec![
                TrackOutcome {
                    track: track("a", "Alpha"),
                    result: Ok(Artifact::Link(link("a"))),
                },
                TrackOutcome {
                    track: track("b", "Beta"),
                    result: Ok(Artifact::Link(link("b"))),
                },
            ],
        };
        session.complete(completion(id, WorkerKind::Retrieval, SessionEvent::Retrieved(outcome)));
        assert_eq!(session.queued(), vec![1]);

        session.apply(typed("stop"));
        assert!(session.queued().is_empty());
        assert!(session.now_playing().is_none());
    }

    #[test]
    fn test_listen_requires_a_speech_engine() {
        let mut session = Session::default();
        assert!(session.apply(SessionCommand::Listen).is_none());
        let notices = session.drain_notices();
        assert_eq!(notices.len(), 1);
        assert!(matches!(&notices[0], Notice::Warning(m) if m.contains("disabled")));

        let mut session = Session::default().with_voice(true);
        assert_eq!(session.apply(SessionCommand::Listen), Some(Effect::Listen));
        assert_eq!(session.drain_notices(), vec![Notice::Info("Listening...".into())]);
    }
}
