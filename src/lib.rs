//! Harvester - genre-aware media search and retrieval
//!
//! A CLI and interactive session for finding tracks by genre, artist and
//! keywords, then either saving them locally or resolving playable stream
//! links. Extraction and transcoding are delegated to yt-dlp and ffmpeg.
//!
//! # Architecture
//!
//! - `config` - Layered preference resolution and script-runtime detection
//! - `quality` - Named quality profiles and format selectors
//! - `request` - Search criteria validation into query descriptors
//! - `extractor` - Provider abstraction, normalization and filtering
//! - `retrieval` - Retrieval modes, outcomes, format selection and file naming
//! - `orchestrator` - Per-track persist/preview with isolated failures
//! - `harvester` - Shared entry point used by every front end
//! - `voice` - Speech capture and phrase parsing
//! - `worker` - Background job dispatch with completion delivery
//! - `session` - Interactive session state machine
//!
//! # Example
//!
//! ```rust,no_run
//! use harvester::config::Preferences;
//! use harvester::harvester::Harvester;
//! use harvester::request::SearchCriteria;
//! use harvester::retrieval::RetrievalMode;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let harvester = Harvester::new(Preferences::resolve());
//!
//!     let criteria = SearchCriteria::for_term("deep house");
//!     let (_, outcome) = harvester.fetch(&criteria, RetrievalMode::Preview).await?;
//!     println!("{} links resolved", outcome.success_count());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod harvester;
pub mod orchestrator;
pub mod quality;
pub mod request;
pub mod retrieval;
pub mod session;
pub mod voice;
pub mod worker;

pub use error::{HarvestError, Result};
