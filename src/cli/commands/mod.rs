//! CLI command implementations.

mod config;
mod doctor;
mod fetch;
mod search;
mod session;
mod voice;

pub use config::run_config;
pub use doctor::run_doctor;
pub use fetch::run_fetch;
pub use search::run_search;
pub use session::run_session;
pub use voice::run_voice;
