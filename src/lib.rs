//! promptlab · prompt-engineering practice client
//!
//! - Turn-based practice/test sessions scored by a remote backend
//! - Sortable leaderboards per task category
//! - Plain-text view-models for a terminal front end

pub mod telemetry;
pub mod util;
pub mod domain;
pub mod config;
pub mod error;
pub mod protocol;
pub mod api;
pub mod session;
pub mod controller;
pub mod metrics;
pub mod leaderboard;
pub mod workbench;
pub mod render;
pub mod console;

pub use api::{DatasetCatalogApi, HttpBackend, LeaderboardApi, ScoringApi};
pub use config::ClientConfig;
pub use controller::{FinalReport, SessionView, TurnOutcome, TurnSessionController};
pub use domain::{DatasetKind, Mode};
pub use error::{ApiError, ConfigError, LeaderboardError, SessionError};
pub use leaderboard::Leaderboard;
pub use workbench::Workbench;
