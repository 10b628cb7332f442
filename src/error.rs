//! Error taxonomy for the client.
//!
//! - validation errors are raised before any network call
//! - transport/protocol errors leave session state untouched so the user can retry
//! - nothing here is fatal; callers log and return to the input-awaiting state

use thiserror::Error;

/// Failures talking to the scoring / leaderboard backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
  #[error(transparent)]
  Http(#[from] reqwest::Error),
  #[error("backend returned HTTP {status}: {message}")]
  Status { status: reqwest::StatusCode, message: String },
  #[error("backend reported an error: {0}")]
  Backend(String),
  #[error("could not decode backend response: {0}")]
  Decode(String),
}

/// Errors emitted by the turn session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
  #[error("{0}")]
  Validation(String),
  #[error("a submission is already in flight for this session")]
  Busy,
  #[error("session is showing final results; wait for it to reset")]
  Finalized,
  #[error(transparent)]
  Transport(#[from] ApiError),
  #[error("unexpected response from scoring backend: {0}")]
  Protocol(String),
  #[error("session was reset while the request was in flight")]
  Superseded,
}

impl SessionError {
  /// Validation failures are shown as blocking notices; everything else as an error banner.
  pub fn is_validation(&self) -> bool {
    matches!(self, SessionError::Validation(_))
  }
}

/// Errors emitted by the leaderboard component.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LeaderboardError {
  #[error("unknown leaderboard category: {0}")]
  UnknownCategory(String),
  #[error(transparent)]
  Transport(#[from] ApiError),
}

/// Errors raised while loading `ClientConfig` from an explicit path.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: toml::de::Error,
  },
}
