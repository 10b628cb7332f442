//! Loading client configuration (backend location, endpoint paths, session tuning) from TOML.
//!
//! See `ClientConfig` for the expected schema. Every field is optional; an empty
//! file yields the defaults, which point at a backend on the local machine.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::ConfigError;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
  pub base_url: String,
  pub timeout_secs: u64,
  pub endpoints: Endpoints,
  pub session: SessionCfg,
  pub leaderboard: LeaderboardCfg,
}

/// Relative paths of every backend collaborator.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Endpoints {
  pub dataset_config: String,
  pub practice: String,
  pub test: String,
  pub complex_practice: String,
  pub complex_test: String,
  /// Category key is appended as a trailing path segment.
  pub leaderboard: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionCfg {
  pub max_turns: u8,
  /// How long a finished test session keeps its results on screen before resetting.
  pub test_reset_delay_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LeaderboardCfg {
  pub default_category: String,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      base_url: "http://127.0.0.1:10000".into(),
      timeout_secs: 20,
      endpoints: Endpoints::default(),
      session: SessionCfg::default(),
      leaderboard: LeaderboardCfg::default(),
    }
  }
}

impl Default for Endpoints {
  fn default() -> Self {
    Self {
      dataset_config: "/config/datasets.json".into(),
      practice: "/api/pretest".into(),
      test: "/api/test_prompt".into(),
      complex_practice: "/api/complex_practice".into(),
      complex_test: "/api/complex_test".into(),
      leaderboard: "/api/leaderboard".into(),
    }
  }
}

impl Default for SessionCfg {
  fn default() -> Self {
    Self { max_turns: 3, test_reset_delay_ms: 3000 }
  }
}

impl Default for LeaderboardCfg {
  fn default() -> Self {
    Self { default_category: "text_summarization".into() }
  }
}

impl ClientConfig {
  /// Strict load: IO and parse errors are returned to the caller.
  pub fn from_path(path: &str) -> Result<Self, ConfigError> {
    let raw = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
    Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse { path: path.to_string(), source })
  }

  pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
    toml::from_str::<ClientConfig>(raw)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn test_reset_delay(&self) -> Duration {
    Duration::from_millis(self.session.test_reset_delay_ms)
  }

  /// Join the base URL with an endpoint path without doubling slashes.
  pub fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
  }

  fn apply_env_overrides(&mut self) {
    if let Ok(url) = std::env::var("PROMPTLAB_BASE_URL") {
      if !url.trim().is_empty() {
        self.base_url = url.trim().to_string();
      }
    }
    if let Ok(raw) = std::env::var("PROMPTLAB_TIMEOUT_SECS") {
      match raw.parse::<u64>() {
        Ok(secs) => self.timeout_secs = secs,
        Err(e) => warn!(target: "promptlab", value = %raw, error = %e, "Ignoring invalid PROMPTLAB_TIMEOUT_SECS"),
      }
    }
  }
}

/// Load config from PROMPTLAB_CONFIG_PATH (if set), then apply env overrides.
/// Read/parse failures are logged and the defaults are used instead.
pub fn load_from_env() -> ClientConfig {
  let mut cfg = match std::env::var("PROMPTLAB_CONFIG_PATH") {
    Ok(path) => match ClientConfig::from_path(&path) {
      Ok(cfg) => {
        info!(target: "promptlab", %path, "Loaded client config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "promptlab", %path, error = %e, "Failed to load config; using defaults");
        ClientConfig::default()
      }
    },
    Err(_) => ClientConfig::default(),
  };
  cfg.apply_env_overrides();
  cfg
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_toml_yields_defaults() {
    let cfg = ClientConfig::from_toml_str("").expect("parse");
    assert_eq!(cfg.session.max_turns, 3);
    assert_eq!(cfg.endpoints.practice, "/api/pretest");
    assert_eq!(cfg.leaderboard.default_category, "text_summarization");
  }

  #[test]
  fn partial_tables_keep_remaining_defaults() {
    let cfg = ClientConfig::from_toml_str(
      r#"
        base_url = "http://scoring.local:8080/"
        [session]
        test_reset_delay_ms = 500
        [endpoints]
        test = "/api/submit"
      "#,
    )
    .expect("parse");
    assert_eq!(cfg.session.max_turns, 3);
    assert_eq!(cfg.test_reset_delay(), Duration::from_millis(500));
    assert_eq!(cfg.endpoints.test, "/api/submit");
    assert_eq!(cfg.endpoints.practice, "/api/pretest");
    assert_eq!(cfg.url("/api/pretest"), "http://scoring.local:8080/api/pretest");
  }

  #[test]
  fn missing_file_is_an_io_error() {
    let err = ClientConfig::from_path("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
  }
}
