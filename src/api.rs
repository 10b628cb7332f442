//! HTTP client for the scoring backend.
//!
//! The collaborators the front end consumes are modeled as traits so the session
//! controller and leaderboard can be driven by in-process fakes in tests:
//!   - `DatasetCatalogApi`: dataset descriptions/instructions (fetched once)
//!   - `ScoringApi`: practice scoring, named test submission, complex examples
//!   - `LeaderboardApi`: ranked entries per category
//!
//! `HttpBackend` implements all three over reqwest. Calls are instrumented and log
//! endpoint, status, latency and body sizes (never prompt contents).

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::config::ClientConfig;
use crate::domain::Mode;
use crate::error::ApiError;
use crate::protocol::{
  ComplexExample, ComplexExamplesResponse, DatasetCatalog, ErrorBody, LeaderboardEntry,
  PracticeScoreRequest, ScoreResponse, TestScoreRequest,
};

const CLIENT_UA: &str = concat!("promptlab/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait DatasetCatalogApi: Send + Sync {
  async fn dataset_catalog(&self) -> Result<DatasetCatalog, ApiError>;
}

#[async_trait]
pub trait ScoringApi: Send + Sync {
  async fn score_practice(&self, req: &PracticeScoreRequest) -> Result<ScoreResponse, ApiError>;
  async fn score_test(&self, req: &TestScoreRequest) -> Result<ScoreResponse, ApiError>;
  async fn complex_examples(&self, mode: Mode) -> Result<Vec<ComplexExample>, ApiError>;
}

#[async_trait]
pub trait LeaderboardApi: Send + Sync {
  async fn leaderboard(&self, category: &str) -> Result<Vec<LeaderboardEntry>, ApiError>;
}

#[derive(Clone)]
pub struct HttpBackend {
  client: reqwest::Client,
  cfg: ClientConfig,
}

impl HttpBackend {
  pub fn new(cfg: ClientConfig) -> Result<Self, ApiError> {
    let client = reqwest::Client::builder()
      .timeout(cfg.timeout())
      .build()?;
    Ok(Self { client, cfg })
  }

  pub fn base_url(&self) -> &str {
    &self.cfg.base_url
  }

  #[instrument(level = "debug", skip(self), fields(%path))]
  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    let url = self.cfg.url(path);
    let start = std::time::Instant::now();
    let res = self.client.get(&url)
      .header(USER_AGENT, CLIENT_UA)
      .header(ACCEPT, "application/json")
      .send().await?;
    self.decode(res, start).await
  }

  #[instrument(level = "debug", skip(self, body), fields(%path))]
  async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
    let url = self.cfg.url(path);
    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, CLIENT_UA)
      .header(CONTENT_TYPE, "application/json")
      .json(body)
      .send().await?;
    self.decode(res, start).await
  }

  async fn decode<T: DeserializeOwned>(&self, res: reqwest::Response, start: std::time::Instant) -> Result<T, ApiError> {
    let status = res.status();
    let body = res.text().await?;
    let elapsed = start.elapsed();

    if !status.is_success() {
      let message = extract_backend_error(&body).unwrap_or_else(|| body.clone());
      error!(target: "promptlab", %status, ?elapsed, "Backend returned non-success status");
      return Err(ApiError::Status { status, message });
    }
    debug!(target: "promptlab", %status, ?elapsed, body_len = body.len(), "Backend response received");

    if body.trim().is_empty() {
      return Err(ApiError::Decode("empty response body".into()));
    }
    // A 200 that only carries `{error}` is still a failure.
    if let Some(msg) = extract_backend_error(&body) {
      return Err(ApiError::Backend(msg));
    }
    serde_json::from_str::<T>(&body).map_err(|e| ApiError::Decode(e.to_string()))
  }
}

#[async_trait]
impl DatasetCatalogApi for HttpBackend {
  #[instrument(level = "info", skip(self))]
  async fn dataset_catalog(&self) -> Result<DatasetCatalog, ApiError> {
    let catalog: DatasetCatalog = self.get_json(&self.cfg.endpoints.dataset_config).await?;
    info!(target: "promptlab", datasets = catalog.len(), "Dataset config loaded");
    Ok(catalog)
  }
}

#[async_trait]
impl ScoringApi for HttpBackend {
  #[instrument(level = "info", skip(self, req), fields(dataset = %req.dataset_type, turn = req.turn, prompt_len = req.system_prompt.len()))]
  async fn score_practice(&self, req: &PracticeScoreRequest) -> Result<ScoreResponse, ApiError> {
    self.post_json(&self.cfg.endpoints.practice, req).await
  }

  #[instrument(level = "info", skip(self, req), fields(dataset = %req.dataset_type, turn = ?req.turn, prompt_len = req.system_prompt.len()))]
  async fn score_test(&self, req: &TestScoreRequest) -> Result<ScoreResponse, ApiError> {
    self.post_json(&self.cfg.endpoints.test, req).await
  }

  #[instrument(level = "info", skip(self), fields(%mode))]
  async fn complex_examples(&self, mode: Mode) -> Result<Vec<ComplexExample>, ApiError> {
    let path = match mode {
      Mode::Practice => &self.cfg.endpoints.complex_practice,
      Mode::Test => &self.cfg.endpoints.complex_test,
    };
    let body: ComplexExamplesResponse = self.get_json(path).await?;
    Ok(body.examples)
  }
}

#[async_trait]
impl LeaderboardApi for HttpBackend {
  #[instrument(level = "info", skip(self), fields(%category))]
  async fn leaderboard(&self, category: &str) -> Result<Vec<LeaderboardEntry>, ApiError> {
    let path = format!("{}/{}", self.cfg.endpoints.leaderboard.trim_end_matches('/'), category);
    // The endpoint may answer `null` for a category without entries.
    let rows: Option<Vec<LeaderboardEntry>> = self.get_json(&path).await?;
    Ok(rows.unwrap_or_default())
  }
}

/// Pull `error` out of a backend JSON body, if that is all it says.
fn extract_backend_error(body: &str) -> Option<String> {
  serde_json::from_str::<ErrorBody>(body).ok().map(|b| b.error)
}
