//! promptlab · terminal front end
//!
//! - Practice and named test sessions against the scoring backend
//! - Leaderboards per category
//!
//! Important env variables:
//!   PROMPTLAB_CONFIG_PATH  : path to TOML config (endpoints, session and leaderboard defaults)
//!   PROMPTLAB_BASE_URL     : backend base URL (default "http://127.0.0.1:10000")
//!   PROMPTLAB_TIMEOUT_SECS : request timeout in seconds (default 20)
//!   LOG_LEVEL              : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT             : "pretty" (default) or "json"

use std::sync::Arc;
use tracing::{info, instrument};

use promptlab::{config, console, telemetry, HttpBackend, Workbench};

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = config::load_from_env();
  let backend = Arc::new(HttpBackend::new(cfg.clone())?);
  info!(target: "promptlab", base_url = %backend.base_url(), "Backend client ready");

  let workbench = Workbench::with_backend(&cfg, backend);
  console::run(workbench).await?;
  Ok(())
}
