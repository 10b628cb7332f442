//! Turn session controller: drives one practice or test session through its turns.
//!
//! Per submission:
//!   - validate locally (dataset, prompt, name in test mode, target language for translation)
//!   - send the prompt with the previous turn's output as context
//!   - store the output, advance the turn, or finalize on the last turn
//!
//! At most one submission is in flight per controller. A dataset change while a
//! request is outstanding resets the session; the late response is then discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::api::ScoringApi;
use crate::config::ClientConfig;
use crate::domain::{DatasetKind, Mode};
use crate::error::SessionError;
use crate::metrics::{results_view, ResultsView};
use crate::protocol::{ComplexExample, PracticeScoreRequest, ScoreResponse, TestScoreRequest};
use crate::session::{HistoryEntry, Session, TurnPhase};
use crate::util::{char_len, fill_template, trunc_for_log};

const PLACEHOLDER_SINGLE: &str = "Enter your system prompt for this specific task";
const PLACEHOLDER_FIRST_TURN: &str = "Enter your prompt for turn 1";
const PLACEHOLDER_NEXT_TURN: &str = "Enter your prompt for turn {turn}. Previous output will be used as context.";

/// Result of a successful submission.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
  /// A non-final turn completed; the session now awaits `next_turn`.
  Advanced { completed_turn: u8, next_turn: u8, output: String },
  /// The last turn completed.
  Finalized(FinalReport),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FinalReport {
  pub mode: Mode,
  pub dataset: DatasetKind,
  pub outputs: Vec<String>,
  pub prompt_lengths: Vec<usize>,
  pub total_prompt_length: usize,
  pub results: ResultsView,
  /// Multi-turn exercises hide the prompt input once finished.
  pub input_hidden: bool,
  /// When the session returns to turn 1; `None` means it already has.
  pub resets_after: Option<Duration>,
}

/// Read-only snapshot for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView {
  pub mode: Mode,
  pub dataset: Option<DatasetKind>,
  pub turn: u8,
  pub max_turns: u8,
  pub finalized: bool,
  pub busy: bool,
  pub input_visible: bool,
  pub placeholder: String,
  pub history: Vec<HistoryEntry>,
  pub example: Option<ComplexExample>,
  pub last_report: Option<FinalReport>,
}

struct Inner {
  session: Session,
  in_flight: bool,
  name: Option<String>,
  target_language: Option<String>,
  reset_at: Option<Instant>,
  example: Option<ComplexExample>,
  last_report: Option<FinalReport>,
}

impl Inner {
  fn apply_pending_reset(&mut self, now: Instant) -> bool {
    match self.reset_at {
      Some(at) if now >= at => {
        self.reset_at = None;
        self.session.reset();
        true
      }
      _ => false,
    }
  }
}

/// Everything a request needs, captured under the lock.
struct Pending {
  epoch: u64,
  dataset: DatasetKind,
  turn: u8,
  prompt_len: usize,
}

#[derive(Clone)]
pub struct TurnSessionController {
  id: Uuid,
  mode: Mode,
  api: Arc<dyn ScoringApi>,
  multi_turn_max: u8,
  reset_delay: Duration,
  inner: Arc<Mutex<Inner>>,
}

impl TurnSessionController {
  pub fn new(mode: Mode, api: Arc<dyn ScoringApi>, cfg: &ClientConfig) -> Self {
    let reset_delay = match mode {
      Mode::Practice => Duration::ZERO,
      Mode::Test => cfg.test_reset_delay(),
    };
    Self {
      id: Uuid::new_v4(),
      mode,
      api,
      multi_turn_max: cfg.session.max_turns,
      reset_delay,
      inner: Arc::new(Mutex::new(Inner {
        session: Session::new(None, 1),
        in_flight: false,
        name: None,
        target_language: None,
        reset_at: None,
        example: None,
        last_report: None,
      })),
    }
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub async fn is_busy(&self) -> bool {
    self.inner.lock().await.in_flight
  }

  pub async fn set_name(&self, name: &str) {
    let name = name.trim();
    self.inner.lock().await.name = if name.is_empty() { None } else { Some(name.to_string()) };
  }

  pub async fn set_target_language(&self, code: Option<&str>) {
    self.inner.lock().await.target_language = code
      .map(str::trim)
      .filter(|c| !c.is_empty())
      .map(str::to_string);
  }

  /// Switch dataset. Always returns the session to turn 1 with cleared history.
  /// For the complex exercise, the task example is fetched; failures are logged only.
  #[instrument(level = "info", skip(self), fields(session_id = %self.id, mode = %self.mode))]
  pub async fn select_dataset(&self, dataset: Option<DatasetKind>) -> Option<ComplexExample> {
    let epoch = {
      let mut inner = self.inner.lock().await;
      let max_turns = dataset.map(|d| d.max_turns(self.multi_turn_max)).unwrap_or(1);
      inner.session.select_dataset(dataset, max_turns);
      inner.reset_at = None;
      inner.example = None;
      inner.last_report = None;
      info!(target: "session", mode = %self.mode, dataset = ?dataset, max_turns, "Session reset for dataset change");
      inner.session.epoch()
    };

    if dataset != Some(DatasetKind::ComplexTransformation) {
      return None;
    }

    match self.api.complex_examples(self.mode).await {
      Ok(examples) => {
        let example = examples.into_iter().next()?;
        let mut inner = self.inner.lock().await;
        if inner.session.epoch() != epoch {
          debug!(target: "session", "Dataset changed while loading example; dropping it");
          return None;
        }
        inner.example = Some(example.clone());
        Some(example)
      }
      Err(e) => {
        error!(target: "session", mode = %self.mode, error = %e, "Error loading complex transformation example");
        None
      }
    }
  }

  /// Apply a due test-mode reset. Returns true if the session was reset.
  pub async fn poll_reset(&self) -> bool {
    let mut inner = self.inner.lock().await;
    let reset = inner.apply_pending_reset(Instant::now());
    if reset {
      info!(target: "session", mode = %self.mode, "Finalized session reset after display delay");
    }
    reset
  }

  /// Submit the prompt for the current turn.
  #[instrument(level = "info", skip(self, prompt), fields(session_id = %self.id, mode = %self.mode, prompt_len = char_len(prompt)))]
  pub async fn submit(&self, prompt: &str) -> Result<TurnOutcome, SessionError> {
    let (pending, request) = {
      let mut inner = self.inner.lock().await;
      inner.apply_pending_reset(Instant::now());

      let dataset = inner
        .session
        .dataset()
        .ok_or_else(|| SessionError::Validation("Please select a dataset type".into()))?;
      if prompt.trim().is_empty() {
        return Err(SessionError::Validation("Please enter a prompt".into()));
      }
      if self.mode == Mode::Test && inner.name.is_none() {
        return Err(SessionError::Validation("Please enter your name".into()));
      }
      if dataset.requires_target_language() && inner.target_language.is_none() {
        return Err(SessionError::Validation("Please select a target language".into()));
      }
      if inner.in_flight {
        return Err(SessionError::Busy);
      }
      if inner.session.is_finalized() {
        return Err(SessionError::Finalized);
      }

      let turn = inner.session.turn();
      let previous: Vec<String> = inner.session.previous_output().map(str::to_string).into_iter().collect();
      let request = self.build_request(&inner, dataset, prompt, turn, previous);

      inner.in_flight = true;
      if turn == 1 {
        inner.last_report = None;
      }
      let pending = Pending { epoch: inner.session.epoch(), dataset, turn, prompt_len: char_len(prompt) };
      (pending, request)
    };

    info!(target: "session", dataset = %pending.dataset, turn = pending.turn, prompt_len = pending.prompt_len, "Submitting turn");
    let result = match &request {
      Request::Practice(req) => self.api.score_practice(req).await,
      Request::Test(req) => self.api.score_test(req).await,
    };

    let mut inner = self.inner.lock().await;
    inner.in_flight = false;

    if inner.session.epoch() != pending.epoch {
      warn!(target: "session", turn = pending.turn, "Response arrived after session reset; discarding");
      return Err(SessionError::Superseded);
    }

    let resp = match result {
      Ok(resp) => resp,
      Err(e) => {
        error!(target: "session", turn = pending.turn, error = %e, "Scoring request failed; turn not advanced");
        return Err(SessionError::Transport(e));
      }
    };

    self.apply_response(&mut inner, &pending, resp)
  }

  fn build_request(&self, inner: &Inner, dataset: DatasetKind, prompt: &str, turn: u8, previous: Vec<String>) -> Request {
    let target_language = if dataset.requires_target_language() { inner.target_language.clone() } else { None };
    match self.mode {
      Mode::Practice => Request::Practice(PracticeScoreRequest {
        system_prompt: prompt.to_string(),
        dataset_type: dataset.key().to_string(),
        show_details: true,
        turn,
        previous_outputs: previous,
        target_language,
      }),
      Mode::Test => {
        let multi = dataset.is_multi_turn();
        Request::Test(TestScoreRequest {
          name: inner.name.clone().unwrap_or_default(),
          system_prompt: prompt.to_string(),
          dataset_type: dataset.key().to_string(),
          turn: multi.then_some(turn),
          previous_outputs: multi.then_some(previous),
          target_language,
        })
      }
    }
  }

  fn apply_response(&self, inner: &mut Inner, pending: &Pending, resp: ScoreResponse) -> Result<TurnOutcome, SessionError> {
    let output = resp.first_output().map(str::to_string);

    if pending.dataset.is_multi_turn() && output.is_none() {
      let reason = if resp.examples.is_empty() { "no result entries" } else { "empty model output" };
      error!(target: "session", turn = pending.turn, %reason, "Invalid response data; turn not advanced");
      return Err(SessionError::Protocol(reason.into()));
    }
    if let Some(out) = &output {
      debug!(target: "session", turn = pending.turn, output = %trunc_for_log(out, 80), "Storing turn output");
    }

    match inner.session.record_turn(output.clone(), pending.prompt_len) {
      TurnPhase::AwaitingInput(next_turn) => Ok(TurnOutcome::Advanced {
        completed_turn: pending.turn,
        next_turn,
        output: output.unwrap_or_default(),
      }),
      TurnPhase::Finalized => {
        let total = inner.session.total_prompt_length();
        let multi = pending.dataset.is_multi_turn();
        // Only multi-turn results are held on screen; single-turn sessions are ready at once.
        let delay = if multi { self.reset_delay } else { Duration::ZERO };
        let report = FinalReport {
          mode: self.mode,
          dataset: pending.dataset,
          outputs: inner.session.outputs(),
          prompt_lengths: inner.session.prompt_lengths(),
          total_prompt_length: total,
          results: results_view(pending.dataset, &resp, multi.then_some(total)),
          input_hidden: multi,
          resets_after: if delay.is_zero() { None } else { Some(delay) },
        };
        info!(target: "session", dataset = %pending.dataset, total_prompt_length = total, "Session finalized");

        if delay.is_zero() {
          inner.session.reset();
        } else {
          inner.reset_at = Some(Instant::now() + delay);
        }
        inner.last_report = Some(report.clone());
        Ok(TurnOutcome::Finalized(report))
      }
    }
  }

  pub async fn view(&self) -> SessionView {
    let mut inner = self.inner.lock().await;
    inner.apply_pending_reset(Instant::now());
    let session = &inner.session;
    let dataset = session.dataset();
    let multi = dataset.map(DatasetKind::is_multi_turn).unwrap_or(false);
    let turn = session.turn();

    let placeholder = if !multi {
      PLACEHOLDER_SINGLE.to_string()
    } else if turn <= 1 {
      PLACEHOLDER_FIRST_TURN.to_string()
    } else {
      fill_template(PLACEHOLDER_NEXT_TURN, &[("turn", &turn.to_string())])
    };

    SessionView {
      mode: self.mode,
      dataset,
      turn,
      max_turns: session.max_turns(),
      finalized: session.is_finalized(),
      busy: inner.in_flight,
      input_visible: !(multi && session.is_finalized()),
      placeholder,
      history: session.history(),
      example: inner.example.clone(),
      last_report: inner.last_report.clone(),
    }
  }
}

enum Request {
  Practice(PracticeScoreRequest),
  Test(TestScoreRequest),
}
