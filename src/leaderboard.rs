//! Leaderboard table: fetch ranked entries per category, sort client-side, and
//! project them into a table view-model.
//!
//! Column sets are static per category. Sorting always starts from the order the
//! backend returned, so toggling the same column twice restores the previous order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::api::LeaderboardApi;
use crate::domain::{language_name, DatasetKind};
use crate::error::LeaderboardError;
use crate::protocol::{value_as_f64, LeaderboardEntry};
use crate::util::title_case_key;

/// Header/cell definition for one column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
  pub key: &'static str,
  pub label: &'static str,
  pub icon: &'static str,
}

const fn col(key: &'static str, label: &'static str, icon: &'static str) -> Column {
  Column { key, label, icon }
}

const TEXT_SUMMARIZATION: &[Column] = &[
  col("name", "Name", "fa-user"),
  col("score", "Score", "fa-star"),
  col("prompt_length", "Prompt Length", "fa-text-width"),
  col("similarity", "Similarity", "fa-equals"),
  col("length_penalty_avg", "Length Penalty", "fa-ruler"),
  col("prompt_efficiency", "Efficiency", "fa-bolt"),
  col("timestamp", "Date", "fa-calendar"),
];

const WORD_SORTING: &[Column] = &[
  col("name", "Name", "fa-user"),
  col("score", "Score", "fa-star"),
  col("prompt_length", "Prompt Length", "fa-text-width"),
  col("accuracy", "Accuracy", "fa-bullseye"),
  col("word_accuracy", "Word Accuracy", "fa-check-double"),
  col("efficiency", "Efficiency", "fa-bolt"),
  col("timestamp", "Date", "fa-calendar"),
];

const CAUSAL_JUDGEMENT: &[Column] = &[
  col("name", "Name", "fa-user"),
  col("score", "Score", "fa-star"),
  col("prompt_length", "Prompt Length", "fa-text-width"),
  col("base_accuracy", "Base Accuracy", "fa-bullseye"),
  col("efficiency", "Efficiency", "fa-bolt"),
  col("timestamp", "Date", "fa-calendar"),
];

const TRANSLATION_TASK: &[Column] = &[
  col("name", "Name", "fa-user"),
  col("score", "Score", "fa-star"),
  col("target_language", "Language", "fa-language"),
  col("prompt_length", "Prompt Length", "fa-text-width"),
  col("semantic_similarity", "Semantic Score", "fa-equals"),
  col("language_quality", "Quality", "fa-check-circle"),
  col("efficiency", "Efficiency", "fa-bolt"),
  col("timestamp", "Date", "fa-calendar"),
];

/// Categories that have a leaderboard, in tab order.
pub const CATEGORIES: [DatasetKind; 4] = [
  DatasetKind::TextSummarization,
  DatasetKind::WordSorting,
  DatasetKind::CausalJudgement,
  DatasetKind::TranslationTask,
];

pub fn columns(category: DatasetKind) -> Option<&'static [Column]> {
  match category {
    DatasetKind::TextSummarization => Some(TEXT_SUMMARIZATION),
    DatasetKind::WordSorting => Some(WORD_SORTING),
    DatasetKind::CausalJudgement => Some(CAUSAL_JUDGEMENT),
    DatasetKind::TranslationTask => Some(TRANSLATION_TASK),
    _ => None,
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
  Asc,
  Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortConfig {
  pub key: String,
  pub direction: SortDirection,
}

impl Default for SortConfig {
  fn default() -> Self {
    Self { key: "score".into(), direction: SortDirection::Desc }
  }
}

impl SortConfig {
  /// Same column ascending flips to descending; anything else starts ascending.
  pub fn toggled(&self, key: &str) -> SortConfig {
    let direction = if self.key == key && self.direction == SortDirection::Asc {
      SortDirection::Desc
    } else {
      SortDirection::Asc
    };
    SortConfig { key: key.to_string(), direction }
  }
}

/// Result of the most recent fetch per category.
#[derive(Clone, Debug, PartialEq)]
enum FetchState {
  Loaded(Vec<LeaderboardEntry>),
  Failed(String),
}

#[derive(Clone, Debug)]
pub struct LeaderboardState {
  pub active_category: DatasetKind,
  pub sort: SortConfig,
  rows_by_category: HashMap<DatasetKind, FetchState>,
}

impl LeaderboardState {
  pub fn new(active_category: DatasetKind) -> Self {
    Self { active_category, sort: SortConfig::default(), rows_by_category: HashMap::new() }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Medal {
  Gold,
  Silver,
  Bronze,
}

impl Medal {
  fn for_rank(index: usize) -> Option<Medal> {
    match index {
      0 => Some(Medal::Gold),
      1 => Some(Medal::Silver),
      2 => Some(Medal::Bronze),
      _ => None,
    }
  }

  pub fn marker(self) -> &'static str {
    match self {
      Medal::Gold => "🥇",
      Medal::Silver => "🥈",
      Medal::Bronze => "🥉",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderCell {
  pub key: &'static str,
  pub label: &'static str,
  pub icon: &'static str,
  pub sort: Option<SortDirection>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
  pub key: &'static str,
  pub text: String,
  /// Only set on the name cell of the top three rows.
  pub medal: Option<Medal>,
  pub emphasized: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatsView {
  pub total_entries: usize,
  pub average_score: String,
  pub top_score: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableView {
  pub headers: Vec<HeaderCell>,
  pub rows: Vec<Vec<Cell>>,
  pub stats: StatsView,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaderboardBody {
  Loading,
  Table(TableView),
  Empty,
  Error(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardView {
  pub title: String,
  pub body: LeaderboardBody,
}

pub struct Leaderboard {
  api: Arc<dyn LeaderboardApi>,
  state: LeaderboardState,
}

impl Leaderboard {
  pub fn new(api: Arc<dyn LeaderboardApi>, default_category: DatasetKind) -> Self {
    Self { api, state: LeaderboardState::new(default_category) }
  }

  pub fn state(&self) -> &LeaderboardState {
    &self.state
  }

  /// Activate a category and refetch it (the cache is overwritten, never trusted).
  #[instrument(level = "info", skip(self))]
  pub async fn select_category(&mut self, category: &str) -> Result<LeaderboardView, LeaderboardError> {
    let kind = category
      .parse::<DatasetKind>()
      .ok()
      .filter(|k| columns(*k).is_some())
      .ok_or_else(|| LeaderboardError::UnknownCategory(category.to_string()))?;
    self.state.active_category = kind;
    self.fetch_category(kind).await?;
    Ok(self.view())
  }

  /// Fetch one category. Failures are recorded for the view and also returned.
  #[instrument(level = "info", skip(self), fields(category = %category))]
  pub async fn fetch_category(&mut self, category: DatasetKind) -> Result<usize, LeaderboardError> {
    match self.api.leaderboard(category.key()).await {
      Ok(rows) => {
        let n = rows.len();
        info!(target: "leaderboard", %category, entries = n, "Leaderboard loaded");
        self.state.rows_by_category.insert(category, FetchState::Loaded(rows));
        Ok(n)
      }
      Err(e) => {
        error!(target: "leaderboard", %category, error = %e, "Error loading leaderboard");
        self.state.rows_by_category.insert(category, FetchState::Failed(e.to_string()));
        Err(LeaderboardError::Transport(e))
      }
    }
  }

  pub fn sort_by(&mut self, key: &str) -> LeaderboardView {
    let known = columns(self.state.active_category)
      .map(|cols| cols.iter().any(|c| c.key == key))
      .unwrap_or(false);
    if !known {
      warn!(target: "leaderboard", %key, category = %self.state.active_category, "Sorting on a column the table does not show");
    }
    self.state.sort = self.state.sort.toggled(key);
    self.view()
  }

  pub fn view(&self) -> LeaderboardView {
    render_view(&self.state)
  }
}

/// Project state into the table view-model for the active category.
pub fn render_view(state: &LeaderboardState) -> LeaderboardView {
  let category = state.active_category;
  let title = format!("{} Leaderboard", title_case_key(category.key()));
  let body = match (state.rows_by_category.get(&category), columns(category)) {
    (None, _) => LeaderboardBody::Loading,
    (Some(FetchState::Failed(reason)), _) => LeaderboardBody::Error(format!("Error loading leaderboard data ({reason})")),
    (_, None) => LeaderboardBody::Error(format!("No leaderboard columns for {category}")),
    (Some(FetchState::Loaded(rows)), _) if rows.is_empty() => LeaderboardBody::Empty,
    (Some(FetchState::Loaded(rows)), Some(cols)) => LeaderboardBody::Table(table(rows, cols, &state.sort)),
  };
  LeaderboardView { title, body }
}

fn table(rows: &[LeaderboardEntry], cols: &'static [Column], sort: &SortConfig) -> TableView {
  let headers = cols
    .iter()
    .map(|c| HeaderCell {
      key: c.key,
      label: c.label,
      icon: c.icon,
      sort: (c.key == sort.key).then_some(sort.direction),
    })
    .collect();

  let sorted = sorted_rows(rows, sort);
  let rows = sorted
    .iter()
    .enumerate()
    .map(|(index, entry)| {
      cols
        .iter()
        .map(|c| Cell {
          key: c.key,
          text: format_value(entry.get(c.key), c.key),
          medal: if c.key == "name" { Medal::for_rank(index) } else { None },
          emphasized: c.key == "score",
        })
        .collect()
    })
    .collect();

  TableView { headers, rows, stats: stats(rows_scores(&sorted)) }
}

fn rows_scores(rows: &[&LeaderboardEntry]) -> Vec<f64> {
  rows.iter().map(|r| r.score().unwrap_or(0.0)).collect()
}

fn stats(scores: Vec<f64>) -> StatsView {
  let total_entries = scores.len();
  let avg = if total_entries == 0 { 0.0 } else { scores.iter().sum::<f64>() / total_entries as f64 };
  let top = scores.iter().copied().fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))));
  StatsView {
    total_entries,
    average_score: format!("{:.1}%", avg),
    top_score: format!("{:.1}%", top.unwrap_or(0.0)),
  }
}

/// Stable sort of a copy of `rows` under the given config.
pub fn sorted_rows<'a>(rows: &'a [LeaderboardEntry], sort: &SortConfig) -> Vec<&'a LeaderboardEntry> {
  let modifier = match sort.direction {
    SortDirection::Asc => 1.0,
    SortDirection::Desc => -1.0,
  };
  let mut out: Vec<&LeaderboardEntry> = rows.iter().collect();
  out.sort_by(|a, b| {
    let diff = (sort_value(a, &sort.key) - sort_value(b, &sort.key)) * modifier;
    // NaN (unparsable values, -inf vs -inf) compares equal.
    diff.partial_cmp(&0.0).unwrap_or(Ordering::Equal)
  });
  out
}

/// Numeric sort key. Missing values sort as -inf; timestamps by epoch millis;
/// non-numeric strings become NaN.
fn sort_value(entry: &LeaderboardEntry, key: &str) -> f64 {
  if key == "timestamp" {
    return entry
      .get(key)
      .and_then(Value::as_str)
      .and_then(timestamp_millis)
      .map(|ms| ms as f64)
      .unwrap_or(f64::NAN);
  }
  match entry.get(key) {
    None => f64::NEG_INFINITY,
    Some(Value::Bool(b)) => if *b { 1.0 } else { 0.0 },
    Some(v) => value_as_f64(v).unwrap_or(f64::NAN),
  }
}

/// Instant of a timestamp for ordering. Offsets are honored; naive values are read as UTC.
fn timestamp_millis(raw: &str) -> Option<i64> {
  match DateTime::parse_from_rfc3339(raw.trim()) {
    Ok(dt) => Some(dt.timestamp_millis()),
    Err(_) => parse_timestamp(raw).map(|dt| dt.and_utc().timestamp_millis()),
  }
}

/// ISO-8601 with or without offset, as wall-clock time for display.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.naive_local());
  }
  for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
      return Some(dt);
    }
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn is_percent_key(key: &str) -> bool {
  key == "score"
    || ["accuracy", "similarity", "efficiency", "penalty"].iter().any(|k| key.contains(k))
}

/// Cell text for a column value.
pub fn format_value(value: Option<&Value>, key: &str) -> String {
  let value = match value {
    None | Some(Value::Null) => return "-".into(),
    Some(v) => v,
  };
  if key == "timestamp" {
    if let Some(raw) = value.as_str() {
      return parse_timestamp(raw)
        .map(|dt| dt.format("%b %-d, %Y, %I:%M %p").to_string())
        .unwrap_or_else(|| raw.to_string());
    }
  }
  if key == "target_language" {
    if let Some(code) = value.as_str() {
      return language_name(code).to_string();
    }
  }
  match value {
    Value::Number(n) => {
      let v = n.as_f64().unwrap_or(0.0);
      if key == "prompt_length" {
        // Half rounds up, as in the browser.
        format!("{}", (v + 0.5).floor() as i64)
      } else if is_percent_key(key) {
        format!("{:.1}%", v)
      } else {
        format!("{:.2}", v)
      }
    }
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ApiError;
  use async_trait::async_trait;
  use serde_json::json;
  use std::sync::Mutex;

  fn entry(v: Value) -> LeaderboardEntry {
    serde_json::from_value(v).unwrap()
  }

  fn sample_rows() -> Vec<LeaderboardEntry> {
    vec![
      entry(json!({"name": "ana", "score": 71.0, "prompt_length": 120, "timestamp": "2024-03-02T10:00:00"})),
      entry(json!({"name": "bo", "score": 88.5, "prompt_length": 80, "timestamp": "2024-03-01T09:30:00"})),
      entry(json!({"name": "cy", "score": null, "prompt_length": 95, "timestamp": "2024-03-03T18:45:00"})),
      entry(json!({"name": "di", "score": 64.2, "prompt_length": 200, "timestamp": "2024-02-28T08:00:00"})),
    ]
  }

  fn names(rows: &[&LeaderboardEntry]) -> Vec<String> {
    rows.iter().map(|r| r.name().to_string()).collect()
  }

  struct FakeBoard {
    responses: Mutex<HashMap<String, Result<Vec<LeaderboardEntry>, String>>>,
  }

  #[async_trait]
  impl LeaderboardApi for FakeBoard {
    async fn leaderboard(&self, category: &str) -> Result<Vec<LeaderboardEntry>, ApiError> {
      match self.responses.lock().unwrap().get(category).cloned() {
        Some(Ok(rows)) => Ok(rows),
        Some(Err(msg)) => Err(ApiError::Backend(msg)),
        None => Ok(vec![]),
      }
    }
  }

  fn board(responses: Vec<(&str, Result<Vec<LeaderboardEntry>, String>)>) -> Leaderboard {
    let map = responses.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    Leaderboard::new(Arc::new(FakeBoard { responses: Mutex::new(map) }), DatasetKind::TextSummarization)
  }

  #[test]
  fn default_sort_is_score_descending_with_missing_last() {
    let rows = sample_rows();
    let sorted = sorted_rows(&rows, &SortConfig::default());
    assert_eq!(names(&sorted), vec!["bo", "ana", "di", "cy"]);
  }

  #[test]
  fn ascending_puts_missing_first() {
    let rows = sample_rows();
    let cfg = SortConfig { key: "score".into(), direction: SortDirection::Asc };
    assert_eq!(names(&sorted_rows(&rows, &cfg)), vec!["cy", "di", "ana", "bo"]);
  }

  #[test]
  fn timestamps_sort_by_date() {
    let rows = sample_rows();
    let cfg = SortConfig { key: "timestamp".into(), direction: SortDirection::Asc };
    assert_eq!(names(&sorted_rows(&rows, &cfg)), vec!["di", "bo", "ana", "cy"]);
  }

  #[test]
  fn timestamps_with_offsets_sort_by_instant() {
    let rows = vec![
      entry(json!({"name": "a", "timestamp": "2024-03-02T10:00:00+05:00"})),
      entry(json!({"name": "b", "timestamp": "2024-03-02T06:00:00Z"})),
      entry(json!({"name": "c", "timestamp": "2024-03-02T05:30:00"})),
    ];
    let cfg = SortConfig { key: "timestamp".into(), direction: SortDirection::Asc };
    assert_eq!(names(&sorted_rows(&rows, &cfg)), vec!["a", "c", "b"]);
    // Display keeps the wall-clock time of the value itself.
    assert_eq!(format_value(rows[0].get("timestamp"), "timestamp"), "Mar 2, 2024, 10:00 AM");
  }

  #[test]
  fn toggle_flips_same_key_and_restarts_new_key_ascending() {
    let cfg = SortConfig::default();
    let once = cfg.toggled("score");
    assert_eq!(once.direction, SortDirection::Asc);
    let twice = once.toggled("score");
    assert_eq!(twice, SortConfig::default());

    let other = twice.toggled("prompt_length");
    assert_eq!(other, SortConfig { key: "prompt_length".into(), direction: SortDirection::Asc });
  }

  #[test]
  fn double_toggle_restores_row_order() {
    let rows = sample_rows();
    let mut state = LeaderboardState::new(DatasetKind::WordSorting);
    state.rows_by_category.insert(DatasetKind::WordSorting, FetchState::Loaded(rows.clone()));
    state.sort = SortConfig { key: "prompt_length".into(), direction: SortDirection::Desc };
    let before = names(&sorted_rows(&rows, &state.sort));

    state.sort = state.sort.toggled("prompt_length");
    assert_ne!(names(&sorted_rows(&rows, &state.sort)), before);
    state.sort = state.sort.toggled("prompt_length");
    assert_eq!(names(&sorted_rows(&rows, &state.sort)), before);
  }

  #[test]
  fn values_are_formatted_per_column() {
    assert_eq!(format_value(Some(&json!(83.456)), "word_accuracy"), "83.5%");
    assert_eq!(format_value(Some(&json!(83.456)), "score"), "83.5%");
    assert_eq!(format_value(Some(&json!(12.5)), "length_penalty_avg"), "12.5%");
    assert_eq!(format_value(Some(&json!(3.14159)), "language_quality"), "3.14");
    assert_eq!(format_value(Some(&json!(99.5)), "prompt_length"), "100");
    assert_eq!(format_value(Some(&Value::Null), "accuracy"), "-");
    assert_eq!(format_value(None, "similarity"), "-");
    assert_eq!(format_value(Some(&json!("pt")), "target_language"), "Portuguese");
    assert_eq!(format_value(Some(&json!("de")), "target_language"), "de");
    assert_eq!(format_value(Some(&json!("ana")), "name"), "ana");
    assert_eq!(format_value(Some(&json!("2024-03-02T15:07:00")), "timestamp"), "Mar 2, 2024, 03:07 PM");
    assert_eq!(format_value(Some(&json!("not a date")), "timestamp"), "not a date");
  }

  #[tokio::test]
  async fn table_has_medals_on_top_three_names() {
    let mut lb = board(vec![("word_sorting", Ok(sample_rows()))]);
    let view = lb.select_category("word_sorting").await.unwrap();
    assert_eq!(view.title, "Word Sorting Leaderboard");
    let LeaderboardBody::Table(table) = view.body else { panic!("expected table") };

    assert_eq!(table.headers.len(), WORD_SORTING.len());
    assert_eq!(table.headers[1].sort, Some(SortDirection::Desc));
    assert_eq!(table.rows[0][0].text, "bo");
    assert_eq!(table.rows[0][0].medal, Some(Medal::Gold));
    assert_eq!(table.rows[1][0].medal, Some(Medal::Silver));
    assert_eq!(table.rows[2][0].medal, Some(Medal::Bronze));
    assert_eq!(table.rows[3][0].medal, None);
    assert!(table.rows[0].iter().skip(1).all(|c| c.medal.is_none()));
    assert_eq!(table.rows[3][1].text, "-");
    assert_eq!(table.stats.total_entries, 4);
    assert_eq!(table.stats.top_score, "88.5%");
  }

  #[tokio::test]
  async fn empty_and_failed_fetches_are_distinct() {
    let mut lb = board(vec![
      ("text_summarization", Ok(vec![])),
      ("causal_judgement", Err("boom".into())),
    ]);
    let view = lb.select_category("text_summarization").await.unwrap();
    assert_eq!(view.body, LeaderboardBody::Empty);

    let err = lb.select_category("causal_judgement").await.unwrap_err();
    assert!(matches!(err, LeaderboardError::Transport(_)));
    assert!(matches!(lb.view().body, LeaderboardBody::Error(_)));
    assert_eq!(lb.state().active_category, DatasetKind::CausalJudgement);
  }

  #[tokio::test]
  async fn unknown_category_is_rejected() {
    let mut lb = board(vec![]);
    let err = lb.select_category("complex_transformation").await.unwrap_err();
    assert!(matches!(err, LeaderboardError::UnknownCategory(_)));
    assert_eq!(lb.view().body, LeaderboardBody::Loading);
  }

  #[tokio::test]
  async fn sort_by_rerenders_active_category() {
    let mut lb = board(vec![("word_sorting", Ok(sample_rows()))]);
    lb.select_category("word_sorting").await.unwrap();
    let view = lb.sort_by("prompt_length");
    let LeaderboardBody::Table(table) = view.body else { panic!("expected table") };
    assert_eq!(table.rows[0][0].text, "bo");
    assert_eq!(table.headers[2].sort, Some(SortDirection::Asc));
    assert_eq!(table.headers[1].sort, None);
  }
}
