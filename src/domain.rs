//! Domain models: dataset kinds, session modes, and the small language-code table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Task family selected by the user. Every per-dataset behavior
/// (turn count, metric panel, leaderboard columns) dispatches on this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
  WordSorting,
  LogicalDeduction,
  CausalJudgement,
  TextSummarization,
  TranslationTask,
  ComplexTransformation,
}

impl DatasetKind {
  pub const ALL: [DatasetKind; 6] = [
    DatasetKind::WordSorting,
    DatasetKind::LogicalDeduction,
    DatasetKind::CausalJudgement,
    DatasetKind::TextSummarization,
    DatasetKind::TranslationTask,
    DatasetKind::ComplexTransformation,
  ];

  /// Wire key used by the backend and the dataset catalog.
  pub fn key(self) -> &'static str {
    match self {
      DatasetKind::WordSorting => "word_sorting",
      DatasetKind::LogicalDeduction => "logical_deduction",
      DatasetKind::CausalJudgement => "causal_judgement",
      DatasetKind::TextSummarization => "text_summarization",
      DatasetKind::TranslationTask => "translation_task",
      DatasetKind::ComplexTransformation => "complex_transformation",
    }
  }

  /// Only the complex transformation exercise spans several turns.
  pub fn is_multi_turn(self) -> bool {
    matches!(self, DatasetKind::ComplexTransformation)
  }

  pub fn max_turns(self, configured_multi_turn: u8) -> u8 {
    if self.is_multi_turn() { configured_multi_turn.max(1) } else { 1 }
  }

  pub fn requires_target_language(self) -> bool {
    matches!(self, DatasetKind::TranslationTask)
  }
}

impl fmt::Display for DatasetKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.key())
  }
}

impl FromStr for DatasetKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    // The catalog has historically used both spellings.
    let s = if s == "causal_judgment" { "causal_judgement" } else { s };
    DatasetKind::ALL
      .into_iter()
      .find(|k| k.key() == s)
      .ok_or_else(|| format!("unknown dataset type: {s}"))
  }
}

/// Practice sessions are anonymous; test sessions are attributed to a name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
  Practice,
  Test,
}

impl Mode {
  pub fn as_str(self) -> &'static str {
    match self {
      Mode::Practice => "practice",
      Mode::Test => "test",
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Target languages offered for the translation task.
pub const LANGUAGES: &[(&str, &str)] = &[
  ("pt", "Portuguese"),
  ("ru", "Russian"),
  ("sl", "Slovenian"),
  ("es", "Spanish"),
  ("sv", "Swedish"),
];

/// Display name for a language code; unmapped codes fall back to the code itself.
pub fn language_name(code: &str) -> &str {
  LANGUAGES
    .iter()
    .find(|(c, _)| *c == code)
    .map(|(_, name)| *name)
    .unwrap_or(code)
}
