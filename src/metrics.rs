//! Result view-models: the metric panel and example cards shown after a scored submission.
//!
//! Everything here is data -> data. `render` turns these into text; tests assert on
//! the formatted strings directly.

use serde_json::Value;

use crate::domain::DatasetKind;
use crate::protocol::{ExampleResult, Metrics, ScoreResponse};
use crate::util::plain_number;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricLine {
  pub label: &'static str,
  pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricPanel {
  pub title: &'static str,
  pub lines: Vec<MetricLine>,
}

impl MetricPanel {
  pub fn value(&self, label: &str) -> Option<&str> {
    self.lines.iter().find(|l| l.label == label).map(|l| l.value.as_str())
  }
}

/// How a metric value is printed.
#[derive(Clone, Copy, Debug)]
enum Fmt {
  /// `92` -> "92%"
  PlainPct,
  /// `75` -> "75.0%"
  Pct1,
  /// `80` -> "80.0"
  Fixed1,
  /// `1.5` -> "1.50"
  Fixed2,
  /// modifier `0.8` -> "80%"
  ModifierPct,
  Plain,
  Chars,
}

fn fmt_value(v: Option<f64>, f: Fmt) -> String {
  match (f, v) {
    (Fmt::PlainPct, v) => format!("{}%", plain_number(v.unwrap_or(0.0))),
    (Fmt::Pct1, v) => format!("{:.1}%", v.unwrap_or(0.0)),
    (Fmt::Fixed1, v) => format!("{:.1}", v.unwrap_or(0.0)),
    (Fmt::Fixed2, Some(v)) => format!("{:.2}", v),
    (Fmt::Fixed2, None) => "0".into(),
    (Fmt::ModifierPct, v) => format!("{:.0}%", v.unwrap_or(0.0) * 100.0),
    (Fmt::Plain, v) => plain_number(v.unwrap_or(0.0)),
    (Fmt::Chars, v) => format!("{} chars", plain_number(v.unwrap_or(0.0))),
  }
}

/// (label, metric key, format) rows of each dataset's panel.
fn panel_rows(kind: DatasetKind) -> (&'static str, &'static [(&'static str, &'static str, Fmt)]) {
  match kind {
    DatasetKind::WordSorting => ("Word Sorting Metrics", &[
      ("Combined Score", "combined_score", Fmt::PlainPct),
      ("Accuracy", "accuracy", Fmt::PlainPct),
      ("Word Accuracy", "word_accuracy", Fmt::PlainPct),
      ("Word Order Distance", "word_order_distance", Fmt::Fixed2),
      ("Prompt Efficiency", "efficiency_modifier", Fmt::ModifierPct),
    ]),
    DatasetKind::LogicalDeduction => ("Logical Deduction Metrics", &[
      ("Accuracy", "accuracy", Fmt::PlainPct),
      ("Base Accuracy", "base_accuracy", Fmt::PlainPct),
      ("Efficiency", "efficiency_modifier", Fmt::ModifierPct),
    ]),
    DatasetKind::CausalJudgement => ("Causal Judgement Metrics", &[
      ("Final Score", "final_score", Fmt::Pct1),
      ("Accuracy", "accuracy", Fmt::Pct1),
      ("Base Accuracy", "base_accuracy", Fmt::Pct1),
      ("Efficiency", "efficiency", Fmt::Pct1),
    ]),
    DatasetKind::TextSummarization => ("Summarization Metrics", &[
      ("Final Score", "final_score", Fmt::PlainPct),
      ("Semantic Similarity", "similarity", Fmt::PlainPct),
      ("Length Penalty", "length_penalty_avg", Fmt::PlainPct),
      ("Prompt Efficiency", "prompt_efficiency", Fmt::PlainPct),
      ("Actual Length", "average_actual_length_chars", Fmt::Plain),
      ("Prompt Length", "prompt_length_chars", Fmt::Chars),
    ]),
    DatasetKind::TranslationTask => ("Translation Metrics", &[
      ("Final Score", "final_score", Fmt::Pct1),
      ("Semantic Score", "semantic_similarity", Fmt::Pct1),
      ("Quality Score", "language_quality", Fmt::Pct1),
      ("Efficiency", "efficiency", Fmt::Pct1),
    ]),
    DatasetKind::ComplexTransformation => ("Complex Transformation Metrics", &[
      ("Final Score", "final_score", Fmt::Pct1),
      ("Rule Accuracy", "rule_accuracy", Fmt::Fixed1),
      ("Completeness", "completeness", Fmt::Fixed1),
      ("Format Score", "format_score", Fmt::Fixed1),
      ("Efficiency", "efficiency", Fmt::Pct1),
    ]),
  }
}

/// Build the metric panel for a dataset. `total_prompt_length` is the session-wide
/// sum for multi-turn exercises; single-turn panels use the backend's `prompt_length`.
pub fn metric_panel(kind: DatasetKind, metrics: &Metrics, total_prompt_length: Option<usize>) -> MetricPanel {
  let (title, rows) = panel_rows(kind);
  let mut lines: Vec<MetricLine> = rows
    .iter()
    .map(|(label, key, f)| MetricLine { label: *label, value: fmt_value(metrics.num(key), *f) })
    .collect();

  let has_length_row = rows.iter().any(|(label, _, _)| *label == "Prompt Length");
  if !has_length_row {
    let length = total_prompt_length
      .map(|n| n as f64)
      .or_else(|| metrics.num("prompt_length"));
    if let Some(n) = length {
      lines.push(MetricLine { label: "Prompt Length", value: fmt_value(Some(n), Fmt::Chars) });
    }
  }

  MetricPanel { title, lines }
}

/// Verdict badge on an example card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quality {
  WellDone,
  CouldImprove,
  Good,
  NeedsImprovement,
}

impl Quality {
  pub fn label(self) -> &'static str {
    match self {
      Quality::WellDone => "Well done ✓",
      Quality::CouldImprove => "Could be improved ⚠️",
      Quality::Good => "Good ✓",
      Quality::NeedsImprovement => "Needs improvement ✗",
    }
  }

  fn from_score(score: f64) -> Self {
    if score >= 80.0 {
      Quality::WellDone
    } else if score >= 60.0 {
      Quality::CouldImprove
    } else {
      Quality::NeedsImprovement
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExampleCard {
  Scored {
    index: usize,
    input: String,
    expected: String,
    model_output: String,
    processed_output: Option<String>,
    score_lines: Vec<String>,
    quality: Quality,
    explanation: Option<String>,
  },
  Complex {
    task: String,
    reference: String,
    model_output: String,
    explanation: Option<String>,
  },
}

fn value_text(v: Option<&Value>) -> String {
  match v {
    Some(Value::String(s)) => s.clone(),
    Some(Value::Null) | None => String::new(),
    Some(other) => other.to_string(),
  }
}

fn score_lines(kind: DatasetKind, ex: &ExampleResult) -> Vec<String> {
  let mut lines = Vec::new();
  let mut push = |label: &str, v: Option<f64>, suffix: &str, decimals: Option<usize>| {
    if let Some(v) = v {
      let n = match decimals {
        Some(dp) => format!("{:.*}", dp, v),
        None => plain_number(v),
      };
      lines.push(format!("{label}: {n}{suffix}"));
    }
  };
  match kind {
    DatasetKind::TranslationTask => {
      push("Final Score", Some(ex.num("final_score").unwrap_or(0.0)), "%", Some(1));
      push("Semantic Score", Some(ex.num("semantic_score").unwrap_or(0.0)), "%", Some(1));
      push("Quality Score", Some(ex.num("quality_score").unwrap_or(0.0)), "%", Some(1));
      push("Efficiency", Some(ex.num("efficiency").unwrap_or(0.0)), "%", Some(1));
    }
    DatasetKind::TextSummarization => {
      push("Final Score", ex.score("similarity"), "%", None);
      push("Length Penalty", ex.score("length_penalty"), "%", None);
      push("Actual Length", ex.num("actual_length"), "", None);
      push("Expected Length", ex.num("expected_length"), "", None);
    }
    DatasetKind::WordSorting => {
      push("Final Score", ex.score("final_score"), "%", None);
      push("Word Accuracy", ex.score("word_accuracy"), "%", None);
      let distance = ex.score("word_order_distance").or_else(|| ex.num("word_order_distance"));
      push("Word Order Distance", distance, "", Some(2));
      push("Efficiency", ex.score("efficiency"), "%", None);
    }
    DatasetKind::CausalJudgement => {
      push("Final Score", ex.score("final_score"), "%", None);
      push("Base Accuracy", ex.score("base_accuracy"), "%", None);
      push("Efficiency", ex.score("efficiency"), "%", None);
    }
    DatasetKind::LogicalDeduction | DatasetKind::ComplexTransformation => {}
  }
  lines
}

fn quality(kind: DatasetKind, ex: &ExampleResult) -> Quality {
  match kind {
    DatasetKind::TranslationTask => Quality::from_score(ex.num("final_score").unwrap_or(0.0)),
    DatasetKind::TextSummarization => Quality::from_score(ex.score("similarity").unwrap_or(0.0)),
    _ => {
      if ex.is_correct.unwrap_or(false) { Quality::Good } else { Quality::NeedsImprovement }
    }
  }
}

/// Example cards for a response, one per returned example.
pub fn example_cards(kind: DatasetKind, examples: &[ExampleResult]) -> Vec<ExampleCard> {
  examples
    .iter()
    .enumerate()
    .map(|(i, ex)| {
      let model_output = ex
        .output()
        .or(ex.model_output.as_deref().filter(|s| !s.is_empty()))
        .unwrap_or("No response")
        .to_string();

      if kind == DatasetKind::ComplexTransformation {
        return ExampleCard::Complex {
          task: ex.task_description.clone().unwrap_or_default(),
          reference: ex.reference_solution.clone().unwrap_or_default(),
          model_output,
          explanation: ex.explanation.clone(),
        };
      }

      let processed_output = if kind == DatasetKind::WordSorting {
        ex.processed_prediction.clone()
      } else {
        None
      };
      // Only translation shows the evaluator's explanation on regular cards.
      let explanation = if kind == DatasetKind::TranslationTask { ex.explanation.clone() } else { None };

      ExampleCard::Scored {
        index: i + 1,
        input: value_text(ex.input.as_ref()),
        expected: value_text(ex.expected.as_ref()),
        model_output,
        processed_output,
        score_lines: score_lines(kind, ex),
        quality: quality(kind, ex),
        explanation,
      }
    })
    .collect()
}

/// Everything shown once a submission has been scored.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultsView {
  pub dataset: DatasetKind,
  pub panel: Option<MetricPanel>,
  pub examples: Vec<ExampleCard>,
}

pub fn results_view(kind: DatasetKind, resp: &ScoreResponse, total_prompt_length: Option<usize>) -> ResultsView {
  let panel = resp
    .metrics
    .as_ref()
    .filter(|_| resp.has_metrics())
    .map(|m| metric_panel(kind, m, total_prompt_length));
  ResultsView { dataset: kind, panel, examples: example_cards(kind, &resp.examples) }
}
