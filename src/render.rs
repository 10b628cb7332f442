//! Plain-text rendering of the view-models for the terminal front end.

use std::fmt::Write;

use crate::controller::{FinalReport, SessionView, TurnOutcome};
use crate::domain::{language_name, DatasetKind, LANGUAGES};
use crate::leaderboard::{LeaderboardBody, LeaderboardView, SortDirection, TableView};
use crate::metrics::{ExampleCard, ResultsView};
use crate::workbench::InstructionsView;

const RULE: &str = "----------------------------------------";

pub fn datasets(selected: Option<DatasetKind>) -> String {
  let mut out = String::from("Datasets:\n");
  for kind in DatasetKind::ALL {
    let mark = if Some(kind) == selected { "*" } else { " " };
    let turns = if kind.is_multi_turn() { " (multi-turn)" } else { "" };
    let _ = writeln!(out, " {mark} {}{turns}", kind.key());
  }
  out.push_str("Languages: ");
  let langs: Vec<String> = LANGUAGES.iter().map(|(c, n)| format!("{c}={n}")).collect();
  out.push_str(&langs.join(", "));
  out.push('\n');
  out
}

pub fn instructions(view: &InstructionsView) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "== {} ==", view.dataset);
  if !view.description.is_empty() {
    let _ = writeln!(out, "{}", view.description);
  }
  if !view.instructions.is_empty() {
    out.push_str("\nInstructions:\n");
    for line in &view.instructions {
      let _ = writeln!(out, "  - {line}");
    }
  }
  if !view.scoring.is_empty() {
    let _ = writeln!(out, "\nScoring: {}", view.scoring);
  }
  if let Some(ex) = &view.example {
    let _ = writeln!(out, "\nExample\n  Input:  {}\n  Output: {}", ex.input, ex.output);
  }
  out
}

pub fn session(view: &SessionView) -> String {
  let mut out = String::new();
  let dataset = view.dataset.map(|d| d.key()).unwrap_or("(none)");
  let _ = write!(out, "[{}] dataset: {dataset}", view.mode);
  if view.max_turns > 1 {
    let _ = write!(out, "  turn {}/{}", view.turn, view.max_turns);
  }
  if view.busy {
    out.push_str("  (processing...)");
  }
  if view.finalized {
    out.push_str("  (finished)");
  }
  out.push('\n');

  if let Some(ex) = &view.example {
    let _ = writeln!(out, "Task: {}", ex.task_description);
    if !ex.display_reference.is_empty() {
      let _ = writeln!(out, "Reference: {}", ex.display_reference);
    }
  }
  if !view.history.is_empty() {
    out.push_str("Output history:\n");
    for h in &view.history {
      let _ = writeln!(out, "  Turn {}: {}", h.turn, h.output);
    }
  }
  if view.input_visible {
    let _ = writeln!(out, "> {}", view.placeholder);
  }
  out
}

pub fn outcome(outcome: &TurnOutcome) -> String {
  match outcome {
    TurnOutcome::Advanced { completed_turn, next_turn, output } => {
      format!("Turn {completed_turn} output:\n  {output}\nReady for turn {next_turn}.\n")
    }
    TurnOutcome::Finalized(report) => final_report(report),
  }
}

pub fn final_report(report: &FinalReport) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{RULE}\n{} results: {}", report.mode, report.dataset);
  if report.dataset.is_multi_turn() {
    for (i, o) in report.outputs.iter().enumerate() {
      let _ = writeln!(out, "  Turn {}: {o}", i + 1);
    }
  }
  out.push_str(&results(&report.results));
  if let Some(delay) = report.resets_after {
    let _ = writeln!(out, "(session resets in {}s)", delay.as_secs_f32());
  }
  out
}

pub fn results(view: &ResultsView) -> String {
  let mut out = String::new();
  match &view.panel {
    Some(panel) => {
      let _ = writeln!(out, "{}", panel.title);
      let width = panel.lines.iter().map(|l| l.label.len()).max().unwrap_or(0);
      for line in &panel.lines {
        let _ = writeln!(out, "  {:<width$}  {}", line.label, line.value);
      }
    }
    None => out.push_str("No metrics returned.\n"),
  }

  for card in &view.examples {
    out.push_str(RULE);
    out.push('\n');
    match card {
      ExampleCard::Scored { index, input, expected, model_output, processed_output, score_lines, quality, explanation } => {
        let _ = writeln!(out, "Example {index}  [{}]", quality.label());
        let _ = writeln!(out, "  Input:    {input}");
        let _ = writeln!(out, "  Expected: {expected}");
        let _ = writeln!(out, "  Output:   {model_output}");
        if let Some(p) = processed_output {
          let _ = writeln!(out, "  Processed: {p}");
        }
        for s in score_lines {
          let _ = writeln!(out, "  {s}");
        }
        if let Some(e) = explanation {
          let _ = writeln!(out, "  Explanation: {e}");
        }
      }
      ExampleCard::Complex { task, reference, model_output, explanation } => {
        let _ = writeln!(out, "Task: {task}");
        let _ = writeln!(out, "Reference solution: {reference}");
        let _ = writeln!(out, "Your output: {model_output}");
        if let Some(e) = explanation {
          let _ = writeln!(out, "Evaluation details: {e}");
        }
      }
    }
  }
  out
}

pub fn leaderboard(view: &LeaderboardView) -> String {
  let mut out = format!("{}\n", view.title);
  match &view.body {
    LeaderboardBody::Loading => out.push_str("Loading...\n"),
    LeaderboardBody::Empty => out.push_str("No entries yet for this category.\n"),
    LeaderboardBody::Error(msg) => {
      let _ = writeln!(out, "{msg}. Please try again later.");
    }
    LeaderboardBody::Table(table) => out.push_str(&table_text(table)),
  }
  out
}

fn table_text(table: &TableView) -> String {
  let header: Vec<String> = table
    .headers
    .iter()
    .map(|h| match h.sort {
      Some(SortDirection::Asc) => format!("{} ▲", h.label),
      Some(SortDirection::Desc) => format!("{} ▼", h.label),
      None => h.label.to_string(),
    })
    .collect();

  let cells: Vec<Vec<String>> = table
    .rows
    .iter()
    .map(|row| {
      row
        .iter()
        .map(|c| match c.medal {
          Some(m) => format!("{} {}", m.marker(), c.text),
          None => c.text.clone(),
        })
        .collect()
    })
    .collect();

  let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
  for row in &cells {
    for (i, c) in row.iter().enumerate() {
      if let Some(w) = widths.get_mut(i) {
        *w = (*w).max(c.chars().count());
      }
    }
  }

  let mut out = String::new();
  let _ = writeln!(
    out,
    "Entries: {}   Average: {}   Top: {}",
    table.stats.total_entries, table.stats.average_score, table.stats.top_score
  );
  out.push_str(&line(&header, &widths));
  for row in &cells {
    out.push_str(&line(row, &widths));
  }
  out
}

fn line(cells: &[String], widths: &[usize]) -> String {
  let padded: Vec<String> = cells
    .iter()
    .zip(widths)
    .map(|(c, w)| {
      let pad = w.saturating_sub(c.chars().count());
      format!("{c}{}", " ".repeat(pad))
    })
    .collect();
  format!("{}\n", padded.join(" | ").trim_end())
}

pub fn language(code: &str) -> String {
  format!("Target language: {} ({code})\n", language_name(code))
}
