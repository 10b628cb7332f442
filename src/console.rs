//! Line-oriented front end. Each input line is parsed into a `Command`, dispatched
//! against the `Workbench`, and answered with one block of text on stdout.

use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, instrument, warn};

use crate::domain::{DatasetKind, Mode};
use crate::error::SessionError;
use crate::leaderboard::CATEGORIES;
use crate::render;
use crate::workbench::Workbench;

pub const HELP: &str = "\
Commands:
  datasets                 list datasets and languages
  use <dataset>            select a dataset (resets both sessions)
  lang <code>              pick the translation target language
  name <name>              set your name for test submissions
  practice <prompt>        submit a practice prompt for the current turn
  test <prompt>            submit a named test prompt for the current turn
  history [practice|test]  show the session state and output history
  board <category>         show a leaderboard
  sort <column>            sort the current leaderboard by a column
  help                     this text
  quit                     exit
";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
  Datasets,
  Use(Option<DatasetKind>),
  Lang(String),
  Name(String),
  Submit { mode: Mode, prompt: String },
  History(Mode),
  Board(String),
  Sort(String),
  Help,
  Quit,
}

/// Parse one input line. `Ok(None)` for blank lines.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
  let line = line.trim();
  if line.is_empty() {
    return Ok(None);
  }
  let (head, rest) = match line.split_once(char::is_whitespace) {
    Some((h, r)) => (h, r.trim()),
    None => (line, ""),
  };
  let need = |what: &str| if rest.is_empty() { Err(format!("usage: {head} <{what}>")) } else { Ok(rest.to_string()) };

  let cmd = match head.to_ascii_lowercase().as_str() {
    "datasets" => Command::Datasets,
    "use" => match rest {
      "" | "none" => Command::Use(None),
      key => Command::Use(Some(key.parse::<DatasetKind>()?)),
    },
    "lang" => Command::Lang(need("code")?),
    "name" => Command::Name(need("name")?),
    // Empty prompts still go to the controller, which owns that validation.
    "practice" => Command::Submit { mode: Mode::Practice, prompt: rest.to_string() },
    "test" => Command::Submit { mode: Mode::Test, prompt: rest.to_string() },
    "history" => match rest {
      "" | "practice" => Command::History(Mode::Practice),
      "test" => Command::History(Mode::Test),
      other => return Err(format!("unknown mode: {other}")),
    },
    "board" => Command::Board(need("category")?),
    "sort" => Command::Sort(need("column")?),
    "help" | "?" => Command::Help,
    "quit" | "exit" => Command::Quit,
    other => return Err(format!("unknown command: {other} (try 'help')")),
  };
  Ok(Some(cmd))
}

/// Run one command. Returns the text to show; errors are rendered, not returned.
#[instrument(level = "debug", skip(wb, cmd))]
pub async fn dispatch(wb: &mut Workbench, cmd: Command) -> String {
  match cmd {
    Command::Datasets => render::datasets(wb.dataset()),

    Command::Use(dataset) => {
      let sel = wb.select_dataset(dataset).await;
      let mut out = String::new();
      if let Some(view) = &sel.instructions {
        out.push_str(&render::instructions(view));
      }
      if let Some(ex) = &sel.practice_example {
        out.push_str(&format!("Practice task: {}\n", ex.task_description));
      }
      if let Some(ex) = &sel.test_example {
        out.push_str(&format!("Test task: {}\n", ex.task_description));
      }
      out.push_str(&render::session(&wb.practice().view().await));
      out
    }

    Command::Lang(code) => match wb.set_target_language(&code).await {
      Ok(view) => {
        let mut out = render::language(&code);
        if let Some(view) = view {
          out.push_str(&render::instructions(&view));
        }
        out
      }
      Err(e) => format!("{e}\n"),
    },

    Command::Name(name) => {
      wb.set_name(&name).await;
      format!("Name set to {}\n", name.trim())
    }

    Command::Submit { mode, prompt } => {
      let controller = wb.controller(mode);
      match controller.submit(&prompt).await {
        Ok(outcome) => {
          let mut out = render::outcome(&outcome);
          out.push_str(&render::session(&controller.view().await));
          out
        }
        Err(e) => submit_error(e),
      }
    }

    Command::History(mode) => {
      let controller = wb.controller(mode);
      controller.poll_reset().await;
      let view = controller.view().await;
      let mut out = render::session(&view);
      if let Some(report) = &view.last_report {
        out.push_str(&render::final_report(report));
      }
      out
    }

    Command::Board(category) => {
      let result = wb.leaderboard_mut().select_category(&category).await;
      match result {
        Ok(view) => render::leaderboard(&view),
        Err(e) => {
          warn!(target: "leaderboard", %category, error = %e, "Leaderboard unavailable");
          let keys: Vec<&str> = CATEGORIES.iter().map(|k| k.key()).collect();
          // A transport failure still leaves an error view to show.
          let mut out = render::leaderboard(&wb.leaderboard().view());
          out.push_str(&format!("({e}; categories: {})\n", keys.join(", ")));
          out
        }
      }
    }

    Command::Sort(column) => render::leaderboard(&wb.leaderboard_mut().sort_by(&column)),

    Command::Help => HELP.to_string(),
    Command::Quit => String::new(),
  }
}

fn submit_error(e: SessionError) -> String {
  match e {
    SessionError::Validation(msg) => format!("{msg}\n"),
    SessionError::Transport(inner) => format!("Error: {inner}\n"),
    SessionError::Protocol(reason) => format!("Invalid response data: {reason}\n"),
    other => format!("{other}\n"),
  }
}

/// Read commands from stdin until `quit`, EOF or ctrl-c.
pub async fn run(mut wb: Workbench) -> io::Result<()> {
  let mut stdout = io::stdout();
  let mut lines = BufReader::new(io::stdin()).lines();

  if let Err(e) = wb.load_catalog().await {
    stdout.write_all(format!("Could not load dataset config: {e}\n").as_bytes()).await?;
  }
  stdout.write_all(HELP.as_bytes()).await?;

  loop {
    stdout.write_all(b"promptlab> ").await?;
    stdout.flush().await?;

    let line = tokio::select! {
      line = lines.next_line() => line?,
      _ = tokio::signal::ctrl_c() => {
        info!(target: "promptlab", "Interrupted");
        break;
      }
    };
    let Some(line) = line else { break };

    let cmd = match parse(&line) {
      Ok(Some(cmd)) => cmd,
      Ok(None) => continue,
      Err(msg) => {
        stdout.write_all(format!("{msg}\n").as_bytes()).await?;
        continue;
      }
    };
    debug!(target: "promptlab", ?cmd, "Command");
    if cmd == Command::Quit {
      break;
    }
    let out = dispatch(&mut wb, cmd).await;
    stdout.write_all(out.as_bytes()).await?;
  }
  stdout.write_all(b"\n").await?;
  stdout.flush().await
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_commands_with_arguments() {
    assert_eq!(parse("  ").unwrap(), None);
    assert_eq!(parse("use word_sorting").unwrap(), Some(Command::Use(Some(DatasetKind::WordSorting))));
    assert_eq!(parse("use none").unwrap(), Some(Command::Use(None)));
    assert_eq!(parse("lang pt").unwrap(), Some(Command::Lang("pt".into())));
    assert_eq!(
      parse("practice Sort the words  alphabetically").unwrap(),
      Some(Command::Submit { mode: Mode::Practice, prompt: "Sort the words  alphabetically".into() })
    );
    assert_eq!(parse("history test").unwrap(), Some(Command::History(Mode::Test)));
    assert_eq!(parse("HELP").unwrap(), Some(Command::Help));
  }

  #[test]
  fn rejects_bad_input() {
    assert!(parse("use poetry").is_err());
    assert!(parse("name").is_err());
    assert!(parse("history later").is_err());
    assert!(parse("dance").is_err());
  }

  #[test]
  fn bare_submit_keeps_empty_prompt() {
    assert_eq!(parse("test").unwrap(), Some(Command::Submit { mode: Mode::Test, prompt: String::new() }));
  }
}
