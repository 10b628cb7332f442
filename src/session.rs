//! Per-mode session state for the turn-based exercise.
//!
//! A `Session` is owned by exactly one controller. It only changes when a
//! submission completes successfully, when the dataset changes, or when a
//! finalized session resets.

use crate::domain::DatasetKind;

/// Where a session is in its turn sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    /// Waiting for the prompt of the given 1-indexed turn.
    AwaitingInput(u8),
    /// Last turn completed; final results are on screen.
    Finalized,
}

/// One completed turn, as shown in the output history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub turn: u8,
    pub output: String,
}

#[derive(Clone, Debug)]
pub struct Session {
    dataset: Option<DatasetKind>,
    max_turns: u8,
    phase: TurnPhase,
    outputs: Vec<Option<String>>,
    prompt_lengths: Vec<Option<usize>>,
    /// Bumped on every reset so late responses can be recognized and dropped.
    epoch: u64,
}

impl Session {
    pub fn new(dataset: Option<DatasetKind>, max_turns: u8) -> Self {
        Self {
            dataset,
            max_turns: max_turns.max(1),
            phase: TurnPhase::AwaitingInput(1),
            outputs: Vec::new(),
            prompt_lengths: Vec::new(),
            epoch: 0,
        }
    }

    pub fn dataset(&self) -> Option<DatasetKind> {
        self.dataset
    }

    pub fn max_turns(&self) -> u8 {
        self.max_turns
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Current turn; a finalized session reports its last turn.
    pub fn turn(&self) -> u8 {
        match self.phase {
            TurnPhase::AwaitingInput(t) => t,
            TurnPhase::Finalized => self.max_turns,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == TurnPhase::Finalized
    }

    /// Change dataset: always back to turn 1 with empty history.
    pub fn select_dataset(&mut self, dataset: Option<DatasetKind>, max_turns: u8) {
        self.dataset = dataset;
        self.max_turns = max_turns.max(1);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.phase = TurnPhase::AwaitingInput(1);
        self.outputs.clear();
        self.prompt_lengths.clear();
        self.epoch += 1;
    }

    /// Output forwarded as context for the current turn: only the one right before it.
    pub fn previous_output(&self) -> Option<&str> {
        let turn = self.turn() as usize;
        if turn < 2 {
            return None;
        }
        self.outputs.get(turn - 2).and_then(|o| o.as_deref())
    }

    /// Store a completed turn's output and prompt length, then advance.
    /// Returns the phase the session moved to.
    pub fn record_turn(&mut self, output: Option<String>, prompt_len: usize) -> TurnPhase {
        let TurnPhase::AwaitingInput(turn) = self.phase else {
            return self.phase;
        };
        let slot = (turn - 1) as usize;
        if self.outputs.len() <= slot {
            self.outputs.resize(slot + 1, None);
            self.prompt_lengths.resize(slot + 1, None);
        }
        self.outputs[slot] = output;
        self.prompt_lengths[slot] = Some(prompt_len);

        self.phase = if turn >= self.max_turns {
            TurnPhase::Finalized
        } else {
            TurnPhase::AwaitingInput(turn + 1)
        };
        self.phase
    }

    /// One entry per completed turn, parallel to `prompt_lengths`.
    /// A turn that produced no output shows as an empty string.
    pub fn outputs(&self) -> Vec<String> {
        self.outputs.iter().map(|o| o.clone().unwrap_or_default()).collect()
    }

    pub fn prompt_lengths(&self) -> Vec<usize> {
        self.prompt_lengths.iter().map(|l| l.unwrap_or(0)).collect()
    }

    pub fn total_prompt_length(&self) -> usize {
        self.prompt_lengths.iter().flatten().sum()
    }

    /// Completed turns in order, skipping slots without output.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.outputs
            .iter()
            .enumerate()
            .filter_map(|(i, o)| {
                o.as_ref().map(|output| HistoryEntry {
                    turn: (i + 1) as u8,
                    output: output.clone(),
                })
            })
            .collect()
    }
}
