use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Number of most-recent outcomes kept in the in-memory history window.
pub const HISTORY_WINDOW: usize = 20;

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum TallyError {
    #[error("index {index} is out of range for a history of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Outcome {
    A,
    B,
}

impl Outcome {
    #[must_use]
    pub fn from_bool(value: bool) -> Self {
        if value {
            Self::B
        } else {
            Self::A
        }
    }

    #[must_use]
    pub fn as_bool(self) -> bool {
        matches!(self, Self::B)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }

    /// Exact-case label match; anything other than "A" or "B" is unrecognized.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            _ => None,
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct OutcomeRecord {
    pub id: i64,
    pub value: Outcome,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionState {
    #[default]
    Idle,
    Selected {
        index: usize,
    },
}

impl CorrectionState {
    #[must_use]
    pub fn is_selected(self) -> bool {
        matches!(self, Self::Selected { .. })
    }

    #[must_use]
    pub fn selected_index(self) -> Option<usize> {
        match self {
            Self::Idle => None,
            Self::Selected { index } => Some(index),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Selected { .. } => "selected",
        }
    }
}

/// Bounded mirror of the store's most-recent window, oldest entry first.
///
/// The window is a view over the store, not a source of truth: it is rebuilt
/// from an ascending `load_recent` result on startup and on reconciliation,
/// and it never holds more than [`HISTORY_WINDOW`] entries.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct HistoryWindow {
    entries: VecDeque<Outcome>,
}

impl HistoryWindow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records already in ascending id order. Only the newest
    /// [`HISTORY_WINDOW`] values are retained.
    #[must_use]
    pub fn from_records(records: &[OutcomeRecord]) -> Self {
        let mut window = Self::new();
        for record in records {
            window.push(record.value);
        }
        window
    }

    /// Append a value, evicting the oldest entry once the window is full.
    pub fn push(&mut self, value: Outcome) {
        self.entries.push_back(value);
        while self.entries.len() > HISTORY_WINDOW {
            self.entries.pop_front();
        }
    }

    /// Overwrite the entry at `index`.
    ///
    /// # Errors
    /// Returns [`TallyError::IndexOutOfRange`] when `index` is past the end.
    pub fn replace(&mut self, index: usize, value: Outcome) -> Result<(), TallyError> {
        let len = self.entries.len();
        match self.entries.get_mut(index) {
            Some(entry) => {
                *entry = value;
                Ok(())
            }
            None => Err(TallyError::IndexOutOfRange { index, len }),
        }
    }

    /// Remove and return the entry at `index`.
    ///
    /// # Errors
    /// Returns [`TallyError::IndexOutOfRange`] when `index` is past the end.
    pub fn remove(&mut self, index: usize) -> Result<Outcome, TallyError> {
        let len = self.entries.len();
        self.entries
            .remove(index)
            .ok_or(TallyError::IndexOutOfRange { index, len })
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Outcome> {
        self.entries.get(index).copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<Outcome> {
        self.entries.back().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Outcome> + '_ {
        self.entries.iter().copied()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Outcome> {
        self.entries.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_label_mapping_round_trips() {
        assert_eq!(Outcome::from_bool(true), Outcome::B);
        assert_eq!(Outcome::from_bool(false), Outcome::A);
        assert!(Outcome::B.as_bool());
        assert!(!Outcome::A.as_bool());
        assert_eq!(Outcome::A.as_str(), "A");
        assert_eq!(Outcome::B.as_str(), "B");
        assert_eq!(Outcome::parse("A"), Some(Outcome::A));
        assert_eq!(Outcome::parse("B"), Some(Outcome::B));
        assert_eq!(Outcome::B.to_string(), "B");
    }

    #[test]
    fn outcome_parse_is_exact_case_only() {
        for input in ["", "a", "b", "AB", " A", "B ", "ab"] {
            assert_eq!(Outcome::parse(input), None, "input {input:?}");
        }
    }

    #[test]
    fn window_push_keeps_only_newest_entries() {
        let mut window = HistoryWindow::new();
        for round in 0..HISTORY_WINDOW + 5 {
            window.push(Outcome::from_bool(round % 2 == 0));
        }

        assert_eq!(window.len(), HISTORY_WINDOW);
        // Rounds 0..=4 were evicted, so the window now starts at round 5.
        assert_eq!(window.get(0), Some(Outcome::from_bool(5 % 2 == 0)));
        assert_eq!(window.last(), Some(Outcome::from_bool((HISTORY_WINDOW + 4) % 2 == 0)));
    }

    #[test]
    fn window_from_records_keeps_ascending_values() {
        let records = [
            OutcomeRecord {
                id: 5,
                value: Outcome::A,
            },
            OutcomeRecord {
                id: 6,
                value: Outcome::B,
            },
        ];

        let window = HistoryWindow::from_records(&records);
        assert_eq!(window.to_vec(), vec![Outcome::A, Outcome::B]);
    }

    #[test]
    fn window_from_records_truncates_to_capacity() {
        let records: Vec<OutcomeRecord> = (1..=30)
            .map(|id| OutcomeRecord {
                id,
                value: Outcome::from_bool(id % 2 == 0),
            })
            .collect();

        let window = HistoryWindow::from_records(&records);
        assert_eq!(window.len(), HISTORY_WINDOW);
        // Ids 1..=10 fell out of the window; the first retained id is 11.
        assert_eq!(window.get(0), Some(Outcome::from_bool(11 % 2 == 0)));
    }

    #[test]
    fn window_replace_overwrites_in_place() {
        let mut window = HistoryWindow::new();
        window.push(Outcome::A);
        window.push(Outcome::B);

        assert_eq!(window.replace(0, Outcome::B), Ok(()));
        assert_eq!(window.to_vec(), vec![Outcome::B, Outcome::B]);
    }

    #[test]
    fn window_positional_ops_reject_out_of_range_index() {
        let mut window = HistoryWindow::new();
        window.push(Outcome::A);

        assert_eq!(
            window.replace(1, Outcome::B),
            Err(TallyError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(
            window.remove(3),
            Err(TallyError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert_eq!(window.to_vec(), vec![Outcome::A]);
    }

    #[test]
    fn window_remove_returns_removed_entry() {
        let mut window = HistoryWindow::new();
        window.push(Outcome::A);
        window.push(Outcome::B);

        assert_eq!(window.remove(0), Ok(Outcome::A));
        assert_eq!(window.to_vec(), vec![Outcome::B]);
        assert_eq!(window.remove(0), Ok(Outcome::B));
        assert!(window.is_empty());
    }

    #[test]
    fn correction_state_reports_selection() {
        assert!(!CorrectionState::Idle.is_selected());
        assert_eq!(CorrectionState::Idle.selected_index(), None);
        assert_eq!(CorrectionState::Idle.as_str(), "idle");

        let selected = CorrectionState::Selected { index: 3 };
        assert!(selected.is_selected());
        assert_eq!(selected.selected_index(), Some(3));
        assert_eq!(selected.as_str(), "selected");
    }
}
