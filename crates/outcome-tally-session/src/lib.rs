mod draw;
mod executor;

use std::path::Path;

use outcome_tally_core::{CorrectionState, HISTORY_WINDOW, HistoryWindow, Outcome, TallyError};
use outcome_tally_store_sqlite::SqliteTallyStore;

pub use draw::{DrawSource, ScriptedDraw, UniformDraw};
pub use executor::{ExecutorError, StoreExecutor};

/// Single entry point for the presentation layer: owns the history window,
/// the current outcome, the correction workflow state, and the async handle
/// to the persistent store.
///
/// Storage failures never surface as errors here. Every one is logged and
/// absorbed; the in-memory state keeps working and `reconcile` is the repair
/// path for any resulting drift. The only `Err` the contract returns is an
/// out-of-range index, which is a caller bug rather than a storage failure.
pub struct OutcomeSession {
    store: Option<StoreExecutor>,
    history: HistoryWindow,
    current: Option<Outcome>,
    correction: CorrectionState,
    draws: Box<dyn DrawSource + Send>,
}

impl OutcomeSession {
    /// Open the session against the database at `db_path` with a uniform
    /// random draw source.
    ///
    /// When the database cannot be opened the session still works, holding
    /// history in memory only; the failure is logged.
    #[must_use]
    pub fn open(db_path: &Path) -> Self {
        Self::with_draw_source(db_path, Box::new(UniformDraw::new()))
    }

    /// Like [`OutcomeSession::open`] with an explicit draw source, e.g. a
    /// [`ScriptedDraw`] for reproducible sequences.
    #[must_use]
    pub fn with_draw_source(db_path: &Path, draws: Box<dyn DrawSource + Send>) -> Self {
        let store = match SqliteTallyStore::open(db_path) {
            Ok(store) => Some(StoreExecutor::new(store)),
            Err(err) => {
                tracing::warn!(
                    "Failed to open outcome store at {}: {}; continuing without persistence",
                    db_path.display(),
                    err
                );
                None
            }
        };

        Self {
            store,
            history: HistoryWindow::new(),
            current: None,
            correction: CorrectionState::Idle,
            draws,
        }
    }

    /// Ensure the schema exists and load the recent window into the history.
    /// Failures are logged and non-fatal; the session starts with an empty
    /// history in that case.
    pub async fn initialize(&mut self) {
        if let Some(store) = &self.store {
            if let Err(err) = store.run(|store| store.ensure_schema()).await {
                tracing::warn!("Failed to ensure outcome schema: {}", err);
            }
        }
        self.reconcile().await;
    }

    /// Draw the next outcome, make it current, append it to the history, and
    /// persist it.
    ///
    /// The in-memory state advances before the insert is awaited, so a failed
    /// insert leaves history and store diverged until the next reconcile
    /// (accepted optimistic policy). Any pending correction selection is
    /// cleared.
    pub async fn predict_next(&mut self) -> Outcome {
        let value = self.draws.next_draw();
        self.current = Some(value);
        self.history.push(value);
        self.correction = CorrectionState::Idle;

        if let Some(store) = &self.store {
            match store.run(move |store| store.insert(value)).await {
                Ok(id) => tracing::debug!("Persisted outcome {} as row {}", value, id),
                Err(err) => {
                    tracing::warn!(
                        "Failed to persist outcome {}: {}; history and store diverge until reconcile",
                        value,
                        err
                    );
                }
            }
        }

        value
    }

    /// Select the history entry at `index` for correction and return its
    /// value as the edit prefill.
    ///
    /// # Errors
    /// Returns [`TallyError::IndexOutOfRange`] when `index` is past the end
    /// of the history.
    pub fn select(&mut self, index: usize) -> Result<Outcome, TallyError> {
        let prefill = self.history.get(index).ok_or(TallyError::IndexOutOfRange {
            index,
            len: self.history.len(),
        })?;
        self.correction = CorrectionState::Selected { index };
        Ok(prefill)
    }

    /// Commit a correction with the given label input.
    ///
    /// Returns `Some(applied)` when the store row was rewritten and the
    /// history entry replaced; the workflow returns to idle and the applied
    /// value becomes the current outcome. Returns `None` when the commit was
    /// a no-op: nothing selected, an unrecognized label, no store, an empty
    /// table, or a failed mutation. The selection is kept in the no-op cases
    /// so the caller may retry or cancel.
    pub async fn commit(&mut self, input: &str) -> Option<Outcome> {
        let CorrectionState::Selected { index } = self.correction else {
            tracing::debug!("Commit without a selected entry; ignoring");
            return None;
        };

        let Some(value) = Outcome::parse(input) else {
            tracing::debug!("Unrecognized correction input {:?}; staying selected", input);
            return None;
        };

        let Some(store) = &self.store else {
            tracing::warn!("No store available; correction not applied");
            return None;
        };

        let record = match store.run(|store| store.most_recent()).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("No outcome row to correct; staying selected");
                return None;
            }
            Err(err) => {
                tracing::warn!("Failed to look up newest outcome: {}", err);
                return None;
            }
        };

        // The rewritten row is always the newest physical row, which matches
        // the selected index only when the newest entry is selected.
        match store.run(move |store| store.update_value(record.id, value)).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("Outcome row {} disappeared before correction", record.id);
                return None;
            }
            Err(err) => {
                tracing::warn!("Failed to correct outcome row {}: {}", record.id, err);
                return None;
            }
        }

        if let Err(err) = self.history.replace(index, value) {
            tracing::warn!("Corrected row {} but history index was stale: {}", record.id, err);
        }
        self.current = Some(value);
        self.correction = CorrectionState::Idle;
        Some(value)
    }

    /// Leave the correction workflow without mutating anything.
    pub fn cancel(&mut self) {
        self.correction = CorrectionState::Idle;
    }

    /// Delete the newest store row and remove the history entry at `index`.
    ///
    /// The history entry is only removed once the store confirms a row was
    /// deleted; with no matching row (or no store) the history is left
    /// unchanged and the no-op is logged.
    ///
    /// # Errors
    /// Returns [`TallyError::IndexOutOfRange`] when `index` is past the end
    /// of the history.
    pub async fn delete_selected(&mut self, index: usize) -> Result<(), TallyError> {
        let len = self.history.len();
        if index >= len {
            return Err(TallyError::IndexOutOfRange { index, len });
        }

        let Some(store) = &self.store else {
            tracing::warn!("No store available; delete not applied");
            return Ok(());
        };

        let record = match store.run(|store| store.most_recent()).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("No outcome row to delete");
                return Ok(());
            }
            Err(err) => {
                tracing::warn!("Failed to look up newest outcome: {}", err);
                return Ok(());
            }
        };

        // The deleted row is always the newest physical row, which matches
        // the removed index only when the newest entry is selected.
        match store.run(move |store| store.delete_by_id(record.id)).await {
            Ok(true) => {
                if let Err(err) = self.history.remove(index) {
                    tracing::warn!(
                        "Deleted row {} but history index was stale: {}",
                        record.id,
                        err
                    );
                }
            }
            Ok(false) => tracing::debug!("Outcome row {} was already gone", record.id),
            Err(err) => tracing::warn!("Failed to delete outcome row {}: {}", record.id, err),
        }

        Ok(())
    }

    /// Rebuild the history from the store's recent window, clearing any
    /// pending selection. With no store (or a failed reload) the current
    /// history is kept.
    pub async fn reconcile(&mut self) {
        // Window contents may shift arbitrarily, so a pending selection index
        // is invalidated up front.
        self.correction = CorrectionState::Idle;

        let Some(store) = &self.store else {
            tracing::debug!("No store available; keeping in-memory history");
            return;
        };

        match store.run(|store| store.load_recent(HISTORY_WINDOW)).await {
            Ok(records) => self.history = HistoryWindow::from_records(&records),
            Err(err) => tracing::warn!("Failed to reload recent outcomes: {}", err),
        }
    }

    #[must_use]
    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    #[must_use]
    pub fn current_outcome(&self) -> Option<Outcome> {
        self.current
    }

    #[must_use]
    pub fn correction_state(&self) -> CorrectionState {
        self.correction
    }

    #[must_use]
    pub fn selected_index(&self) -> Option<usize> {
        self.correction.selected_index()
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }
}
