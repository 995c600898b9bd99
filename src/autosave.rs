//! Debounced saving of in-progress edits.
//!
//! Editors call [`Autosave::record`] on every keystroke and
//! [`Autosave::tick`] from their event loop; a save only happens once the
//! user has been idle for the quiet period, so bursts of edits collapse into
//! a single [`NoteStore::save_draft`] call.

use std::time::{Duration, Instant};

use crate::db::KeyValueStore;
use crate::models::NoteId;
use crate::store::{NoteStore, StoreError};

/// Default idle time before pending edits are saved.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(1);

/// Coalesces a stream of values, releasing only the latest one after a
/// quiet period with no new values.
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// Creates a debouncer with the given quiet period.
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Records a new value, replacing any pending one and restarting the
    /// quiet period.
    pub fn push(&mut self, value: T) {
        self.push_at(value, Instant::now());
    }

    /// Same as [`push`](Self::push) with an explicit timestamp.
    pub fn push_at(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Returns the pending value without taking it.
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(value, _)| value)
    }

    /// Returns whether a value is waiting.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Takes the pending value if the quiet period has elapsed at `now`.
    pub fn take_ready(&mut self, now: Instant) -> Option<T> {
        let ready = matches!(
            &self.pending,
            Some((_, changed_at)) if now.saturating_duration_since(*changed_at) >= self.quiet
        );
        if ready {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    /// Takes the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }
}

/// Unsaved title and content for one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub note_id: NoteId,
    pub title: String,
    pub content: String,
}

/// Saves editor drafts through the note store after a quiet period.
#[derive(Debug)]
pub struct Autosave {
    debouncer: Debouncer<Draft>,
}

impl Autosave {
    /// Creates an autosaver with the given quiet period.
    pub fn new(quiet: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(quiet),
        }
    }

    /// Records the latest editor state.
    ///
    /// When a draft for a different note is still pending it is returned so
    /// the caller can save it right away instead of losing it.
    pub fn record(&mut self, draft: Draft) -> Option<Draft> {
        self.record_at(draft, Instant::now())
    }

    /// Same as [`record`](Self::record) with an explicit timestamp.
    pub fn record_at(&mut self, draft: Draft, now: Instant) -> Option<Draft> {
        let switching = self
            .debouncer
            .pending()
            .is_some_and(|pending| pending.note_id != draft.note_id);
        let displaced = if switching {
            self.debouncer.flush()
        } else {
            None
        };
        self.debouncer.push_at(draft, now);
        displaced
    }

    /// Returns whether unsaved edits are waiting.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Saves the pending draft if the quiet period has elapsed.
    ///
    /// Returns whether the store changed.
    pub fn tick<S: KeyValueStore>(
        &mut self,
        store: &mut NoteStore<S>,
        now: Instant,
    ) -> Result<bool, StoreError> {
        match self.debouncer.take_ready(now) {
            Some(draft) => save(store, &draft),
            None => Ok(false),
        }
    }

    /// Saves any pending draft immediately, e.g. before switching notes or
    /// shutting down.
    pub fn flush<S: KeyValueStore>(
        &mut self,
        store: &mut NoteStore<S>,
    ) -> Result<bool, StoreError> {
        match self.debouncer.flush() {
            Some(draft) => save(store, &draft),
            None => Ok(false),
        }
    }
}

impl Default for Autosave {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

/// Writes a draft through the store. Drafts for deleted notes are dropped.
pub fn save<S: KeyValueStore>(
    store: &mut NoteStore<S>,
    draft: &Draft,
) -> Result<bool, StoreError> {
    let saved = store.save_draft(&draft.note_id, &draft.title, &draft.content)?;
    if saved {
        tracing::debug!(id = %draft.note_id, "autosaved draft");
    }
    Ok(saved)
}
