use thiserror::Error;
use time::OffsetDateTime;

use crate::db::{KeyValueStore, StorageError};
use crate::models::{Note, NoteId, UNTITLED_NOTE, merge_tags};

/// Key under which the whole note collection is persisted.
pub const STORAGE_KEY: &str = "ai-notes";

/// Errors raised while persisting the note collection.
///
/// The in-memory collection has already been updated when one of these is
/// returned; only the durable copy is stale.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing the collection to durable storage failed.
    #[error("Failed to persist notes: {0}")]
    Storage(#[from] StorageError),

    /// Encoding the collection failed.
    #[error("Failed to encode notes: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Authoritative collection of notes, plus selection and search.
///
/// `NoteStore` exclusively owns the notes and is the only writer of durable
/// storage. Callers receive copies and hand back whole replacement values;
/// every mutation rewrites the full collection under [`STORAGE_KEY`].
///
/// Operations targeting an unknown ID are no-ops that return `Ok(false)`.
///
/// # Examples
///
/// ```
/// use ainotes::{Database, NoteStore};
///
/// # fn main() -> anyhow::Result<()> {
/// let mut store = NoteStore::open(Database::in_memory()?);
///
/// let mut note = store.create()?;
/// note.title = "Groceries".to_string();
/// note.content = "Milk, eggs".to_string();
/// assert!(store.update(note)?);
///
/// assert_eq!(store.search("EGGS").len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct NoteStore<S> {
    kv: S,
    notes: Vec<Note>,
    selected: Option<NoteId>,
}

impl<S: KeyValueStore> NoteStore<S> {
    /// Opens the store, loading any previously persisted collection.
    ///
    /// A missing blob yields an empty collection. An unreadable or corrupt
    /// blob is logged and also yields an empty collection. The first note,
    /// if any, becomes selected.
    pub fn open(kv: S) -> Self {
        let notes = load_notes(&kv);
        let selected = notes.first().map(|note| note.id.clone());
        tracing::debug!(count = notes.len(), "loaded notes");
        Self {
            kv,
            notes,
            selected,
        }
    }

    /// Returns all notes in collection order (newest created first).
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Returns the number of notes.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Returns true when the collection holds no notes.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Looks up a note by ID.
    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| &note.id == id)
    }

    /// Returns the selected note, if any.
    pub fn selected(&self) -> Option<&Note> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    /// Returns the ID of the selected note, if any.
    pub fn selected_id(&self) -> Option<&NoteId> {
        self.selected.as_ref()
    }

    /// Selects the note with the given ID. Unknown IDs leave the selection
    /// unchanged and return false.
    pub fn select(&mut self, id: &NoteId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.selected = Some(id.clone());
        true
    }

    /// Returns the underlying key-value store.
    pub fn storage(&self) -> &S {
        &self.kv
    }

    /// Creates an empty note at the front of the collection and selects it.
    pub fn create(&mut self) -> Result<Note, StoreError> {
        let note = Note::new(OffsetDateTime::now_utc());
        tracing::debug!(id = %note.id, "creating note");
        self.notes.insert(0, note.clone());
        self.selected = Some(note.id.clone());
        self.persist()?;
        Ok(note)
    }

    /// Replaces the stored note that has the same ID.
    ///
    /// The stored `created_at` is kept, `updated_at` is stamped with the
    /// current time (never earlier than `created_at`) and duplicate tags are
    /// dropped. Returns `Ok(false)` without writing anything when no note
    /// with that ID exists.
    pub fn update(&mut self, mut note: Note) -> Result<bool, StoreError> {
        let Some(slot) = self.notes.iter_mut().find(|n| n.id == note.id) else {
            tracing::debug!(id = %note.id, "update of unknown note ignored");
            return Ok(false);
        };

        note.created_at = slot.created_at;
        note.updated_at = OffsetDateTime::now_utc().max(note.created_at);
        note.dedup_tags();
        *slot = note;

        self.persist()?;
        Ok(true)
    }

    /// Removes the note with the given ID.
    ///
    /// If it was selected, the first remaining note becomes selected, or
    /// nothing when the collection is now empty.
    pub fn delete(&mut self, id: &NoteId) -> Result<bool, StoreError> {
        let Some(index) = self.notes.iter().position(|note| &note.id == id) else {
            return Ok(false);
        };

        self.notes.remove(index);
        if self.selected.as_ref() == Some(id) {
            self.selected = self.notes.first().map(|note| note.id.clone());
        }
        tracing::debug!(id = %id, remaining = self.notes.len(), "deleted note");

        self.persist()?;
        Ok(true)
    }

    /// Returns notes whose title, content or any tag contains `query`,
    /// ignoring case, in collection order.
    ///
    /// An empty query returns every note.
    pub fn search(&self, query: &str) -> Vec<&Note> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return self.notes.iter().collect();
        }

        self.notes
            .iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&query)
                    || note.content.to_lowercase().contains(&query)
                    || note
                        .tags
                        .iter()
                        .any(|tag| tag.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// Saves edited title and content, substituting a placeholder for an
    /// empty title.
    ///
    /// Nothing is written when both fields already match the stored note.
    pub fn save_draft(
        &mut self,
        id: &NoteId,
        title: &str,
        content: &str,
    ) -> Result<bool, StoreError> {
        let title = if title.is_empty() {
            UNTITLED_NOTE
        } else {
            title
        };
        self.modify(id, |note| {
            if note.title == title && note.content == content {
                return false;
            }
            note.title = title.to_string();
            note.content = content.to_string();
            true
        })
    }

    /// Adds a tag to a note, ignoring blank and duplicate tags.
    pub fn add_tag(&mut self, id: &NoteId, tag: &str) -> Result<bool, StoreError> {
        self.modify(id, |note| note.add_tag(tag))
    }

    /// Removes a tag from a note.
    pub fn remove_tag(&mut self, id: &NoteId, tag: &str) -> Result<bool, StoreError> {
        self.modify(id, |note| note.remove_tag(tag))
    }

    /// Stores a generated summary on the current version of a note.
    pub fn merge_summary(&mut self, id: &NoteId, summary: &str) -> Result<bool, StoreError> {
        self.modify(id, |note| {
            note.summary = Some(summary.to_string());
            true
        })
    }

    /// Unions generated tags into the current tags of a note.
    pub fn merge_tags(&mut self, id: &NoteId, tags: &[String]) -> Result<bool, StoreError> {
        self.modify(id, |note| {
            note.tags = merge_tags(&note.tags, tags);
            true
        })
    }

    /// Replaces the content of a note wholesale.
    pub fn apply_content(&mut self, id: &NoteId, content: &str) -> Result<bool, StoreError> {
        self.modify(id, |note| {
            note.content = content.to_string();
            true
        })
    }

    /// Re-reads the note by ID, lets `change` edit a copy and writes it back
    /// through [`update`](Self::update) when `change` reports a difference.
    fn modify<F>(&mut self, id: &NoteId, change: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Note) -> bool,
    {
        let Some(mut note) = self.get(id).cloned() else {
            return Ok(false);
        };
        if !change(&mut note) {
            return Ok(false);
        }
        self.update(note)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let blob = serde_json::to_string(&self.notes)?;
        self.kv.set(STORAGE_KEY, &blob).inspect_err(|e| {
            tracing::error!(error = %e, "failed to persist notes");
        })?;
        Ok(())
    }
}

/// Reads and decodes the persisted collection, degrading to empty.
fn load_notes<S: KeyValueStore>(kv: &S) -> Vec<Note> {
    let blob = match kv.get(STORAGE_KEY) {
        Ok(Some(blob)) => blob,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "could not read stored notes, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<Note>>(&blob) {
        Ok(mut notes) => {
            let mut seen = std::collections::HashSet::new();
            notes.retain(|note| seen.insert(note.id.clone()));
            for note in &mut notes {
                note.updated_at = note.updated_at.max(note.created_at);
                note.dedup_tags();
            }
            notes
        }
        Err(e) => {
            tracing::warn!(error = %e, "stored notes are corrupt, starting empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests;
