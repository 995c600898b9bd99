use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use thiserror::Error;

use crate::db::KeyValueStore;
use crate::models::{Note, NoteId};
use crate::store::{NoteStore, StoreError};

use super::heuristics;
use super::service::{AssistAction, AssistService, AssistSource, Assisted, FallbackReason};

/// Reasons a request is refused before it starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The note has no content to work from.
    #[error("Note content cannot be empty")]
    EmptyContent,

    /// The same action is already running for this note.
    #[error("A {action} request is already running for this note")]
    AlreadyRunning { action: AssistAction },
}

/// Outcome of one finished request, after it was applied to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistEvent {
    pub note_id: NoteId,
    pub action: AssistAction,
    pub source: AssistSource,
    /// False when the note was deleted before the result arrived.
    pub applied: bool,
}

enum Output {
    Summary(Assisted<String>),
    Tags(Assisted<Vec<String>>),
    Improve(Assisted<String>),
}

impl Output {
    fn fallback(action: AssistAction, content: &str, reason: FallbackReason) -> Self {
        let source = AssistSource::Fallback(reason);
        match action {
            AssistAction::Summary => Self::Summary(Assisted {
                value: heuristics::summarize(content),
                source,
            }),
            AssistAction::Tags => Self::Tags(Assisted {
                value: heuristics::extract_tags(content),
                source,
            }),
            AssistAction::Improve => Self::Improve(Assisted {
                value: heuristics::improve(content),
                source,
            }),
        }
    }
}

struct Completion {
    note_id: NoteId,
    action: AssistAction,
    output: Output,
}

/// Runs assist requests off the event loop and merges their results.
///
/// Each request runs on its own worker thread with a copy of the note
/// content. Results come back over a channel and are applied by the owner of
/// the [`NoteStore`] via [`poll`](Self::poll) or [`wait`](Self::wait), so the
/// store itself is only ever touched from one thread.
///
/// Results are merged by note ID into whatever the note looks like at that
/// moment, touching only the field the action produced. A result for a note
/// that no longer exists is dropped. Improve results are not merged; they
/// are kept as a per-note suggestion until [`apply_suggestion`] or
/// [`discard_suggestion`].
///
/// [`apply_suggestion`]: Self::apply_suggestion
/// [`discard_suggestion`]: Self::discard_suggestion
pub struct AssistRunner {
    service: AssistService,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    in_flight: HashSet<(NoteId, AssistAction)>,
    suggestions: HashMap<NoteId, String>,
}

impl AssistRunner {
    pub fn new(service: AssistService) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            service,
            sender,
            receiver,
            in_flight: HashSet::new(),
            suggestions: HashMap::new(),
        }
    }

    /// Whether the underlying service has a backend.
    pub fn status(&self) -> bool {
        self.service.status()
    }

    /// Whether `action` is currently running for the note.
    pub fn is_running(&self, note_id: &NoteId, action: AssistAction) -> bool {
        self.in_flight.contains(&(note_id.clone(), action))
    }

    /// Number of requests still running.
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Starts `action` for the note.
    ///
    /// Different actions may run concurrently for the same note; the same
    /// action may not.
    pub fn submit(&mut self, note: &Note, action: AssistAction) -> Result<(), SubmitError> {
        if note.is_blank() {
            return Err(SubmitError::EmptyContent);
        }
        if !self.in_flight.insert((note.id.clone(), action)) {
            return Err(SubmitError::AlreadyRunning { action });
        }

        let service = self.service.clone();
        let sender = self.sender.clone();
        let note_id = note.id.clone();
        let content = note.content.clone();
        tracing::debug!(id = %note_id, %action, "starting assist request");

        thread::spawn(move || {
            let attempt = panic::catch_unwind(AssertUnwindSafe(|| match action {
                AssistAction::Summary => Output::Summary(service.summarize(&content)),
                AssistAction::Tags => Output::Tags(service.generate_tags(&content)),
                AssistAction::Improve => Output::Improve(service.improve_content(&content)),
            }));
            let output = attempt.unwrap_or_else(|_| {
                tracing::error!(
                    id = %note_id,
                    %action,
                    "assist worker panicked, using basic fallback"
                );
                Output::fallback(action, &content, FallbackReason::WorkerPanicked)
            });
            // The runner may have been dropped; nothing left to deliver to.
            let _ = sender.send(Completion {
                note_id,
                action,
                output,
            });
        });

        Ok(())
    }

    /// Applies every result that has already arrived, without blocking.
    pub fn poll<S: KeyValueStore>(
        &mut self,
        store: &mut NoteStore<S>,
    ) -> Result<Vec<AssistEvent>, StoreError> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(completion) => events.push(self.apply(store, completion)?),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        Ok(events)
    }

    /// Blocks until the next result arrives and applies it.
    ///
    /// Returns `Ok(None)` immediately when nothing is running.
    pub fn wait<S: KeyValueStore>(
        &mut self,
        store: &mut NoteStore<S>,
    ) -> Result<Option<AssistEvent>, StoreError> {
        if self.in_flight.is_empty() {
            return Ok(None);
        }
        match self.receiver.recv() {
            Ok(completion) => self.apply(store, completion).map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Returns the pending improve suggestion for a note.
    ///
    /// Suggestions for deleted notes are dropped the next time a result is
    /// applied or a suggestion is applied.
    pub fn suggestion(&self, note_id: &NoteId) -> Option<&str> {
        self.suggestions.get(note_id).map(String::as_str)
    }

    /// Replaces the note's content with its pending suggestion.
    ///
    /// Returns `Ok(false)` when there is no suggestion or the note is gone.
    pub fn apply_suggestion<S: KeyValueStore>(
        &mut self,
        store: &mut NoteStore<S>,
        note_id: &NoteId,
    ) -> Result<bool, StoreError> {
        self.suggestions.retain(|id, _| store.get(id).is_some());
        match self.suggestions.remove(note_id) {
            Some(suggestion) => store.apply_content(note_id, &suggestion),
            None => Ok(false),
        }
    }

    /// Drops the pending suggestion for a note, returning it.
    pub fn discard_suggestion(&mut self, note_id: &NoteId) -> Option<String> {
        self.suggestions.remove(note_id)
    }

    fn apply<S: KeyValueStore>(
        &mut self,
        store: &mut NoteStore<S>,
        completion: Completion,
    ) -> Result<AssistEvent, StoreError> {
        let Completion {
            note_id,
            action,
            output,
        } = completion;
        self.in_flight.remove(&(note_id.clone(), action));

        let (source, applied) = match output {
            Output::Summary(result) => {
                (result.source, store.merge_summary(&note_id, &result.value)?)
            }
            Output::Tags(result) => (result.source, store.merge_tags(&note_id, &result.value)?),
            Output::Improve(result) => {
                let exists = store.get(&note_id).is_some();
                if exists {
                    self.suggestions.insert(note_id.clone(), result.value);
                }
                (result.source, exists)
            }
        };

        if !applied {
            tracing::debug!(id = %note_id, %action, "discarding result for missing note");
        }
        self.suggestions.retain(|id, _| store.get(id).is_some());

        Ok(AssistEvent {
            note_id,
            action,
            source,
            applied,
        })
    }
}
