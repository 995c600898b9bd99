//! AI-assisted text operations: summaries, tags and content improvement.
//!
//! [`AssistService`] performs the operations, calling a completion backend
//! when one is configured and falling back to the local [`heuristics`]
//! otherwise or when the call fails. [`AssistRunner`] runs requests on worker
//! threads and merges finished results back into a [`NoteStore`] by note ID.
//!
//! # Examples
//!
//! ```
//! use ainotes::assist::{AssistAction, AssistRunner, AssistService};
//! use ainotes::{Database, NoteStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut store = NoteStore::open(Database::in_memory()?);
//! let note = store.create()?;
//! store.save_draft(&note.id, "Trip", "Book flights to Lisbon. Reserve a hotel near the river.")?;
//! let note = store.get(&note.id).cloned().expect("note exists");
//!
//! let mut runner = AssistRunner::new(AssistService::new(None));
//! runner.submit(&note, AssistAction::Tags)?;
//! runner.wait(&mut store)?;
//!
//! let tags = &store.get(&note.id).expect("note exists").tags;
//! assert_eq!(tags, &vec!["book", "flights", "lisbon", "reserve", "hotel"]);
//! # Ok(())
//! # }
//! ```
//!
//! [`NoteStore`]: crate::NoteStore

pub mod heuristics;
mod runner;
mod service;

pub use runner::{AssistEvent, AssistRunner, SubmitError};
pub use service::{AssistAction, AssistService, AssistSource, Assisted, FallbackReason};
