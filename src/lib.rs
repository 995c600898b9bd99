pub mod assist;
pub mod autosave;
pub mod backend;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod store;

pub use assist::{AssistAction, AssistRunner, AssistService};
pub use autosave::{Autosave, Debouncer, Draft};
pub use config::Config;
pub use db::{Database, KeyValueStore, StorageError};
pub use models::{Note, NoteBuilder, NoteId, UNTITLED_NOTE, merge_tags};
pub use store::{NoteStore, STORAGE_KEY, StoreError};
