mod ids;
mod note;

pub use ids::NoteId;
pub use note::{Note, NoteBuilder, UNTITLED_NOTE, merge_tags};
