use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::NoteId;

/// Title given to a note saved without one.
pub const UNTITLED_NOTE: &str = "Untitled Note";

/// A note with its content, tags and optional generated summary.
///
/// Notes are the only persisted entity. They are passed around by value:
/// every change produces a whole replacement `Note` that goes back through
/// [`NoteStore::update`](crate::NoteStore::update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier, immutable after creation.
    pub id: NoteId,
    /// The note's title.
    #[serde(default)]
    pub title: String,
    /// The note's body text.
    #[serde(default)]
    pub content: String,
    /// When this note was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When this note was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Tags in insertion order, without duplicates.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Summary, present once one has been generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Note {
    /// Creates an empty note with a fresh ID and both timestamps set to `now`.
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            id: NoteId::generate(),
            title: String::new(),
            content: String::new(),
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
            summary: None,
        }
    }

    /// Returns true when the content holds nothing but whitespace.
    ///
    /// AI-assist actions are only offered for notes where this is false.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Adds a tag if it is non-empty after trimming and not already present.
    ///
    /// Duplicate detection is an exact, case-sensitive match. Returns whether
    /// the tag was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Removes a tag by exact match. Returns whether anything was removed.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Drops repeated tags, keeping the first occurrence of each.
    pub(crate) fn dedup_tags(&mut self) {
        let tags = std::mem::take(&mut self.tags);
        self.tags = merge_tags(&[], &tags);
    }
}

/// Unions `incoming` into `existing`.
///
/// Order is the existing tags followed by new ones in the order they arrive;
/// duplicates are dropped by exact match.
///
/// # Examples
///
/// ```
/// use ainotes::merge_tags;
///
/// let existing = vec!["rust".to_string(), "notes".to_string()];
/// let incoming = vec!["notes".to_string(), "cli".to_string()];
/// assert_eq!(merge_tags(&existing, &incoming), vec!["rust", "notes", "cli"]);
/// ```
pub fn merge_tags(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + incoming.len());
    for tag in existing.iter().chain(incoming) {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

/// Builder for constructing `Note` instances with optional fields.
///
/// # Examples
///
/// ```
/// use ainotes::{NoteBuilder, NoteId};
///
/// let note = NoteBuilder::new()
///     .id(NoteId::new("n1"))
///     .title("Groceries")
///     .content("Buy milk")
///     .build();
///
/// assert_eq!(note.id.as_str(), "n1");
/// assert!(note.tags.is_empty());
/// assert!(note.summary.is_none());
/// ```
#[derive(Debug, Default)]
pub struct NoteBuilder {
    id: Option<NoteId>,
    title: Option<String>,
    content: Option<String>,
    created_at: Option<OffsetDateTime>,
    updated_at: Option<OffsetDateTime>,
    tags: Option<Vec<String>>,
    summary: Option<String>,
}

impl NoteBuilder {
    /// Creates a new `NoteBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the note ID.
    pub fn id(mut self, id: NoteId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the note content.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the created timestamp.
    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Sets the updated timestamp.
    pub fn updated_at(mut self, updated_at: OffsetDateTime) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Sets the tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the summary.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builds the `Note`, generating an ID and using the current time for
    /// anything not set.
    pub fn build(self) -> Note {
        let now = OffsetDateTime::now_utc();
        let created_at = self.created_at.unwrap_or(now);
        let mut note = Note {
            id: self.id.unwrap_or_else(NoteId::generate),
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
            tags: self.tags.unwrap_or_default(),
            summary: self.summary,
        };
        note.dedup_tags();
        note
    }
}
