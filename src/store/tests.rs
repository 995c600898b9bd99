use std::cell::RefCell;
use std::collections::HashMap;

use super::*;
use crate::Database;
use crate::models::NoteBuilder;

fn empty_store() -> NoteStore<Database> {
    NoteStore::open(Database::in_memory().expect("failed to create in-memory database"))
}

/// Key-value store whose writes always fail, counting attempts.
#[derive(Default)]
struct FailingWrites {
    attempts: RefCell<usize>,
}

impl KeyValueStore for FailingWrites {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        *self.attempts.borrow_mut() += 1;
        Err(StorageError::Backend {
            message: "disk full".to_string(),
        })
    }
}

/// Key-value store whose reads always fail.
struct FailingReads;

impl KeyValueStore for FailingReads {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Backend {
            message: "unreadable".to_string(),
        })
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

#[derive(Default)]
struct MemoryKv {
    values: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn store_with_blob(blob: &str) -> NoteStore<MemoryKv> {
    let kv = MemoryKv::default();
    kv.set(STORAGE_KEY, blob).unwrap();
    NoteStore::open(kv)
}

fn has_unique_ids<S: KeyValueStore>(store: &NoteStore<S>) -> bool {
    let mut seen = std::collections::HashSet::new();
    store.notes().iter().all(|note| seen.insert(note.id.clone()))
}

// --- create ---

#[test]
fn open_on_fresh_storage_is_empty_with_no_selection() {
    let store = empty_store();
    assert!(store.is_empty());
    assert!(store.selected().is_none());
}

#[test]
fn create_prepends_and_selects_new_note() {
    let mut store = empty_store();

    let first = store.create().unwrap();
    let second = store.create().unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.notes()[0].id, second.id);
    assert_eq!(store.notes()[1].id, first.id);
    assert_eq!(store.selected_id(), Some(&second.id));
}

#[test]
fn create_returns_empty_note_with_equal_timestamps() {
    let mut store = empty_store();
    let note = store.create().unwrap();

    assert!(note.title.is_empty());
    assert!(note.content.is_empty());
    assert!(note.tags.is_empty());
    assert!(note.summary.is_none());
    assert_eq!(note.created_at, note.updated_at);
}

#[test]
fn create_persists_collection() {
    let mut store = empty_store();
    let note = store.create().unwrap();

    let blob = store.storage().get(STORAGE_KEY).unwrap().unwrap();
    let stored: Vec<Note> = serde_json::from_str(&blob).unwrap();
    assert_eq!(stored, vec![note]);
}

// --- update ---

#[test]
fn update_replaces_matching_note() {
    let mut store = empty_store();
    let mut note = store.create().unwrap();
    note.title = "Title".to_string();
    note.content = "Body".to_string();

    assert!(store.update(note.clone()).unwrap());

    let stored = store.get(&note.id).unwrap();
    assert_eq!(stored.title, "Title");
    assert_eq!(stored.content, "Body");
}

#[test]
fn update_of_unknown_id_is_noop() {
    let mut store = empty_store();
    store.create().unwrap();
    let before = store.notes().to_vec();

    let stranger = NoteBuilder::new().id(NoteId::new("ghost")).build();
    assert!(!store.update(stranger).unwrap());

    assert_eq!(store.notes(), before.as_slice());
}

#[test]
fn update_keeps_created_at_and_refreshes_updated_at() {
    let mut store = empty_store();
    let original = store.create().unwrap();

    let mut edited = original.clone();
    edited.created_at = original.created_at + time::Duration::days(365);
    edited.updated_at = original.created_at - time::Duration::days(365);
    store.update(edited).unwrap();

    let stored = store.get(&original.id).unwrap();
    assert_eq!(stored.created_at, original.created_at);
    assert!(stored.updated_at >= stored.created_at);
    assert!(stored.updated_at >= original.updated_at);
}

#[test]
fn update_drops_duplicate_tags() {
    let mut store = empty_store();
    let mut note = store.create().unwrap();
    note.tags = vec!["a".into(), "b".into(), "a".into()];

    store.update(note.clone()).unwrap();

    assert_eq!(store.get(&note.id).unwrap().tags, vec!["a", "b"]);
}

#[test]
fn update_with_failing_storage_still_changes_memory() {
    let mut store = NoteStore::open(FailingWrites::default());

    let err = store.create().unwrap_err();
    assert!(matches!(err, StoreError::Storage(_)));

    assert_eq!(store.len(), 1);
    assert_eq!(*store.storage().attempts.borrow(), 1);
}

// --- delete ---

#[test]
fn deleting_selected_note_selects_first_remaining() {
    let mut store = empty_store();
    let oldest = store.create().unwrap();
    let middle = store.create().unwrap();
    let newest = store.create().unwrap();

    store.select(&middle.id);
    assert!(store.delete(&middle.id).unwrap());

    assert_eq!(store.selected_id(), Some(&newest.id));
    assert!(store.get(&oldest.id).is_some());
}

#[test]
fn deleting_non_selected_note_keeps_selection() {
    let mut store = empty_store();
    let older = store.create().unwrap();
    let newer = store.create().unwrap();

    store.select(&older.id);
    store.delete(&newer.id).unwrap();

    assert_eq!(store.selected_id(), Some(&older.id));
}

#[test]
fn deleting_last_note_clears_selection_and_persists_empty_list() {
    let mut store = empty_store();
    let note = store.create().unwrap();

    store.delete(&note.id).unwrap();

    assert!(store.selected().is_none());
    assert_eq!(
        store.storage().get(STORAGE_KEY).unwrap().as_deref(),
        Some("[]")
    );
}

#[test]
fn delete_of_unknown_id_is_noop() {
    let mut store = empty_store();
    let note = store.create().unwrap();

    assert!(!store.delete(&NoteId::new("ghost")).unwrap());
    assert_eq!(store.selected_id(), Some(&note.id));
    assert_eq!(store.len(), 1);
}

#[test]
fn ids_stay_unique_across_mixed_operations() {
    let mut store = empty_store();
    let mut created = Vec::new();
    for i in 0..20 {
        let note = store.create().unwrap();
        if i % 3 == 0 {
            store.delete(&note.id).unwrap();
        } else {
            let mut edited = note.clone();
            edited.content = format!("note {i}");
            store.update(edited).unwrap();
            created.push(note.id);
        }
        assert!(has_unique_ids(&store));
        assert!(
            store
                .notes()
                .iter()
                .all(|note| note.updated_at >= note.created_at)
        );
    }
    assert_eq!(store.len(), created.len());
}

// --- search ---

#[test]
fn empty_search_returns_all_notes_in_order() {
    let mut store = empty_store();
    store.create().unwrap();
    store.create().unwrap();
    store.create().unwrap();

    let ids: Vec<_> = store.search("").iter().map(|n| n.id.clone()).collect();
    let all: Vec<_> = store.notes().iter().map(|n| n.id.clone()).collect();
    assert_eq!(ids, all);
}

#[test]
fn search_is_case_insensitive_across_title_content_and_tags() {
    let mut store = empty_store();

    let by_title = store.create().unwrap();
    store.save_draft(&by_title.id, "Rust Ownership", "borrowing").unwrap();

    let by_content = store.create().unwrap();
    store.save_draft(&by_content.id, "Misc", "learning RUST today").unwrap();

    let by_tag = store.create().unwrap();
    store.save_draft(&by_tag.id, "Other", "nothing here").unwrap();
    store.add_tag(&by_tag.id, "Rustacean").unwrap();

    let unrelated = store.create().unwrap();
    store.save_draft(&unrelated.id, "Groceries", "milk").unwrap();

    let hits: Vec<_> = store.search("rUsT").iter().map(|n| n.id.clone()).collect();
    assert_eq!(hits, vec![by_tag.id, by_content.id, by_title.id]);
}

#[test]
fn search_does_not_mutate_collection() {
    let mut store = empty_store();
    let note = store.create().unwrap();
    store.save_draft(&note.id, "alpha", "").unwrap();
    let before = store.notes().to_vec();

    assert!(store.search("zzz").is_empty());
    assert_eq!(store.notes(), before.as_slice());
}

// --- field-level edits ---

#[test]
fn save_draft_substitutes_placeholder_for_empty_title() {
    let mut store = empty_store();
    let note = store.create().unwrap();

    store.save_draft(&note.id, "", "content").unwrap();

    assert_eq!(store.get(&note.id).unwrap().title, UNTITLED_NOTE);
}

#[test]
fn save_draft_keeps_whitespace_only_title() {
    let mut store = empty_store();
    let note = store.create().unwrap();

    store.save_draft(&note.id, "   ", "content").unwrap();

    assert_eq!(store.get(&note.id).unwrap().title, "   ");
}

#[test]
fn save_draft_without_changes_writes_nothing() {
    let mut store = empty_store();
    let note = store.create().unwrap();
    store.save_draft(&note.id, "T", "C").unwrap();
    let stamped = store.get(&note.id).unwrap().updated_at;

    assert!(!store.save_draft(&note.id, "T", "C").unwrap());
    assert_eq!(store.get(&note.id).unwrap().updated_at, stamped);
}

#[test]
fn add_and_remove_tag_through_store() {
    let mut store = empty_store();
    let note = store.create().unwrap();

    assert!(store.add_tag(&note.id, "work").unwrap());
    assert!(!store.add_tag(&note.id, "work").unwrap());
    assert!(store.remove_tag(&note.id, "work").unwrap());
    assert!(!store.remove_tag(&note.id, "work").unwrap());

    assert!(store.get(&note.id).unwrap().tags.is_empty());
}

#[test]
fn merge_summary_only_touches_summary() {
    let mut store = empty_store();
    let note = store.create().unwrap();
    store.save_draft(&note.id, "Title", "Fresh content").unwrap();
    store.add_tag(&note.id, "keep").unwrap();

    // Result produced from a stale copy still merges into the current note.
    assert!(store.merge_summary(&note.id, "Short summary").unwrap());

    let stored = store.get(&note.id).unwrap();
    assert_eq!(stored.summary.as_deref(), Some("Short summary"));
    assert_eq!(stored.content, "Fresh content");
    assert_eq!(stored.tags, vec!["keep"]);
}

#[test]
fn merge_tags_unions_with_existing() {
    let mut store = empty_store();
    let note = store.create().unwrap();
    store.add_tag(&note.id, "rust").unwrap();

    store
        .merge_tags(&note.id, &["cli".to_string(), "rust".to_string()])
        .unwrap();

    assert_eq!(store.get(&note.id).unwrap().tags, vec!["rust", "cli"]);
}

#[test]
fn merges_into_deleted_note_are_discarded() {
    let mut store = empty_store();
    let note = store.create().unwrap();
    store.delete(&note.id).unwrap();

    assert!(!store.merge_summary(&note.id, "late").unwrap());
    assert!(!store.merge_tags(&note.id, &["late".to_string()]).unwrap());
    assert!(!store.apply_content(&note.id, "late").unwrap());
    assert!(store.is_empty());
}

#[test]
fn apply_content_replaces_content_wholesale() {
    let mut store = empty_store();
    let note = store.create().unwrap();
    store.save_draft(&note.id, "T", "old text").unwrap();

    store.apply_content(&note.id, "New text.").unwrap();

    assert_eq!(store.get(&note.id).unwrap().content, "New text.");
}

// --- loading ---

#[test]
fn corrupt_blob_loads_as_empty() {
    let store = store_with_blob("{not json");
    assert!(store.is_empty());
    assert!(store.selected().is_none());
}

#[test]
fn wrong_shape_blob_loads_as_empty() {
    let store = store_with_blob(r#"{"id": "1"}"#);
    assert!(store.is_empty());
}

#[test]
fn unreadable_storage_loads_as_empty() {
    let store = NoteStore::open(FailingReads);
    assert!(store.is_empty());
}

#[test]
fn loading_selects_first_note_and_repairs_invariants() {
    let blob = r#"[
        {"id":"2","title":"b","content":"","createdAt":"2024-01-02T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z","tags":["x","x"]},
        {"id":"1","title":"a","content":"","createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z","tags":[]},
        {"id":"2","title":"dup","content":"","createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z","tags":[]}
    ]"#;
    let store = store_with_blob(blob);

    assert_eq!(store.len(), 2);
    assert_eq!(store.selected_id(), Some(&NoteId::new("2")));

    let first = &store.notes()[0];
    assert_eq!(first.tags, vec!["x"]);
    assert!(first.updated_at >= first.created_at);
}

#[test]
fn reopening_reproduces_collection() {
    let kv = MemoryKv::default();
    let mut store = NoteStore::open(kv);
    let a = store.create().unwrap();
    store.save_draft(&a.id, "A", "alpha").unwrap();
    store.merge_summary(&a.id, "sum").unwrap();
    let b = store.create().unwrap();
    store.add_tag(&b.id, "t").unwrap();
    let expected = store.notes().to_vec();

    let NoteStore { kv, .. } = store;
    let reopened = NoteStore::open(kv);

    assert_eq!(reopened.notes(), expected.as_slice());
}
