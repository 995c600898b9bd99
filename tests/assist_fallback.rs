use ainotes::assist::heuristics::{self, MAX_FALLBACK_TAGS, SUMMARY_PLACEHOLDER};
use ainotes::assist::{AssistAction, AssistRunner, AssistService, AssistSource, FallbackReason};
use ainotes::{Database, NoteStore};
use anyhow::Result;

#[test]
fn fallback_tags_for_pangram() {
    let service = AssistService::new(None);
    let tags = service.generate_tags("The quick brown fox jumps over the lazy dog");

    assert_eq!(tags.source, AssistSource::Fallback(FallbackReason::Unavailable));
    assert!(tags.value.len() <= MAX_FALLBACK_TAGS);
    assert!(!tags.value.iter().any(|t| t == "the"));
    assert_eq!(tags.value, vec!["quick", "brown", "fox", "jumps", "over"]);
}

#[test]
fn fallback_improve_separates_paragraphs() {
    let service = AssistService::new(None);
    let improved = service.improve_content("hello world.\n\nthis is a test.");
    assert_eq!(improved.value, "Hello world.\n\nThis is a test.");
}

#[test]
fn whitespace_only_content_never_fails() {
    let service = AssistService::new(None);
    assert_eq!(service.summarize(" \n\t ").value, SUMMARY_PLACEHOLDER);
    assert!(service.generate_tags(" \n\t ").value.is_empty());
    assert_eq!(service.improve_content(" \n\t ").value, "");
}

#[test]
fn fallback_results_are_deterministic() {
    let text = "Deploy the staging cluster first. Then run the smoke tests on it!";
    assert_eq!(heuristics::summarize(text), heuristics::summarize(text));
    assert_eq!(heuristics::extract_tags(text), heuristics::extract_tags(text));
    assert_eq!(heuristics::improve(text), heuristics::improve(text));
}

#[test]
fn all_three_actions_update_one_note() -> Result<()> {
    let mut store = NoteStore::open(Database::in_memory()?);
    let note = store.create()?;
    store.save_draft(
        &note.id,
        "Trip",
        "pack the camera bag tonight. check the train times tomorrow morning.",
    )?;
    store.add_tag(&note.id, "travel")?;
    let note = store.get(&note.id).cloned().expect("note exists");

    let mut runner = AssistRunner::new(AssistService::new(None));
    runner.submit(&note, AssistAction::Summary)?;
    runner.submit(&note, AssistAction::Tags)?;
    runner.submit(&note, AssistAction::Improve)?;
    while runner.pending() > 0 {
        runner.wait(&mut store)?;
    }

    let stored = store.get(&note.id).expect("note exists");
    assert_eq!(
        stored.summary.as_deref(),
        Some("pack the camera bag tonight.  check the train times tomorrow morning")
    );
    assert_eq!(
        stored.tags,
        vec!["travel", "pack", "camera", "bag", "tonight", "check"]
    );
    assert_eq!(stored.content, note.content);
    assert_eq!(
        runner.suggestion(&note.id),
        Some("Pack the camera bag tonight. Check the train times tomorrow morning.")
    );
    Ok(())
}
