//! Local text heuristics used when no completion backend answers.
//!
//! All functions are pure and deterministic; they never fail, even on empty
//! or whitespace-only input.

/// Summary returned when the content has no usable sentence.
pub const SUMMARY_PLACEHOLDER: &str =
    "This note contains important information that you've captured.";

/// Maximum number of tags the fallback extractor returns.
pub const MAX_FALLBACK_TAGS: usize = 5;

/// Fragments must be longer than this (in characters, ignoring surrounding
/// whitespace) to count as a sentence.
const MIN_SENTENCE_CHARS: usize = 10;

/// Common English words never proposed as tags.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old", "see",
    "two", "way", "who", "boy", "did", "its", "let", "put", "say", "she", "too", "use",
];

/// Builds an extractive summary from the first two substantial sentences.
///
/// Fragments keep their own whitespace when joined; only the result is
/// trimmed.
///
/// # Examples
///
/// ```
/// use ainotes::assist::heuristics::summarize;
///
/// let text = "Rust has a strict borrow checker. It prevents data races! Ok.";
/// assert_eq!(
///     summarize(text),
///     "Rust has a strict borrow checker.  It prevents data races"
/// );
/// ```
pub fn summarize(content: &str) -> String {
    let sentences: Vec<&str> = content
        .split(['.', '!', '?'])
        .filter(|fragment| fragment.trim().chars().count() > MIN_SENTENCE_CHARS)
        .take(2)
        .collect();

    let summary = sentences.join(". ");
    let summary = summary.trim();
    if summary.is_empty() {
        SUMMARY_PLACEHOLDER.to_string()
    } else {
        summary.to_string()
    }
}

/// Extracts up to five candidate tags from the content.
///
/// Candidates are lowercase words made only of the letters `a`-`z`, at least
/// three long, in first-seen order, with stop words removed.
///
/// # Examples
///
/// ```
/// use ainotes::assist::heuristics::extract_tags;
///
/// let tags = extract_tags("The quick brown fox jumps over the lazy dog");
/// assert_eq!(tags, vec!["quick", "brown", "fox", "jumps", "over"]);
/// ```
pub fn extract_tags(content: &str) -> Vec<String> {
    let lowered = content.to_lowercase();
    let mut tags: Vec<String> = Vec::new();

    for word in lowered.split(|c: char| !is_word_char(c)) {
        if word.len() < 3 || !word.bytes().all(|b| b.is_ascii_lowercase()) {
            continue;
        }
        if STOP_WORDS.contains(&word) || tags.iter().any(|t| t == word) {
            continue;
        }
        tags.push(word.to_string());
        if tags.len() == MAX_FALLBACK_TAGS {
            break;
        }
    }

    tags
}

/// Reformats content into one paragraph per non-blank line, capitalizing the
/// first letter of each line and any letter following `". "`.
///
/// # Examples
///
/// ```
/// use ainotes::assist::heuristics::improve;
///
/// assert_eq!(
///     improve("hello world.\n\nthis is a test."),
///     "Hello world.\n\nThis is a test."
/// );
/// ```
pub fn improve(content: &str) -> String {
    content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(capitalize_sentences)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Word characters as understood by a regex `\b`: ASCII letters, digits and
/// underscore.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn capitalize_sentences(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut prev = ['\0', '\0'];

    for (index, c) in line.chars().enumerate() {
        let sentence_start = index == 0 || prev == ['.', ' '];
        if sentence_start && c.is_ascii_lowercase() {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        prev = [prev[1], c];
    }

    out
}
