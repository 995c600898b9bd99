use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use thiserror::Error;

use ainotes::assist::{AssistAction, AssistRunner, AssistService, SubmitError};
use ainotes::autosave::{Autosave, Draft};
use ainotes::config::{self, Config};
use ainotes::{Database, Note, NoteId, NoteStore};

/// ainotes - note taking with AI-assisted summaries, tags and rewrites
#[derive(Parser)]
#[command(name = "ainotes")]
#[command(about = "Note taking with AI-assisted summaries, tags and rewrites")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Create a new note
    New {
        /// Title of the note
        #[arg(short, long)]
        title: Option<String>,
        /// Body of the note
        #[arg(short, long)]
        content: Option<String>,
    },
    /// List notes, optionally filtered by a search query
    List {
        /// Case-insensitive text matched against title, content and tags
        #[arg(value_name = "QUERY")]
        query: Option<String>,
    },
    /// Show one note in full
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Change the title and/or content of a note
    Edit {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Delete a note
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Add or remove tags
    Tag {
        #[command(subcommand)]
        action: TagCommand,
    },
    /// Generate and store a summary
    Summarize {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Generate tags and add them to the note
    Tags {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Suggest an improved version of the content
    Improve {
        #[arg(value_name = "ID")]
        id: String,
        /// Replace the note content with the suggestion
        #[arg(long)]
        apply: bool,
    },
    /// Show whether AI assist uses a backend or basic mode
    Status,
}

#[derive(Subcommand)]
enum TagCommand {
    /// Add a tag
    Add { id: String, tag: String },
    /// Remove a tag
    Remove { id: String, tag: String },
}

/// Errors caused by bad input rather than by the system.
#[derive(Debug, Error)]
enum CliError {
    #[error("No note matches id '{0}'")]
    UnknownNote(String),
    #[error("Id '{0}' matches more than one note")]
    AmbiguousNote(String),
}

fn main() {
    let _ = dotenvy::dotenv();
    ainotes::logging::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
fn is_user_error(error: &anyhow::Error) -> bool {
    error.downcast_ref::<CliError>().is_some() || error.downcast_ref::<SubmitError>().is_some()
}

fn run(command: Commands) -> Result<()> {
    let config = Config::from_env().context("Failed to read configuration")?;

    let db_path = config.database_path()?;
    config::ensure_database_directory(&db_path)?;
    let db = Database::open(&db_path).context("Failed to open database")?;
    let mut store = NoteStore::open(db);

    execute(command, &config, &mut store)
}

/// Executes a command against a store.
///
/// Separated from `run` so tests can use an in-memory database.
fn execute<S: ainotes::KeyValueStore>(
    command: Commands,
    config: &Config,
    store: &mut NoteStore<S>,
) -> Result<()> {
    match command {
        Commands::New { title, content } => {
            let note = store.create().context("Failed to create note")?;
            if title.is_some() || content.is_some() {
                store.save_draft(
                    &note.id,
                    title.as_deref().unwrap_or_default(),
                    content.as_deref().unwrap_or_default(),
                )?;
            }
            println!("Note created (id: {})", note.id);
        }
        Commands::List { query } => {
            let matches = store.search(query.as_deref().unwrap_or_default());
            if matches.is_empty() {
                if query.is_some() {
                    println!("No notes found");
                } else {
                    println!("No notes yet. Create your first note!");
                }
            }
            for note in matches {
                println!("{}", list_line(note));
            }
        }
        Commands::Show { id } => {
            let id = resolve_id(store, &id)?;
            if let Some(note) = store.get(&id) {
                print_note(note);
            }
        }
        Commands::Edit { id, title, content } => {
            let id = resolve_id(store, &id)?;
            let Some(current) = store.get(&id) else {
                return Ok(());
            };
            let draft = Draft {
                note_id: id.clone(),
                title: title.unwrap_or_else(|| current.title.clone()),
                content: content.unwrap_or_else(|| current.content.clone()),
            };
            let mut autosave = Autosave::new(config.autosave_quiet);
            autosave.record(draft);
            if autosave.flush(store)? {
                println!("Note updated (id: {id})");
            } else {
                println!("Nothing to change");
            }
        }
        Commands::Delete { id } => {
            let id = resolve_id(store, &id)?;
            store.delete(&id)?;
            println!("Note deleted (id: {id})");
        }
        Commands::Tag { action } => match action {
            TagCommand::Add { id, tag } => {
                let id = resolve_id(store, &id)?;
                if store.add_tag(&id, &tag)? {
                    println!("Tag added: {}", tag.trim());
                } else {
                    println!("Tag already present or empty");
                }
            }
            TagCommand::Remove { id, tag } => {
                let id = resolve_id(store, &id)?;
                if store.remove_tag(&id, &tag)? {
                    println!("Tag removed: {tag}");
                } else {
                    println!("Tag not found: {tag}");
                }
            }
        },
        Commands::Summarize { id } => {
            run_assist(config, store, &id, AssistAction::Summary, false)?;
        }
        Commands::Tags { id } => run_assist(config, store, &id, AssistAction::Tags, false)?,
        Commands::Improve { id, apply } => {
            run_assist(config, store, &id, AssistAction::Improve, apply)?;
        }
        Commands::Status => print_status(&AssistService::from_config(config)),
    }
    Ok(())
}

/// Runs one assist action to completion and reports the outcome.
fn run_assist<S: ainotes::KeyValueStore>(
    config: &Config,
    store: &mut NoteStore<S>,
    raw_id: &str,
    action: AssistAction,
    apply: bool,
) -> Result<()> {
    let id = resolve_id(store, raw_id)?;
    let Some(note) = store.get(&id).cloned() else {
        return Err(CliError::UnknownNote(raw_id.to_string()).into());
    };

    let mut runner = AssistRunner::new(AssistService::from_config(config));
    runner.submit(&note, action)?;
    let Some(event) = runner.wait(store)? else {
        return Ok(());
    };
    let marker = if event.source.is_fallback() { " (basic)" } else { "" };

    let Some(updated) = store.get(&id) else {
        return Ok(());
    };
    match action {
        AssistAction::Summary => {
            println!("Summary{marker}:");
            println!("{}", updated.summary.as_deref().unwrap_or_default());
        }
        AssistAction::Tags => {
            println!("Tags{marker}: {}", updated.tags.join(", "));
        }
        AssistAction::Improve => {
            println!("Suggestion{marker}:");
            println!("{}", runner.suggestion(&id).unwrap_or_default());
            if apply && runner.apply_suggestion(store, &id)? {
                println!();
                println!("Suggestion applied to note {id}");
            }
        }
    }
    Ok(())
}

fn print_status(service: &AssistService) {
    if service.status() {
        println!("AI assist: backend available");
    } else {
        println!("AI assist: basic mode (set OPENAI_API_KEY for enhanced AI capabilities)");
    }
}

/// Resolves a full ID or a unique ID prefix.
fn resolve_id<S: ainotes::KeyValueStore>(store: &NoteStore<S>, raw: &str) -> Result<NoteId> {
    let exact = NoteId::new(raw);
    if store.get(&exact).is_some() {
        return Ok(exact);
    }

    let mut candidates = store
        .notes()
        .iter()
        .filter(|note| !raw.is_empty() && note.id.as_str().starts_with(raw));
    match (candidates.next(), candidates.next()) {
        (Some(note), None) => Ok(note.id.clone()),
        (Some(_), Some(_)) => Err(CliError::AmbiguousNote(raw.to_string()).into()),
        (None, _) => Err(CliError::UnknownNote(raw.to_string()).into()),
    }
}

fn display_title(note: &Note) -> &str {
    if note.title.is_empty() {
        ainotes::UNTITLED_NOTE
    } else {
        &note.title
    }
}

fn list_line(note: &Note) -> String {
    let short_id: String = note.id.as_str().chars().take(8).collect();
    let mut line = format!(
        "{short_id}  {}  {}",
        note.updated_at.date(),
        display_title(note)
    );
    if !note.tags.is_empty() {
        let shown: Vec<&str> = note.tags.iter().take(2).map(String::as_str).collect();
        line.push_str(&format!("  [{}", shown.join(", ")));
        if note.tags.len() > 2 {
            line.push_str(&format!(", +{}", note.tags.len() - 2));
        }
        line.push(']');
    }
    line
}

fn print_note(note: &Note) {
    println!("{}", display_title(note));
    println!("id: {}", note.id);
    println!("created: {}", note.created_at);
    println!("updated: {}", note.updated_at);
    if !note.tags.is_empty() {
        println!("tags: {}", note.tags.join(", "));
    }
    if let Some(summary) = &note.summary {
        println!("summary: {summary}");
    }
    println!();
    println!("{}", if note.content.is_empty() { "No content" } else { &note.content });
}
