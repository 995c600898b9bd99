//! Process configuration read from the environment.
//!
//! The binary loads a `.env` file with `dotenvy` before calling
//! [`Config::from_env`], so either source works.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::autosave::DEFAULT_QUIET_PERIOD;
use crate::backend::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT};

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Credential for the completion backend. `None` means fallback mode.
    pub api_key: Option<String>,
    /// API root of the completion backend.
    pub base_url: String,
    /// Model requested from the backend.
    pub model: String,
    /// Upper bound on one backend request.
    pub backend_timeout: Duration,
    /// Idle time before editor drafts are saved.
    pub autosave_quiet: Duration,
    /// Explicit database location; `None` uses [`default_database_path`].
    pub db_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            backend_timeout: DEFAULT_TIMEOUT,
            autosave_quiet: DEFAULT_QUIET_PERIOD,
            db_path: None,
        }
    }
}

impl Config {
    /// Reads configuration from process environment variables.
    ///
    /// | Variable | Meaning |
    /// | --- | --- |
    /// | `OPENAI_API_KEY` | backend credential; blank counts as unset |
    /// | `OPENAI_BASE_URL` | backend API root |
    /// | `OPENAI_MODEL` | backend model |
    /// | `AINOTES_BACKEND_TIMEOUT_SECS` | request timeout in seconds |
    /// | `AINOTES_AUTOSAVE_MS` | autosave quiet period in milliseconds |
    /// | `AINOTES_DB` | database file path |
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_timeout = match non_blank("AINOTES_BACKEND_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.trim()
                    .parse()
                    .with_context(|| format!("Invalid AINOTES_BACKEND_TIMEOUT_SECS: {raw}"))?,
            ),
            None => defaults.backend_timeout,
        };

        let autosave_quiet = match non_blank("AINOTES_AUTOSAVE_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .with_context(|| format!("Invalid AINOTES_AUTOSAVE_MS: {raw}"))?,
            ),
            None => defaults.autosave_quiet,
        };

        Ok(Self {
            api_key: non_blank("OPENAI_API_KEY"),
            base_url: non_blank("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: non_blank("OPENAI_MODEL").unwrap_or(defaults.model),
            backend_timeout,
            autosave_quiet,
            db_path: non_blank("AINOTES_DB").map(PathBuf::from),
        })
    }

    /// Returns the database path to use.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => default_database_path(),
        }
    }
}

/// Gets the cross-platform database path.
///
/// Returns the path as `{data_dir}/ainotes/notes.db` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
pub fn default_database_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("ainotes").join("notes.db"))
}

/// Ensures the parent directory of the database file exists.
pub fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}
