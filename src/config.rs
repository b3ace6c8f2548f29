use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::destination::{DefaultCommitGenerator, GitDestination};
use crate::git::Author;

/// Reasons a destination configuration is rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field '{0}'")]
    Missing(&'static str),
    #[error("invalid author '{0}', expected 'Name <email>'")]
    InvalidAuthor(String),
}

/// Top-level structure of `destination.toml`.
///
/// Every field is optional here; required fields are checked by
/// [`DestinationFile::into_destination`]. Unknown keys are rejected, so a
/// key placed in the wrong table fails to parse.
///
/// Example TOML:
/// ```toml
/// verbose = false
///
/// [destination]
/// url           = "https://example.com/project.git"
/// pull_from_ref = "master"
/// push_to_ref   = "refs/for/master"
/// author        = "Import Bot <import-bot@example.com>"
///
/// [git]
/// committer_name  = "Import Bot"
/// committer_email = "import-bot@example.com"
/// first_commit    = false
/// scratch_dir     = "/var/tmp/gitdest"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationFile {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub destination: DestinationSection,
    #[serde(default)]
    pub git: GitOptions,
}

/// The `[destination]` table.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DestinationSection {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pull_from_ref: Option<String>,
    #[serde(default)]
    pub push_to_ref: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// Git specific options, settable from the `[git]` table or the command line.
#[derive(Debug, Default, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GitOptions {
    #[serde(default)]
    pub committer_name: Option<String>,
    #[serde(default)]
    pub committer_email: Option<String>,
    /// The pull ref must not exist yet; the commit becomes a root commit.
    #[serde(default)]
    pub first_commit: bool,
    /// Base directory for scratch clones, the system temp dir otherwise.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

fn check_not_missing(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(field)),
    }
}

impl DestinationFile {
    /// Validate the file and build the destination with the default commit
    /// message generator.
    pub fn into_destination(self) -> Result<GitDestination, ConfigError> {
        let d = self.destination;
        let url = check_not_missing(d.url, "url")?;
        let pull_from_ref = check_not_missing(d.pull_from_ref, "pull_from_ref")?;
        let push_to_ref = check_not_missing(d.push_to_ref, "push_to_ref")?;
        let author = check_not_missing(d.author, "author")?.parse::<Author>()?;

        GitDestination::new(
            url,
            pull_from_ref,
            push_to_ref,
            author,
            self.git,
            self.verbose,
            Box::new(DefaultCommitGenerator),
        )
    }
}

/// Parse `destination.toml` text.
pub fn parse_config(txt: &str) -> Result<DestinationFile> {
    toml::from_str(txt).context("failed to parse destination config")
}

/// Load and parse the config file at `path`.
///
/// # Errors
/// - Returns an error if the file cannot be read; the message includes the path.
/// - Returns an error if parsing the TOML fails.
pub fn load_config(path: &Path) -> Result<DestinationFile> {
    let txt = fs::read_to_string(path)
        .with_context(|| format!("config not found: {}", path.display()))?;
    parse_config(&txt)
}
