use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use super::Destination;
use super::commit_message::{CommitGenerator, origin_reference_from_log};
use crate::config::{ConfigError, GitOptions};
use crate::error::{DestinationError, ErrorKind, Result};
use crate::git::{Author, FETCHED_HEAD, GitRepository};

/// A git repository destination.
///
/// Creates a commit in a git repository from the transformed working tree.
/// Each call works in its own scratch clone, so nothing is kept between calls.
#[derive(Debug)]
pub struct GitDestination {
    url: String,
    pull_from_ref: String,
    push_to_ref: String,
    author: Author,
    options: GitOptions,
    verbose: bool,
    commit_generator: Box<dyn CommitGenerator>,
}

impl GitDestination {
    /// # Errors
    /// [`ConfigError::Missing`] when `url`, `pull_from_ref`, `push_to_ref` or
    /// the author name is empty.
    pub fn new(
        url: String,
        pull_from_ref: String,
        push_to_ref: String,
        author: Author,
        options: GitOptions,
        verbose: bool,
        commit_generator: Box<dyn CommitGenerator>,
    ) -> std::result::Result<Self, ConfigError> {
        for (value, field) in [
            (&url, "url"),
            (&pull_from_ref, "pull_from_ref"),
            (&push_to_ref, "push_to_ref"),
            (&author.name, "author"),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(field));
            }
        }
        Ok(GitDestination {
            url,
            pull_from_ref,
            push_to_ref,
            author,
            options,
            verbose,
            commit_generator,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    /// Init a scratch clone and fetch the baseline into it.
    ///
    /// The pull ref has to exist unless first-commit mode is on, in which
    /// case it must not exist.
    fn clone_baseline(&self) -> Result<GitRepository> {
        let scratch =
            GitRepository::init_scratch(self.options.scratch_dir.as_deref(), self.verbose)?;
        match scratch.fetch(&self.url, &self.pull_from_ref) {
            Ok(_) if self.options.first_commit => Err(DestinationError::FirstCommitConflict {
                reference: self.pull_from_ref.clone(),
                url: self.url.clone(),
            }),
            Ok(baseline) => {
                debug!(commit = %baseline, reference = %self.pull_from_ref, "fetched baseline");
                Ok(scratch)
            }
            Err(e) if e.kind() == ErrorKind::RefNotFound => {
                if self.options.first_commit {
                    Ok(scratch)
                } else {
                    Err(DestinationError::MissingBaseline {
                        reference: self.pull_from_ref.clone(),
                        url: self.url.clone(),
                    })
                }
            }
            Err(e) => Err(e),
        }
    }
}

impl Destination for GitDestination {
    fn process(
        &self,
        workdir: &Path,
        origin_ref: &str,
        timestamp: i64,
        summary: &str,
    ) -> Result<()> {
        info!("Exporting {} to: {}", workdir.display(), self);

        let scratch = self.clone_baseline()?;
        if !self.options.first_commit {
            scratch.checkout_fetched_head()?;
        }
        scratch.set_identity(
            self.options.committer_name.as_deref(),
            self.options.committer_email.as_deref(),
        )?;

        let alternate = scratch.with_work_tree(workdir)?;
        alternate.stage_all()?;
        let message = self
            .commit_generator
            .message(summary, &alternate, origin_ref)?;
        let commit = alternate.commit(&self.author, timestamp, &message)?;
        alternate.push(&self.url, "HEAD", &self.push_to_ref)?;

        info!(%commit, origin_ref, push_to_ref = %self.push_to_ref, "pushed");
        Ok(())
    }

    fn previous_ref(&self) -> Result<Option<String>> {
        if self.options.first_commit {
            return Ok(None);
        }
        let scratch = self.clone_baseline()?;
        let commit = scratch.resolve(FETCHED_HEAD)?;
        let log = scratch.read_log(commit, 1)?;
        let found = origin_reference_from_log(&log);
        debug!(%commit, previous = ?found, "looked up previous origin reference");
        Ok(found)
    }
}

impl fmt::Display for GitDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GitDestination{{url={}, pull_from_ref={}, push_to_ref={}, git_options={:?}, verbose={}, commit_generator={:?}}}",
            self.url,
            self.pull_from_ref,
            self.push_to_ref,
            self.options,
            self.verbose,
            self.commit_generator
        )
    }
}
