//! Destinations publish a prepared working tree as a new commit and report
//! which origin reference was published last.

mod commit_message;
mod git_destination;

use std::path::Path;

use crate::error::Result;

pub use commit_message::{
    CommitGenerator, DefaultCommitGenerator, ORIGIN_REFERENCE_FIELD, origin_reference_from_log,
};
pub use git_destination::GitDestination;

/// Contract between the migration pipeline and a destination.
pub trait Destination {
    /// Publish `workdir` as a single commit recording `origin_ref`.
    ///
    /// `timestamp` is the author date in seconds since the epoch (UTC).
    fn process(&self, workdir: &Path, origin_ref: &str, timestamp: i64, summary: &str)
    -> Result<()>;

    /// Origin reference of the most recently published commit, if any.
    fn previous_ref(&self) -> Result<Option<String>>;
}
