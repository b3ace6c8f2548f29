use std::fmt;

use crate::error::Result;
use crate::git::GitRepository;

/// Trailer label that records the origin reference in every commit message.
///
/// Shared by [`DefaultCommitGenerator`] and the reverse lookup in
/// [`origin_reference_from_log`]; changing it breaks lookups of commits
/// published earlier.
pub const ORIGIN_REFERENCE_FIELD: &str = "OriginRef";

/// Builds the message of the commit a destination is about to create.
///
/// `repo` is the handle whose index holds the staged change, so a generator
/// may inspect it. Implementations must end the message with the line
/// `<ORIGIN_REFERENCE_FIELD>: <origin_ref>`, otherwise
/// [`crate::Destination::previous_ref`] silently returns `None`.
pub trait CommitGenerator: fmt::Debug {
    fn message(&self, summary: &str, repo: &GitRepository, origin_ref: &str) -> Result<String>;
}

/// Appends the origin trailer to the user supplied summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCommitGenerator;

impl CommitGenerator for DefaultCommitGenerator {
    fn message(&self, summary: &str, _repo: &GitRepository, origin_ref: &str) -> Result<String> {
        Ok(format!(
            "{}\n{}: {}\n",
            summary, ORIGIN_REFERENCE_FIELD, origin_ref
        ))
    }
}

/// Extract the origin reference from rendered `git log` output.
///
/// Returns the rest of the first line starting with
/// `"    <ORIGIN_REFERENCE_FIELD>: "`, the four-space indent being how the log
/// renders message bodies.
pub fn origin_reference_from_log(log: &str) -> Option<String> {
    let prefix = format!("    {}: ", ORIGIN_REFERENCE_FIELD);
    log.split('\n')
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .map(str::to_string)
}
