//! Crate entry point for **gitdest**.
//!
//! gitdest is the git destination of a source-migration pipeline: it publishes
//! a prepared working tree as a new commit on a remote repository, recording
//! the origin reference in the commit message, and can read back which origin
//! reference was published last.
//!
//! Each submodule encapsulates one responsibility (config parsing, git
//! operations, the publish protocol, CLI commands). The `pub use` re-exports
//! make the pipeline-facing API available from the crate root.

mod commands;
mod config;
mod destination;
mod error;
mod git;
mod logging;
mod paths;
mod progress;
#[cfg(test)]
mod test_support;

pub use commands::{cmd_previous_ref, cmd_publish};
pub use config::{ConfigError, DestinationFile, DestinationSection, GitOptions, load_config};
pub use destination::{
    CommitGenerator, DefaultCommitGenerator, Destination, GitDestination, ORIGIN_REFERENCE_FIELD,
    origin_reference_from_log,
};
pub use error::{DestinationError, ErrorKind, Result};
pub use git::{Author, GitRepository};
pub use logging::init_logging;
pub use paths::{default_config_path, gitdest_home};
