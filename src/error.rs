use thiserror::Error;

use crate::config::ConfigError;

/// Failure category of a [`DestinationError`].
///
/// Callers branch on the kind instead of matching individual variants, so
/// new variants can be added without breaking the "not found" vs. "other
/// failure" distinction the orchestrator relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested ref is not advertised by the remote.
    RefNotFound,
    /// The first-commit policy was violated.
    PolicyViolation,
    /// Any other local or remote repository failure.
    Repository,
    /// Invalid or incomplete destination configuration.
    Config,
}

#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("'{reference}' doesn't exist in '{url}'")]
    RefNotFound { reference: String, url: String },

    #[error(
        "'{reference}' doesn't exist in '{url}'. Use --git-first-commit flag if you want to push anyway"
    )]
    MissingBaseline { reference: String, url: String },

    #[error("'{reference}' already exists in '{url}'.")]
    FirstCommitConflict { reference: String, url: String },

    #[error("push to '{reference}' was rejected: {message}")]
    PushRejected { reference: String, message: String },

    #[error("nothing to commit, working tree matches the baseline")]
    NothingToCommit,

    #[error("git {op}: {source}")]
    Git {
        op: &'static str,
        #[source]
        source: git2::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DestinationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RefNotFound { .. } | Self::MissingBaseline { .. } => ErrorKind::RefNotFound,
            Self::FirstCommitConflict { .. } => ErrorKind::PolicyViolation,
            Self::PushRejected { .. } | Self::NothingToCommit | Self::Git { .. } | Self::Io(_) => {
                ErrorKind::Repository
            }
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

/// Attach the name of the failing git operation to a `git2::Error`.
///
/// ```ignore
/// repo.index().map_err(git("index"))?;
/// ```
pub(crate) fn git(op: &'static str) -> impl FnOnce(git2::Error) -> DestinationError {
    move |source| DestinationError::Git { op, source }
}

pub type Result<T> = std::result::Result<T, DestinationError>;
