//! Git integration layer.
//!
//! This module wraps the `git2` backend behind [`GitRepository`], a handle on
//! an ephemeral scratch clone, and re-exports the pieces the destination
//! needs. Nothing outside this module talks to `git2` repositories directly.

mod author;
mod git2_backend;
mod log;

pub use author::Author;
pub use git2_backend::{FETCHED_HEAD, GitRepository};
