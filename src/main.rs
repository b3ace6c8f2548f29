//! # gitdest
//!
//! **gitdest** publishes a transformed working tree to a git repository as a
//! single commit and reports which origin reference was published last.
//!
//! Features:
//! - Destination settings live in `$(gitdest home)/destination.toml`
//! - `gitdest publish` commits a working tree on top of the pull ref and pushes it
//! - `gitdest previous-ref` prints the origin reference of the last published commit
//! - `gitdest home` prints the gitdest config directory
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use gitdest::{
    DestinationFile, GitDestination, cmd_previous_ref, cmd_publish, default_config_path,
    gitdest_home, init_logging, load_config,
};
use std::path::PathBuf;

/// Command-line interface definition.
///
/// Parsed using `clap` derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "gitdest",
    version,
    about = "gitdest - publish migrated trees as git commits",
    arg_required_else_help = true
)]
struct Cli {
    /// Destination config file (default: $(gitdest home)/destination.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log every repository operation
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    git: GitFlags,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

/// Overrides for the `[git]` table of the config file.
#[derive(Args, Debug)]
struct GitFlags {
    /// Push even though the pull ref does not exist yet (creates a root commit)
    #[arg(long, global = true)]
    git_first_commit: bool,

    /// Committer name for the new commit
    #[arg(long, global = true)]
    git_committer_name: Option<String>,

    /// Committer email for the new commit
    #[arg(long, global = true)]
    git_committer_email: Option<String>,

    /// Directory to create scratch clones in
    #[arg(long, global = true)]
    git_scratch_dir: Option<PathBuf>,
}

impl GitFlags {
    fn apply(self, file: &mut DestinationFile) {
        if self.git_first_commit {
            file.git.first_commit = true;
        }
        if self.git_committer_name.is_some() {
            file.git.committer_name = self.git_committer_name;
        }
        if self.git_committer_email.is_some() {
            file.git.committer_email = self.git_committer_email;
        }
        if self.git_scratch_dir.is_some() {
            file.git.scratch_dir = self.git_scratch_dir;
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Cmd {
    /// Commit a working tree on top of the pull ref and push it
    Publish {
        /// Directory holding the desired new state of the repository
        #[arg(long)]
        workdir: PathBuf,
        /// Origin reference recorded in the commit message
        #[arg(long)]
        origin_ref: String,
        /// Author date in seconds since the epoch (default: now)
        #[arg(long)]
        timestamp: Option<i64>,
        /// Commit message summary
        #[arg(long, default_value = "")]
        summary: String,
    },
    /// Print the origin reference of the last published commit
    PreviousRef,
    /// Print the gitdest config directory
    Home,
}

/// Load the config file, apply command-line overrides, start logging and
/// build the destination. Returns the destination and the effective verbosity.
fn build_destination(
    config: Option<PathBuf>,
    git: GitFlags,
    verbose: bool,
) -> Result<(GitDestination, bool)> {
    let path = match config {
        Some(p) => p,
        None => default_config_path()?,
    };
    let mut file = load_config(&path)?;
    git.apply(&mut file);
    file.verbose |= verbose;
    let verbose = file.verbose;
    init_logging(verbose);
    Ok((file.into_destination()?, verbose))
}

/// CLI entry point.
///
/// Parses arguments with `clap` and executes the selected subcommand.
fn main() -> Result<()> {
    let Cli {
        config,
        verbose,
        git,
        cmd,
    } = Cli::parse();
    let Some(cmd) = cmd else {
        return Ok(());
    };

    match cmd {
        Cmd::Publish {
            workdir,
            origin_ref,
            timestamp,
            summary,
        } => {
            let (dest, verbose) = build_destination(config, git, verbose)?;
            let ts = timestamp.unwrap_or_else(|| Utc::now().timestamp());
            cmd_publish(&dest, &workdir, &origin_ref, ts, &summary, verbose)
        }
        Cmd::PreviousRef => {
            let (dest, verbose) = build_destination(config, git, verbose)?;
            cmd_previous_ref(&dest, verbose)
        }
        Cmd::Home => {
            println!("{}", gitdest_home()?.display());
            Ok(())
        }
    }
}
