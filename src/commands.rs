use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{self, Write};
use std::path::Path;

use crate::destination::Destination;
use crate::progress::spinner;

/// CLI command: publish `workdir` as a new commit on the destination.
///
/// Shows a spinner while the scratch clone is fetched, committed and pushed,
/// then prints a check mark or cross with the outcome to stderr.
///
/// # Errors
/// Returns the destination error with the failing operation as context.
pub fn cmd_publish(
    dest: &dyn Destination,
    workdir: &Path,
    origin_ref: &str,
    timestamp: i64,
    summary: &str,
    verbose: bool,
) -> Result<()> {
    let pb = spinner(format!("publishing {}", workdir.display()), verbose);
    let res = dest.process(workdir, origin_ref, timestamp, summary);
    pb.finish_and_clear();

    match res {
        Ok(()) => {
            eprintln!("{} published {}", "✔".green(), origin_ref);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} publish {} failed", "✘".red(), origin_ref);
            Err(e).with_context(|| format!("publishing {}", workdir.display()))
        }
    }
}

/// CLI command: print the origin reference of the last published commit.
///
/// Prints nothing (and succeeds) when there is none.
pub fn cmd_previous_ref(dest: &dyn Destination, verbose: bool) -> Result<()> {
    let pb = spinner("looking up previous origin reference".to_string(), verbose);
    let res = dest.previous_ref();
    pb.finish_and_clear();

    if let Some(r) = res.context("looking up previous origin reference")? {
        writeln!(io::stdout(), "{}", r)?;
    }
    Ok(())
}
