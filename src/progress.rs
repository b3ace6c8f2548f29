use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Start a stderr spinner showing `message` and the elapsed time.
///
/// Returns a hidden bar when `verbose` is set, so debug logs are not
/// interleaved with spinner redraws.
pub fn spinner(message: String, verbose: bool) -> ProgressBar {
    if verbose {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {wide_msg} {elapsed:.dim}") {
        pb.set_style(style.tick_chars("-\\|/ "));
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
