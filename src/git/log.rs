use chrono::{DateTime, FixedOffset, Offset, Utc};
use git2::Commit;

/// Render a commit the way `git log` does with the default `medium` format.
///
/// Message lines are indented by four spaces; the reverse lookup of origin
/// references depends on that indentation.
pub fn render_medium(commit: &Commit<'_>) -> String {
    let mut out = format!("commit {}\n", commit.id());
    if commit.parent_count() > 1 {
        let parents: Vec<String> = commit
            .parent_ids()
            .map(|id| id.to_string()[..7].to_string())
            .collect();
        out.push_str(&format!("Merge: {}\n", parents.join(" ")));
    }

    let author = commit.author();
    let when = author.when();
    out.push_str(&format!(
        "Author: {} <{}>\nDate:   {}\n\n",
        String::from_utf8_lossy(author.name_bytes()),
        String::from_utf8_lossy(author.email_bytes()),
        format_date(when.seconds(), when.offset_minutes())
    ));

    let message = String::from_utf8_lossy(commit.message_bytes());
    for line in message.trim_end_matches('\n').split('\n') {
        if !line.is_empty() {
            out.push_str("    ");
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// `Thu Jan 1 00:16:40 1970 +0000`
pub fn format_date(seconds: i64, offset_minutes: i32) -> String {
    let tz = FixedOffset::east_opt(offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    match DateTime::from_timestamp(seconds, 0) {
        Some(utc) => utc
            .with_timezone(&tz)
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string(),
        None => format!("{} {}", seconds, tz),
    }
}
