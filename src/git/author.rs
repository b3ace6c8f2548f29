use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::config::ConfigError;

/// Commit identity in the `Name <email>` form accepted by `git commit --author`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

fn author_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([^<>]*?)\s*<([^<>]*)>\s*$").expect("static regex"))
}

impl FromStr for Author {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = author_re()
            .captures(s)
            .ok_or_else(|| ConfigError::InvalidAuthor(s.to_string()))?;
        let name = caps[1].to_string();
        let email = caps[2].trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::InvalidAuthor(s.to_string()));
        }
        Ok(Author { name, email })
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}
