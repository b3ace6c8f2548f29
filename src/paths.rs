use anyhow::Result;
use std::{env, path::PathBuf};

/// Directory holding gitdest configuration.
///
/// `$GITDEST_HOME` when set and non-empty, otherwise `$XDG_CONFIG_HOME/gitdest`,
/// or `$HOME/.config/gitdest` when that is unset too.
pub fn gitdest_home() -> Result<PathBuf> {
    if let Some(home) = env::var_os("GITDEST_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    let xdg = env::var_os("XDG_CONFIG_HOME");
    let base = xdg
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config"));
    Ok(base.join("gitdest"))
}

/// Default location of the destination config file.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(gitdest_home()?.join("destination.toml"))
}
