//! Where session settings come from
//!
//! The process environment always wins. Missing values are filled from the
//! first env file found, in order: `--env-file`, `.env` in the working
//! directory, then `<config dir>/deskbridge/env`.

use anyhow::{bail, Context, Result};
use deskbridge_core::SessionConfig;
use std::path::{Path, PathBuf};

pub const LOCAL_ENV_FILE: &str = ".env";

/// Per-user settings file, e.g. `~/.config/deskbridge/env` on Linux
pub fn user_env_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("deskbridge").join("env"))
}

/// Pick the env file to read, if any
pub fn resolve_env_file(
    explicit: Option<&Path>,
    working_dir: &Path,
    user_file: Option<&Path>,
) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("env file {} does not exist", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = working_dir.join(LOCAL_ENV_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }

    Ok(user_file.filter(|path| path.is_file()).map(Path::to_path_buf))
}

/// Build the session configuration for this invocation
pub fn load_session_config(explicit: Option<&Path>) -> Result<SessionConfig> {
    let working_dir = std::env::current_dir().context("Failed to read the working directory")?;
    let user_file = user_env_file();

    match resolve_env_file(explicit, &working_dir, user_file.as_deref())? {
        Some(path) => {
            tracing::debug!("Reading settings from {}", path.display());
            SessionConfig::from_env_file(&path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))
        }
        None => SessionConfig::from_env().context("Failed to load settings from the environment"),
    }
}
