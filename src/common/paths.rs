use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Name of the generated settings file inside the harness root.
pub const SETTINGS_FILE: &str = "settings.py";

/// Default download directory for `getrpms`, relative to the harness root.
pub const DEFAULT_RPM_DIR: &str = "./site/rpms";

/// Path of the generated settings file for a harness root.
pub fn settings_file(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

/// Directory holding the debug command log.
pub fn state_dir() -> Result<PathBuf> {
    let state_dir = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .context("Unable to determine user state directory")?
        .join("afs-robotest");

    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("creating state directory at {}", state_dir.display()))?;

    Ok(state_dir)
}

pub fn command_log_file() -> Result<PathBuf> {
    Ok(state_dir()?.join("commands.jsonl"))
}

/// Line history of interactive setup sessions.
pub fn setup_history_file() -> Result<PathBuf> {
    Ok(state_dir()?.join("setup_history"))
}
