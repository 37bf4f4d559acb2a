//! Harness settings persisted in `<root>/settings.py`.

mod file;
mod store;
mod table;

pub use store::{SettingValue, Settings};
pub use table::{SETTINGS, SettingDef, SettingKind, lookup};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Expected 'true' or 'false' for {name}, got '{value}'")]
    InvalidBool { name: String, value: String },

    #[error("Expected an integer for {name}, got '{value}'")]
    InvalidInt { name: String, value: String },

    #[error("Invalid setting name '{0}'")]
    InvalidName(String),

    #[error("settings file line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
