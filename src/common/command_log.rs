use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::paths;

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandLogEntry {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub rc: i32,
    pub output: String,
    pub success: bool,
}

/// Appends executed commands as JSON lines. Only used in debug mode.
#[derive(Debug, Clone)]
pub struct CommandLogger {
    log_file: PathBuf,
}

impl CommandLogger {
    pub fn new() -> Result<Self> {
        Ok(Self::at(paths::command_log_file()?))
    }

    pub fn at(log_file: impl Into<PathBuf>) -> Self {
        Self {
            log_file: log_file.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.log_file
    }

    pub fn log_command(&self, command: &str, rc: i32, output: &str) -> Result<()> {
        let entry = CommandLogEntry {
            timestamp: Utc::now(),
            command: command.to_string(),
            rc,
            output: output.to_string(),
            success: rc == 0,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .with_context(|| format!("opening command log {}", self.log_file.display()))?;

        let json_line =
            serde_json::to_string(&entry).context("Failed to serialize command log entry")?;
        writeln!(file, "{json_line}").context("Failed to write to command log")?;

        Ok(())
    }

    #[cfg(test)]
    pub fn entries(&self) -> Result<Vec<CommandLogEntry>> {
        if !self.log_file.exists() {
            return Ok(Vec::new());
        }

        let content =
            std::fs::read_to_string(&self.log_file).context("Failed to read command log")?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("Failed to parse command log entry"))
            .collect()
    }
}
