//! Shell command execution.
//!
//! Every host-side effect (package manager calls, copies, removals) goes
//! through an [`Executor`], which runs a command line, captures the combined
//! output and turns a nonzero exit into a [`CommandError`].

use duct::cmd;
use thiserror::Error;

use super::command_log::CommandLogger;
use crate::ui;

/// Prefix for commands that need elevated privileges. `-n` keeps sudo from
/// prompting, so a missing sudoers rule shows up as a plain failure.
pub const SUDO: &str = "sudo -n";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command failed (rc={rc})")]
    Failed { rc: i32, output: String },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait Executor {
    /// Run `cmdline` through the shell and return its output.
    fn run(&self, cmdline: &str) -> Result<String, CommandError>;

    /// Run `cmdline` with `input` on its stdin. Only `cmdline` is logged.
    fn run_with_input(&self, cmdline: &str, input: &str) -> Result<String, CommandError>;

    /// Run `cmdline` with elevated privileges.
    fn sudo(&self, cmdline: &str) -> Result<String, CommandError> {
        self.run(&format!("{} {}", SUDO, cmdline))
    }
}

/// Runs commands with `sh -c`, stderr merged into stdout.
#[derive(Debug, Default)]
pub struct ShellExecutor {
    logger: Option<CommandLogger>,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also append every command to the debug command log.
    pub fn with_logger(logger: CommandLogger) -> Self {
        Self {
            logger: Some(logger),
        }
    }
}

impl ShellExecutor {
    fn execute(&self, cmdline: &str, input: Option<&str>) -> Result<String, CommandError> {
        ui::debug("command.run", &format!("cmd={}", cmdline));

        let mut expression = cmd!("sh", "-c", cmdline)
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked();
        if let Some(input) = input {
            expression = expression.stdin_bytes(input.as_bytes().to_vec());
        }
        let output = expression
            .run()
            .map_err(|source| CommandError::Spawn {
                command: cmdline.to_string(),
                source,
            })?;

        let rc = output.status.code().unwrap_or(-1);
        let text = String::from_utf8_lossy(&output.stdout)
            .trim_end_matches('\n')
            .to_string();

        ui::debug("command.rc", &format!("rc={}", rc));
        ui::debug("command.output", &format!("output={}", text));

        if let Some(logger) = &self.logger
            && let Err(e) = logger.log_command(cmdline, rc, &text)
        {
            ui::debug("command.log_failed", &format!("Could not write command log: {e}"));
        }

        if rc != 0 {
            return Err(CommandError::Failed { rc, output: text });
        }
        Ok(text)
    }
}

impl Executor for ShellExecutor {
    fn run(&self, cmdline: &str) -> Result<String, CommandError> {
        self.execute(cmdline, None)
    }

    fn run_with_input(&self, cmdline: &str, input: &str) -> Result<String, CommandError> {
        self.execute(cmdline, Some(input))
    }
}

/// Run a command line with the terminal attached and return its exit code.
pub fn run_attached(cmdline: &str) -> Result<i32, CommandError> {
    let output = cmd!("sh", "-c", cmdline)
        .unchecked()
        .run()
        .map_err(|source| CommandError::Spawn {
            command: cmdline.to_string(),
            source,
        })?;
    Ok(output.status.code().unwrap_or(-1))
}

/// Quote a path or word for use in a command line.
pub fn quote(s: &str) -> String {
    shell_words::quote(s).into_owned()
}
