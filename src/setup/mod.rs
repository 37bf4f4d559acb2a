//! Interactive setup shell for the test harness.
//!
//! Reads one command per line from a script, a terminal or a pipe. Only a
//! terminal gets the banner, the `(setup) ` prompt, line history and tab
//! completion. Every command works
//! on the same [`Settings`], which are saved whenever they change and again
//! on `quit` or end of input.

mod commands;
mod complete;
pub mod keytab;
pub mod partition;

pub use commands::fetch_rpms;
pub use keytab::{KadminKeytabs, Keytabs};

use anyhow::{Context, Result, bail};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::path::Path;

use crate::common::Executor;
use crate::common::paths;
use crate::download::DownloadOptions;
use crate::settings::Settings;
use crate::ui::prelude::*;

use commands::Args;
use complete::SetupCompleter;

pub const PROMPT: &str = "(setup) ";
pub const BANNER: &str = "OpenAFS RoboTest Setup\nType help for information.";

/// Nested `call` files deeper than this are refused.
const MAX_CALL_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct SetupShell {
    settings: Settings,
    exec: Box<dyn Executor>,
    keytabs: Box<dyn Keytabs>,
    download: DownloadOptions,
    out: Box<dyn Write>,
    depth: usize,
}

impl SetupShell {
    pub fn new(settings: Settings, exec: Box<dyn Executor>, keytabs: Box<dyn Keytabs>) -> Self {
        Self {
            settings,
            exec,
            keytabs,
            download: DownloadOptions::default(),
            out: Box::new(io::stdout()),
            depth: 0,
        }
    }

    /// Base options for `getrpms`; the directory comes from the command.
    pub fn with_download_options(mut self, options: DownloadOptions) -> Self {
        self.download = options;
        self
    }

    #[cfg(test)]
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the commands in `path` without prompting.
    pub fn run_script(&mut self, path: &Path) -> Result<()> {
        let file =
            File::open(path).with_context(|| format!("Unable to open input-file {}", path.display()))?;
        self.run(BufReader::new(file))
    }

    /// Run commands from stdin, with line editing when it is a terminal.
    pub fn run_stdin(&mut self) -> Result<()> {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            return self.run_terminal();
        }
        self.run(stdin.lock())
    }

    /// Prompt with history and tab completion until `quit` or end of input.
    fn run_terminal(&mut self) -> Result<()> {
        let mut editor: Editor<SetupCompleter, DefaultHistory> =
            Editor::new().context("starting the line editor")?;
        editor.set_helper(Some(SetupCompleter::new()));
        let history = paths::setup_history_file().ok();
        if let Some(path) = &history
            && let Err(e) = editor.load_history(path)
        {
            debug("setup.history", &format!("No history loaded: {}", e));
        }

        writeln!(self.out, "{}", BANNER)?;
        loop {
            if let Some(helper) = editor.helper_mut() {
                helper.set_names(self.settings.names());
            }
            match editor.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    if self.execute(&line) == Flow::Quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    writeln!(self.out)?;
                    self.execute("quit");
                    break;
                }
                Err(e) => return Err(e).context("reading a command"),
            }
        }

        if let Some(path) = &history
            && let Err(e) = editor.save_history(path)
        {
            debug("setup.history", &format!("Could not save history: {}", e));
        }
        Ok(())
    }

    /// Read and execute lines until `quit` or end of input.
    pub fn run<R: BufRead>(&mut self, mut input: R) -> Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if input.read_line(&mut line)? == 0 {
                self.execute("quit");
                return Ok(());
            }
            if self.execute(&line) == Flow::Quit {
                return Ok(());
            }
        }
    }

    fn run_nested<R: BufRead>(&mut self, input: R) -> Result<()> {
        if self.depth >= MAX_CALL_DEPTH {
            bail!("call files nested more than {} deep", MAX_CALL_DEPTH);
        }
        self.depth += 1;
        let result = self.run(input);
        self.depth -= 1;
        result
    }

    /// Execute one line. Failures are reported and never stop the shell.
    pub fn execute(&mut self, line: &str) -> Flow {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Flow::Continue;
        }
        let (name, rest) = match line.strip_prefix('!') {
            Some(rest) => ("shell", rest),
            None => line.split_once(char::is_whitespace).unwrap_or((line, "")),
        };

        let Some(command) = commands::find(name) else {
            let _ = writeln!(self.out, "*** Unknown syntax: {}", line);
            return Flow::Continue;
        };

        let result = Args::parse(rest, command.arity).and_then(|args| {
            if !command.arity.accepts(&args) {
                writeln!(self.out, "usage: {}", command.syntax)?;
                return Ok(Flow::Continue);
            }
            (command.run)(self, &args)
        });

        match result {
            Ok(flow) => flow,
            Err(e) => {
                emit(Level::Error, "setup.fail", &format!("Fail: {:#}", e), None);
                Flow::Continue
            }
        }
    }
}
