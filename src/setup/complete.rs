//! Tab completion for the interactive setup shell.

use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use super::commands::COMMANDS;
use crate::download::Platform;
use crate::settings::{self, SettingKind};

const KEY_TYPES: &[&str] = &["afs", "user", "admin"];

/// What the word under the cursor should be completed from.
#[derive(Debug, PartialEq, Eq)]
enum Target {
    Words(Vec<String>),
    Path,
}

/// Completes command names, setting names and values, and file names.
#[derive(Default)]
pub struct SetupCompleter {
    /// Setting names of the running session, unknown ones included.
    names: Vec<String>,
    files: FilenameCompleter,
}

impl SetupCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_names(&mut self, names: Vec<String>) {
        self.names = names;
    }

    /// Start of the word being completed and where its candidates come from.
    fn target(&self, line: &str) -> (usize, Target) {
        let start = line
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(i, c)| i + c.len_utf8());
        let prefix = &line[start..];
        let words: Vec<&str> = line[..start].split_whitespace().collect();

        let Some((&command, args)) = words.split_first() else {
            let names = COMMANDS.iter().map(|c| c.name);
            return (start, Target::Words(starting_with(names, prefix)));
        };

        let target = match (command, args.len()) {
            ("help", 0) => Target::Words(starting_with(COMMANDS.iter().map(|c| c.name), prefix)),
            ("set" | "unset", 0) => Target::Words(self.setting_names(prefix)),
            ("set", 1) => setting_values(args[0], prefix),
            ("genkey", 0) => Target::Words(starting_with(KEY_TYPES.iter().copied(), prefix)),
            ("getrpms", 1) => Target::Words(starting_with(Platform::ALL.iter().map(|p| p.as_str()), prefix)),
            ("getrpms", 2) | ("call", 0) => Target::Path,
            _ => Target::Words(Vec::new()),
        };
        (start, target)
    }

    /// Names in the case the user started typing; lower case by default.
    fn setting_names(&self, prefix: &str) -> Vec<String> {
        let upper = prefix.to_uppercase();
        let keep_upper = !prefix.is_empty() && prefix == upper;
        self.names
            .iter()
            .filter(|name| name.starts_with(&upper))
            .map(|name| if keep_upper { name.clone() } else { name.to_lowercase() })
            .collect()
    }
}

fn setting_values(name: &str, prefix: &str) -> Target {
    let Some(def) = settings::lookup(&name.to_uppercase()) else {
        return Target::Words(Vec::new());
    };
    match def.kind {
        SettingKind::Bool => Target::Words(starting_with(["true", "false"], prefix)),
        SettingKind::Enum => Target::Words(starting_with(def.choices.iter().copied(), prefix)),
        SettingKind::Path => Target::Path,
        SettingKind::Int | SettingKind::String => Target::Words(Vec::new()),
    }
}

fn starting_with<'a>(candidates: impl IntoIterator<Item = &'a str>, prefix: &str) -> Vec<String> {
    candidates
        .into_iter()
        .filter(|c| c.starts_with(prefix))
        .map(str::to_string)
        .collect()
}

impl Completer for SetupCompleter {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        match self.target(&line[..pos]) {
            (_, Target::Path) => self.files.complete(line, pos, ctx),
            (start, Target::Words(words)) => Ok((
                start,
                words
                    .into_iter()
                    .map(|word| Pair {
                        display: word.clone(),
                        replacement: word,
                    })
                    .collect(),
            )),
        }
    }
}

impl Hinter for SetupCompleter {
    type Hint = String;
}

impl Highlighter for SetupCompleter {}

impl Validator for SetupCompleter {}

impl Helper for SetupCompleter {}
