//! Setup shell commands.

use anyhow::{Context, Result, anyhow, bail};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use super::keytab::DEFAULT_ENCTYPE;
use super::partition::create_fake_partition;
use super::{Flow, SetupShell};
use crate::common::command::run_attached;
use crate::download::{self, DownloadOptions, release_from_files};
use crate::settings::{self, SETTINGS, SettingDef, Settings};
use crate::ui::prelude::*;

/// Accepted argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Between(usize, usize),
    /// The raw remainder of the line, holding at least this many words.
    Line(usize),
}

impl Arity {
    pub(super) fn accepts(&self, args: &Args) -> bool {
        match *self {
            Arity::Exactly(n) => args.words.len() == n,
            Arity::Between(min, max) => (min..=max).contains(&args.words.len()),
            Arity::Line(min) => args.rest.split_whitespace().count() >= min,
        }
    }
}

/// Arguments of one command line.
#[derive(Debug, Default)]
pub struct Args {
    /// Shell-style words; empty for [`Arity::Line`] commands.
    pub words: Vec<String>,
    /// Everything after the command name, trimmed.
    pub rest: String,
}

impl Args {
    pub fn parse(rest: &str, arity: Arity) -> Result<Self> {
        let rest = rest.trim().to_string();
        let words = match arity {
            Arity::Line(_) => Vec::new(),
            _ => shell_words::split(&rest).context("parsing arguments")?,
        };
        Ok(Self { words, rest })
    }
}

type Handler = fn(&mut SetupShell, &Args) -> Result<Flow>;

pub struct Command {
    pub name: &'static str,
    pub syntax: &'static str,
    pub summary: &'static str,
    /// Extra help lines shown by `help <name>`.
    pub details: &'static [&'static str],
    pub arity: Arity,
    pub run: Handler,
}

pub const COMMANDS: &[Command] = &[
    Command {
        name: "call",
        syntax: "call <filename>",
        summary: "Execute commands in a file.",
        details: &[],
        arity: Arity::Exactly(1),
        run: call,
    },
    Command {
        name: "genkey",
        syntax: "genkey afs|user|admin [<enctype>]",
        summary: "Add a kerberos principal then write the keys to a keytab file.",
        details: &[],
        arity: Arity::Between(1, 2),
        run: genkey,
    },
    Command {
        name: "getrpms",
        syntax: "getrpms <version> <platform> <directory>",
        summary: "Download RPM files.",
        details: &[
            "where: <version> is the openafs version number; e.g. 1.6.10",
            "       <platform> is one of: rhel5, rhel6, openSUSE_12.3",
            "       <directory> is the download destination; e.g. site/rpms",
        ],
        arity: Arity::Exactly(3),
        run: getrpms,
    },
    Command {
        name: "help",
        syntax: "help [<command>]",
        summary: "Display command help.",
        details: &[],
        arity: Arity::Between(0, 1),
        run: help,
    },
    Command {
        name: "list",
        syntax: "list",
        summary: "List setting names and values.",
        details: &[],
        arity: Arity::Exactly(0),
        run: list,
    },
    Command {
        name: "makepart",
        syntax: "makepart <id>",
        summary: "Create a fake fileserver partition.",
        details: &["where <id> is a..z, aa..iv"],
        arity: Arity::Exactly(1),
        run: makepart,
    },
    Command {
        name: "quit",
        syntax: "quit",
        summary: "Quit this program.",
        details: &[],
        arity: Arity::Exactly(0),
        run: quit,
    },
    Command {
        name: "reset",
        syntax: "reset",
        summary: "Reset all settings to default values.",
        details: &[],
        arity: Arity::Exactly(0),
        run: reset,
    },
    Command {
        name: "set",
        syntax: "set <name> <value>",
        summary: "Assign a setting value.",
        details: &[],
        arity: Arity::Line(2),
        run: set,
    },
    Command {
        name: "shell",
        syntax: "shell <command-line>",
        summary: "Run a command using the shell.",
        details: &["alias: ! <command-line>"],
        arity: Arity::Line(1),
        run: shell,
    },
    Command {
        name: "unset",
        syntax: "unset <name>",
        summary: "Remove a setting.",
        details: &[],
        arity: Arity::Exactly(1),
        run: unset,
    },
];

pub fn find(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.name == name)
}

fn quit(shell: &mut SetupShell, _: &Args) -> Result<Flow> {
    shell.settings.save()?;
    Ok(Flow::Quit)
}

fn help(shell: &mut SetupShell, args: &Args) -> Result<Flow> {
    let out = &mut shell.out;
    match args.words.first() {
        Some(name) => match find(name) {
            Some(command) => {
                writeln!(out, "{}", command.summary)?;
                writeln!(out)?;
                writeln!(out, "syntax: {}", command.syntax)?;
                for line in command.details {
                    writeln!(out, "{}", line)?;
                }
                if command.name == "set" {
                    describe_settings(out)?;
                }
            }
            None => match settings::lookup(&name.to_uppercase()) {
                Some(def) => describe_setting(out, def)?,
                None => writeln!(out, "No help found for '{}'.", name)?,
            },
        },
        None => {
            writeln!(out, "Commands. Type help <command> for syntax")?;
            writeln!(out, "{}", "=".repeat(60))?;
            for command in COMMANDS {
                writeln!(out, "{:<8}  {}", command.name, command.summary)?;
            }
        }
    }
    Ok(Flow::Continue)
}

fn describe_settings(out: &mut dyn Write) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "settings:")?;
    for def in SETTINGS {
        writeln!(out, "  {:<18}  {:<6}  {}", def.name, def.kind, def.description)?;
        if !def.choices.is_empty() {
            writeln!(out, "  {:<18}  {:<6}  one of: {}", "", "", def.choices.join(", "))?;
        }
    }
    Ok(())
}

fn describe_setting(out: &mut dyn Write, def: &SettingDef) -> Result<()> {
    writeln!(out, "{} ({})", def.name, def.kind)?;
    writeln!(out, "{}", def.description)?;
    if let Some(default) = def.default {
        writeln!(out, "default: {}", default)?;
    }
    if !def.choices.is_empty() {
        writeln!(out, "one of: {}", def.choices.join(", "))?;
    }
    Ok(())
}

fn shell(_: &mut SetupShell, args: &Args) -> Result<Flow> {
    let rc = run_attached(&args.rest)?;
    debug("setup.shell", &format!("rc={}", rc));
    Ok(Flow::Continue)
}

fn call(shell: &mut SetupShell, args: &Args) -> Result<Flow> {
    let filename = &args.words[0];
    let file = match File::open(filename) {
        Ok(file) => file,
        Err(e) => {
            emit(
                Level::Error,
                "setup.call",
                &format!("Unable to open input-file {}: {}", filename, e),
                None,
            );
            return Ok(Flow::Continue);
        }
    };
    shell.run_nested(BufReader::new(file))?;
    Ok(Flow::Continue)
}

fn list(shell: &mut SetupShell, _: &Args) -> Result<Flow> {
    for (name, value) in shell.settings.list() {
        writeln!(shell.out, "{:<18}  {}", name, value)?;
    }
    Ok(Flow::Continue)
}

fn set(shell: &mut SetupShell, args: &Args) -> Result<Flow> {
    let (name, value) = args
        .rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| anyhow!("Missing <value> argument."))?;
    shell.settings.set(name, value.trim_start())?;
    Ok(Flow::Continue)
}

fn unset(shell: &mut SetupShell, args: &Args) -> Result<Flow> {
    shell.settings.unset(&args.words[0])?;
    Ok(Flow::Continue)
}

fn reset(shell: &mut SetupShell, _: &Args) -> Result<Flow> {
    shell.settings.reset()?;
    Ok(Flow::Continue)
}

fn makepart(shell: &mut SetupShell, args: &Args) -> Result<Flow> {
    let path = create_fake_partition(shell.exec.as_ref(), &args.words[0])?;
    emit(
        Level::Success,
        "setup.makepart",
        &format!("Created fake partition {}", path.display()),
        None,
    );
    Ok(Flow::Continue)
}

fn genkey(shell: &mut SetupShell, args: &Args) -> Result<Flow> {
    let enctype = args.words.get(1).map(String::as_str);
    let verbose = shell.settings.get_bool("KRB_VERBOSE");
    shell.keytabs.set_verbose(verbose);
    match args.words[0].as_str() {
        "afs" => gen_afs_key(shell, enctype)?,
        "user" => gen_user_key(shell, "AFS_USER", "robotest", "KRB_USER_KEYTAB", "./site/user.keytab")?,
        "admin" => gen_user_key(
            shell,
            "AFS_ADMIN",
            "robotest/admin",
            "KRB_ADMIN_KEYTAB",
            "./site/admin.keytab",
        )?,
        other => bail!("Unknown key type argument '{}'; expected afs, user or admin", other),
    }
    Ok(Flow::Continue)
}

fn setting_or(shell: &SetupShell, name: &str, default: &str) -> String {
    shell
        .settings
        .get_text(name)
        .unwrap_or_else(|| default.to_string())
}

fn gen_afs_key(shell: &mut SetupShell, enctype: Option<&str>) -> Result<()> {
    let enctype = match enctype {
        Some(enctype) => enctype.to_string(),
        None => setting_or(shell, "KRB_AFS_ENCTYPE", DEFAULT_ENCTYPE),
    };
    let keytab = setting_or(shell, "KRB_AFS_KEYTAB", "./site/afs.keytab");
    let (Some(cell), Some(realm)) = (
        shell.settings.get_text("AFS_CELL"),
        shell.settings.get_text("KRB_REALM"),
    ) else {
        bail!("AFS_CELL and KRB_REALM are required.");
    };
    let akimpersonate = shell.settings.get_bool("AFS_AKIMPERSONATE");

    shell
        .keytabs
        .create_service_keytab(Path::new(&keytab), &cell, &realm, &enctype, akimpersonate)
        .context("Failed to create keytab")?;
    shell.settings.set("KRB_AFS_KEYTAB", &keytab)?;
    shell.settings.set("KRB_AFS_ENCTYPE", &enctype)?;
    Ok(())
}

fn gen_user_key(
    shell: &mut SetupShell,
    principal_setting: &str,
    default_principal: &str,
    keytab_setting: &str,
    default_keytab: &str,
) -> Result<()> {
    let principal = setting_or(shell, principal_setting, default_principal);
    let keytab = setting_or(shell, keytab_setting, default_keytab);
    let Some(realm) = shell.settings.get_text("KRB_REALM") else {
        bail!("KRB_REALM is required.");
    };

    shell
        .keytabs
        .create_user_keytab(Path::new(&keytab), &principal, &realm)
        .context("Failed to create keytab")?;
    shell.settings.set(principal_setting, &principal)?;
    shell.settings.set(keytab_setting, &keytab)?;
    Ok(())
}

fn getrpms(shell: &mut SetupShell, args: &Args) -> Result<Flow> {
    let [version, platform, directory] = args.words.as_slice() else {
        bail!("Missing command arguments.");
    };
    fetch_rpms(&mut shell.settings, &shell.download, version, platform, directory)?;
    Ok(Flow::Continue)
}

/// Download a release and record what was fetched in the settings.
///
/// `RPM_AFSRELEASE` is only set when a base package name shows the release.
/// A dry run leaves the settings alone.
pub fn fetch_rpms(
    settings: &mut Settings,
    base: &DownloadOptions,
    version: &str,
    platform: &str,
    directory: &str,
) -> Result<()> {
    let options = base.clone().with_directory(directory);
    let files = download::download(version, platform, &options)?;
    if options.dry_run {
        return Ok(());
    }

    settings.set("RPM_AFSVERSION", version)?;
    settings.set("RPM_PACKAGE_DIR", directory)?;

    let names: Vec<String> = files
        .iter()
        .filter_map(|f| f.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    match release_from_files(&names) {
        Some(release) => settings.set("RPM_AFSRELEASE", &release)?,
        None => emit(Level::Error, "setup.getrpms", "Failed to find rpm release!", None),
    }
    Ok(())
}
