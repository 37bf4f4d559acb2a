mod common;
mod download;
mod install;
mod settings;
mod setup;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueHint};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::common::command_log::CommandLogger;
use crate::common::paths::DEFAULT_RPM_DIR;
use crate::common::{Executor, ShellExecutor};
use crate::download::{DEFAULT_SITE, DownloadOptions};
use crate::install::{Installation, Role};
use crate::settings::Settings;
use crate::setup::{KadminKeytabs, SetupShell};
use crate::ui::prelude::*;

/// OpenAFS test harness helpers
#[derive(Parser, Debug)]
#[command(name = "afs-robotest", author, version, about, long_about = None)]
struct Cli {
    /// Show debug output and log every command to the state directory
    #[arg(short, long, global = true)]
    debug: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Harness root holding settings.py
    #[arg(
        long,
        global = true,
        env = "AFS_ROBOTEST_ROOT",
        default_value = ".",
        value_hint = ValueHint::DirPath
    )]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show which installation method a distribution directory needs
    Detect {
        #[arg(value_hint = ValueHint::DirPath)]
        dist: PathBuf,
    },
    /// Fail unless the role is installed (or absent with --absent)
    Check {
        #[arg(value_enum)]
        role: Role,
        #[arg(value_hint = ValueHint::DirPath)]
        dist: PathBuf,
        /// Require the role to be absent instead
        #[arg(long)]
        absent: bool,
    },
    /// Install the client or server from a distribution directory
    Install {
        #[arg(value_enum)]
        role: Role,
        #[arg(value_hint = ValueHint::DirPath)]
        dist: PathBuf,
    },
    /// Remove an installed client or server
    Remove {
        #[arg(value_enum)]
        role: Role,
        #[arg(value_hint = ValueHint::DirPath)]
        dist: PathBuf,
    },
    /// Download release rpms and record them in the settings
    Getrpms {
        /// OpenAFS version, e.g. 1.6.10
        version: String,
        /// One of rhel5, rhel6, openSUSE_12.3
        platform: String,
        /// Download destination
        #[arg(default_value = DEFAULT_RPM_DIR, value_hint = ValueHint::DirPath)]
        directory: String,
        /// Release site to download from
        #[arg(long, default_value = DEFAULT_SITE)]
        site: String,
        /// List the files without downloading them
        #[arg(long)]
        dry_run: bool,
    },
    /// Edit the harness settings (the default)
    Setup {
        /// Read commands from a file instead of stdin
        #[arg(long, value_hint = ValueHint::FilePath)]
        script: Option<PathBuf>,
    },
}

fn executor(debug: bool) -> Box<dyn Executor> {
    if debug {
        match CommandLogger::new() {
            Ok(logger) => {
                ui::debug("command_log.path", &format!("Logging commands to {}", logger.path().display()));
                return Box::new(ShellExecutor::with_logger(logger));
            }
            Err(e) => emit(
                Level::Warn,
                "command_log.unavailable",
                &format!("Command log disabled: {e}"),
                None,
            ),
        }
    }
    Box::new(ShellExecutor::new())
}

fn session(dist: &Path, debug: bool) -> Result<Installation> {
    Installation::setup(dist, executor(debug))
        .with_context(|| format!("setting up installation from {}", dist.display()))
}

fn load_settings(root: &Path) -> Result<Settings> {
    Settings::load(root).with_context(|| format!("loading settings from {}", root.display()))
}

fn run_setup(cli: &Cli, script: Option<&Path>) -> Result<()> {
    let settings = load_settings(&cli.root)?;
    let keytabs = KadminKeytabs::new(executor(cli.debug));
    let options = DownloadOptions::for_host(DEFAULT_RPM_DIR)?;
    let mut shell = SetupShell::new(settings, executor(cli.debug), Box::new(keytabs))
        .with_download_options(options);
    match script {
        Some(path) => shell.run_script(path),
        None => shell.run_stdin(),
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Detect { dist }) => {
            let kind = install::detect(dist)?;
            emit(
                Level::Info,
                "install.detect",
                kind.name(),
                Some(serde_json::json!({ "dist": dist, "kind": kind.name() })),
            );
        }
        Some(Commands::Check { role, dist, absent }) => {
            let installation = session(dist, cli.debug)?;
            if *absent {
                installation.require_not_installed(*role)?;
                emit(Level::Success, "install.check", &format!("OpenAFS {} is not installed", role), None);
            } else {
                installation.require_installed(*role)?;
                emit(Level::Success, "install.check", &format!("OpenAFS {} is installed", role), None);
            }
        }
        Some(Commands::Install { role, dist }) => session(dist, cli.debug)?.install(*role)?,
        Some(Commands::Remove { role, dist }) => session(dist, cli.debug)?.remove(*role)?,
        Some(Commands::Getrpms {
            version,
            platform,
            directory,
            site,
            dry_run,
        }) => {
            let mut settings = load_settings(&cli.root)?;
            let mut options = DownloadOptions::for_host(directory.as_str())?;
            options.site = site.clone();
            options.dry_run = *dry_run;
            setup::fetch_rpms(&mut settings, &options, version, platform, directory)?;
        }
        Some(Commands::Setup { script }) => run_setup(cli, script.as_deref())?,
        None => run_setup(cli, None)?,
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, !cli.no_color && std::io::stderr().is_terminal());

    if let Err(e) = run(&cli) {
        for (i, cause) in e.chain().enumerate() {
            let message = if i == 0 {
                format!("Error: {}", cause)
            } else {
                format!("  Caused by: {}", cause)
            };
            emit(Level::Error, "error", &message, None);
        }
        std::process::exit(1);
    }
}
