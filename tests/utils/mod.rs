use anyhow::Result;
use std::io::Write;
use std::process::{Command, Stdio};

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

fn robotest(env: &TestEnvironment, args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_afs-robotest"));
    cmd.arg("--root")
        .arg(env.root())
        .arg("--no-color")
        .args(args)
        .env_remove("AFS_ROBOTEST_ROOT")
        .current_dir(env.path());
    cmd
}

fn collect(output: std::process::Output) -> CommandOutput {
    CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    }
}

pub fn run_robotest(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let output = robotest(env, args).stdin(Stdio::null()).output()?;
    Ok(collect(output))
}

/// Run with `input` piped to stdin.
pub fn run_robotest_with_input(env: &TestEnvironment, args: &[&str], input: &str) -> Result<CommandOutput> {
    let mut child = robotest(env, args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes())?;
    }
    Ok(collect(child.wait_with_output()?))
}
