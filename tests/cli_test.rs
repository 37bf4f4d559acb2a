mod common;
mod utils;

use anyhow::Result;
use common::TestEnvironment;
use std::fs;

#[test]
fn test_detect_legacy_tree() -> Result<()> {
    let env = TestEnvironment::new()?;
    let dist = env.legacy_dist()?;

    let output = utils::run_robotest(&env, &["detect", dist.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0, "detect failed: {}", output.stderr);
    assert_eq!(output.stdout.trim(), "legacy");
    Ok(())
}

#[test]
fn test_detect_prefers_rpms() -> Result<()> {
    let env = TestEnvironment::new()?;
    let dist = env.rpm_dist(&[
        "openafs-1.6.10-2.el6.x86_64.rpm",
        "kmod-openafs-1.6.10-2.2.6.32_431.el6.x86_64.rpm",
    ])?;
    // a legacy marker alongside the packages does not change the answer
    let marker = dist.join("root.server/usr/afs/bin");
    fs::create_dir_all(&marker)?;
    fs::write(marker.join("bosserver"), "")?;

    let output = utils::run_robotest(&env, &["detect", dist.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0, "detect failed: {}", output.stderr);
    assert_eq!(output.stdout.trim(), "rpm");
    Ok(())
}

#[test]
fn test_detect_json() -> Result<()> {
    let env = TestEnvironment::new()?;
    let dist = env.legacy_dist()?;

    let output = utils::run_robotest(&env, &["--json", "detect", dist.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0);
    let event: serde_json::Value = serde_json::from_str(output.stdout.trim())?;
    assert_eq!(event["code"], "install.detect");
    assert_eq!(event["data"]["kind"], "legacy");
    Ok(())
}

#[test]
fn test_detect_unknown_directory_fails() -> Result<()> {
    let env = TestEnvironment::new()?;
    let dist = env.empty_dist()?;

    let output = utils::run_robotest(&env, &["detect", dist.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 1);
    assert!(
        output.stderr.contains("Could not determine distribution type"),
        "unexpected stderr: {}",
        output.stderr
    );

    let missing = env.path().join("missing");
    let output = utils::run_robotest(&env, &["detect", missing.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 1);
    Ok(())
}

#[test]
fn test_rpm_dist_without_version_fails() -> Result<()> {
    let env = TestEnvironment::new()?;
    let dist = env.rpm_dist(&["openafs-client-1.6.10-2.el6.x86_64.rpm"])?;

    let output = utils::run_robotest(&env, &["check", "client", dist.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("Caused by"), "unexpected stderr: {}", output.stderr);
    Ok(())
}

#[test]
fn test_getrpms_rejects_platform() -> Result<()> {
    let env = TestEnvironment::new()?;
    let rpms = env.path().join("downloads");

    let output = utils::run_robotest(&env, &["getrpms", "1.6.10", "rhel7", rpms.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("Unexpected platform: rhel7"), "unexpected stderr: {}", output.stderr);
    assert!(!rpms.exists());
    assert!(!env.settings_file().exists());
    Ok(())
}

#[test]
fn test_setup_script_round_trip() -> Result<()> {
    let env = TestEnvironment::new()?;
    let script = env.write_script(
        "setup.txt",
        "# cell setup\n\
         set afs_cell example.com\n\
         set krb_realm EXAMPLE.COM\n\
         set afs_akimpersonate yes\n\
         set afs_file_servers 2\n\
         set comment a \"quoted\" value\n",
    )?;

    let output = utils::run_robotest(&env, &["setup", "--script", script.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0, "setup failed: {}", output.stderr);
    assert!(!output.stdout.contains("(setup)"));

    let text = fs::read_to_string(env.settings_file())?;
    assert!(text.starts_with("# OpenAFS RobotTest Settings\n"));
    assert!(text.contains("AFS_CELL                 = \"example.com\"\n"));
    assert!(text.contains("AFS_AKIMPERSONATE        = True\n"));
    assert!(text.contains("AFS_FILE_SERVERS         = 2\n"));
    assert!(text.contains("COMMENT                  = \"a \\\"quoted\\\" value\"\n"));

    // a second session starts from the saved values
    let output = utils::run_robotest_with_input(&env, &["setup"], "list\n")?;
    assert_eq!(output.exit_code, 0, "setup failed: {}", output.stderr);
    assert!(output.stdout.contains("AFS_CELL            example.com"));
    assert!(output.stdout.contains("AFS_FILE_SERVERS    2"));
    assert!(output.stdout.contains("COMMENT             a \"quoted\" value"));
    assert!(output.stdout.contains("RPM_AFSVERSION      (empty)"));
    Ok(())
}

#[test]
fn test_setup_reports_failures_and_continues() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_robotest_with_input(
        &env,
        &["setup"],
        "set do_teardown perhaps\nmakepart zz\ngenkey afs\nset afs_user alice\n",
    )?;
    assert_eq!(output.exit_code, 0);
    assert!(output.stderr.contains("Fail: Expected 'true' or 'false' for DO_TEARDOWN"));
    assert!(output.stderr.contains("Fail: Invalid partition id 'zz'"));
    assert!(output.stderr.contains("Fail: AFS_CELL and KRB_REALM are required."));

    let text = fs::read_to_string(env.settings_file())?;
    assert!(text.contains("AFS_USER                 = \"alice\"\n"));
    assert!(text.contains("DO_TEARDOWN              = True\n"));
    Ok(())
}

#[test]
fn test_root_from_environment() -> Result<()> {
    let env = TestEnvironment::new()?;
    let script = env.write_script("realm.txt", "set krb_realm EXAMPLE.COM\n")?;

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_afs-robotest"))
        .args(["setup", "--script", script.to_str().unwrap()])
        .env("AFS_ROBOTEST_ROOT", env.root())
        .current_dir(env.path())
        .output()?;
    assert!(output.status.success());
    assert!(fs::read_to_string(env.settings_file())?.contains("EXAMPLE.COM"));
    Ok(())
}
