//! Basic CLI tests.
//!
//! Tests invoke the built binary with an isolated config file and verify
//! outputs.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

const ENV_VARS: &[&str] = &[
    "SMARTLID_CONFIG",
    "SMARTLID_BACKEND",
    "LID_OPEN_TIMEOUT",
    "DAILY_ALERT_THRESHOLD",
    "LINE_CHANNEL_ACCESS_TOKEN",
    "LINE_USER_ID",
    "LINE_ENDPOINT",
    "LINE_TIMEOUT",
    "LINE_MESSAGE_STYLE",
    "LINE_DAILY_SUMMARY",
    "SERVO_MOVE_TIME",
    "SERVO_STABILIZE_TIME",
    "SERVO_PUSH_HOLD_TIME",
    "RUST_LOG",
];

fn command(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_smartlid"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.arg("--config").arg(config);
    cmd
}

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(config: &Path, args: &[&str]) -> (String, String, i32) {
    run_cli_with_env(config, args, &[])
}

fn run_cli_with_env(config: &Path, args: &[&str], env: &[(&str, &str)]) -> (String, String, i32) {
    let output = command(config)
        .args(args)
        .envs(env.iter().copied())
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_config_path_honours_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smartlid.toml");
    let (stdout, _, code) = run_cli(&path, &["config", "path"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), path.display().to_string());
}

#[test]
fn test_config_list_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    let (stdout, stderr, code) = run_cli(&path, &["config", "list"]);
    assert_eq!(code, 0, "config list failed: {stderr}");

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["alert"]["lid_open_timeout_secs"], 60);
    assert_eq!(json["alert"]["daily_alert_threshold"], 2);
    assert_eq!(json["hardware"]["backend"], "rpi");
}

#[test]
fn test_config_list_masks_token() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let (stdout, _, code) = run_cli_with_env(
        &path,
        &["config", "list"],
        &[("LINE_CHANNEL_ACCESS_TOKEN", "super-secret")],
    );
    assert_eq!(code, 0);
    assert!(!stdout.contains("super-secret"));
    assert!(stdout.contains("***"));
}

#[test]
fn test_config_get_masks_token() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let (stdout, _, code) = run_cli_with_env(
        &path,
        &["config", "get", "line.channel_access_token"],
        &[("LINE_CHANNEL_ACCESS_TOKEN", "super-secret")],
    );
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "***");
}

#[test]
fn test_config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let (stdout, _, code) = run_cli(&path, &["config", "set", "alert.daily_alert_threshold", "4"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");
    assert!(path.exists());

    let (stdout, _, code) = run_cli(&path, &["config", "get", "alert.daily_alert_threshold"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "4");
}

#[test]
fn test_env_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    run_cli(&path, &["config", "set", "alert.lid_open_timeout_secs", "90"]);

    let (stdout, _, code) = run_cli_with_env(
        &path,
        &["config", "get", "alert.lid_open_timeout_secs"],
        &[("LID_OPEN_TIMEOUT", "15")],
    );
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "15");
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let (_, stderr, code) = run_cli(&path, &["config", "set", "alert.daily_alert_threshold", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
    assert!(!path.exists());
}

#[test]
fn test_config_get_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let (_, stderr, code) = run_cli(&path, &["config", "get", "nope.nothing"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let (_, _, code) = run_cli(&path, &["config", "init"]);
    assert_eq!(code, 0);
    let (_, stderr, code) = run_cli(&path, &["config", "init"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already exists"));
    let (_, _, code) = run_cli(&path, &["config", "init", "--force"]);
    assert_eq!(code, 0);
}

#[test]
fn test_run_without_rpi_support_fails_cleanly() {
    if cfg!(feature = "rpi") {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let (_, stderr, code) = run_cli(&path, &["run"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
    assert!(stderr.contains("rpi"));
}

#[test]
fn test_run_rejects_invalid_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let (_, stderr, code) = run_cli_with_env(
        &path,
        &["run", "--simulate"],
        &[("DAILY_ALERT_THRESHOLD", "many")],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("DAILY_ALERT_THRESHOLD"));
}

#[test]
fn test_simulated_console_reports_status() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut child = command(&path)
        .args(["run", "--simulate"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"status\nopen\nstatus\nclose\nquit\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(0));
    let snapshots: Vec<serde_json::Value> = stdout
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .filter(|v| v.get("countdown_active").is_some())
        .collect();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0]["countdown_active"], false);
    assert_eq!(snapshots[1]["countdown_active"], true);
    assert_eq!(snapshots[1]["daily_count"], 0);

    assert!(stdout.contains("\"type\":\"CountdownStarted\""));
    assert!(stdout.contains("\"type\":\"CountdownCancelled\""));
    assert!(stdout.contains("\"type\":\"EngineStopped\""));
}

#[test]
fn test_simulated_push() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let (stdout, stderr, code) = run_cli_with_env(
        &path,
        &["test", "push"],
        &[
            ("SMARTLID_BACKEND", "simulated"),
            ("SERVO_MOVE_TIME", "0"),
            ("SERVO_STABILIZE_TIME", "0"),
            ("SERVO_PUSH_HOLD_TIME", "0"),
        ],
    );
    assert_eq!(code, 0, "test push failed: {stderr}");
    assert!(stdout.contains("push complete (0.0s)"));
}

#[test]
fn test_sound_stage_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let (_, _, code) = run_cli(&path, &["test", "sound", "--stage", "3"]);
    assert_ne!(code, 0);
}

#[test]
fn test_notify_without_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let (_, stderr, code) = run_cli(&path, &["test", "notify"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("LINE credentials"));
}

#[test]
fn test_connection_without_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let (_, stderr, code) = run_cli(&path, &["test", "connection"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("LINE credentials"));
}

#[test]
fn test_connection_to_unreachable_endpoint_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    // Nothing listens on the discard port.
    let (_, stderr, code) = run_cli_with_env(
        &path,
        &["test", "connection"],
        &[
            ("LINE_CHANNEL_ACCESS_TOKEN", "t"),
            ("LINE_USER_ID", "u"),
            ("LINE_ENDPOINT", "http://127.0.0.1:9/v2/bot/message/push"),
            ("LINE_TIMEOUT", "2"),
        ],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}
