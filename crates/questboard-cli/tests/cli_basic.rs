//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_questboard"))
        .env("QUESTBOARD_DATA_DIR", dir)
        .env_remove("QUESTBOARD_USER")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn seed(dir: &Path) {
    ok(dir, &["game", "add", "Foo"]);
    ok(dir, &["task", "add", "Foo", "Login, Dungeon"]);
    ok(dir, &["task", "add", "Foo", "Raid", "--period", "weekly"]);
}

#[test]
fn test_daily_checklist_flow() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let daily = ok(dir.path(), &["--user", "1", "checklist", "daily"]);
    assert!(daily.contains("☐ Login"), "{daily}");

    ok(dir.path(), &["--user", "1", "checklist", "toggle", "Foo", "Login"]);
    let done = ok(dir.path(), &["--user", "1", "--json", "checklist", "done"]);
    let parsed: serde_json::Value = serde_json::from_str(&done).unwrap();
    assert_eq!(parsed["status"], "incomplete");
    assert_eq!(parsed["remaining"][0][1], "Dungeon");

    ok(dir.path(), &["--user", "1", "checklist", "complete", "Foo"]);
    let done = ok(dir.path(), &["--user", "1", "--json", "checklist", "done"]);
    let parsed: serde_json::Value = serde_json::from_str(&done).unwrap();
    assert_eq!(parsed["status"], "completed");
    assert_eq!(parsed["streak"], 1);

    let users = ok(dir.path(), &["--json", "user", "list"]);
    let parsed: serde_json::Value = serde_json::from_str(&users).unwrap();
    assert_eq!(parsed[0]["user_id"], 1);
    assert_eq!(parsed[0]["day_streak"], 1);
}

#[test]
fn test_unknown_game_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["checklist", "toggle", "Nope", "Login"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("game not found: Nope"), "{stderr}");
}

#[test]
fn test_event_admin_and_listing() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    ok(
        dir.path(),
        &["event", "add", "Foo", "Hunt", "2099-12-31", "Check in:daily", "Boss"],
    );

    let catalog = ok(dir.path(), &["--json", "catalog", "show", "Foo"]);
    let parsed: serde_json::Value = serde_json::from_str(&catalog).unwrap();
    assert_eq!(parsed["events"][0]["name"], "Hunt");
    assert_eq!(parsed["events"][0]["tasks"][0], serde_json::json!(["Check in", "daily"]));
    assert_eq!(parsed["events"][0]["tasks"][1], serde_json::json!(["Boss", "once"]));

    ok(dir.path(), &["event", "rename", "Foo", "Hunt", "Big Hunt"]);
    let events = ok(dir.path(), &["checklist", "events"]);
    assert!(events.contains("Foo - Big Hunt"), "{events}");

    let (_, stderr, code) = run_cli(dir.path(), &["event", "add", "Foo", "Bad", "31-12-2099", "x"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("YYYY-MM-DD"), "{stderr}");
}

#[test]
fn test_event_wizard_reads_stdin() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let mut child = Command::new(env!("CARGO_BIN_EXE_questboard"))
        .env("QUESTBOARD_DATA_DIR", dir.path())
        .args(["event", "wizard"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Nope\nFoo\nSpring\n2099-04-15\nonce\nCollect, Boss\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{stdout}");
    assert!(stdout.contains("Unknown game 'Nope'"));
    assert!(stdout.contains("Event added"));

    let catalog = ok(dir.path(), &["catalog", "list"]);
    assert!(catalog.contains("event Spring until 2099-04-15"), "{catalog}");
}

#[test]
fn test_config_commands() {
    let dir = tempfile::tempdir().unwrap();
    let path = ok(dir.path(), &["config", "path"]);
    assert!(path.trim().ends_with("config.toml"));

    assert_eq!(ok(dir.path(), &["config", "get", "schedule.send_daily"]).trim(), "08:00");
    ok(dir.path(), &["config", "set", "schedule.send_daily", "09:30"]);
    assert_eq!(ok(dir.path(), &["config", "get", "schedule.send_daily"]).trim(), "09:30");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "schedule.send_daily", "late"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(dir.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);

    ok(dir.path(), &["config", "reset"]);
    assert_eq!(ok(dir.path(), &["config", "get", "schedule.send_daily"]).trim(), "08:00");
}

#[test]
fn test_job_run_backup() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    let report = ok(dir.path(), &["--json", "job", "run", "backup"]);
    let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(parsed["job"], "backup");
    assert_eq!(parsed["affected"], 1, "only the catalog has been written");

    let backups = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
        .count();
    assert_eq!(backups, 1);

    let (_, stderr, code) = run_cli(dir.path(), &["job", "run", "nightly"]);
    assert_eq!(code, 2, "clap rejects unknown job names: {stderr}");
}
