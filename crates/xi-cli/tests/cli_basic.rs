//! Basic CLI E2E tests.
//!
//! Each test runs the `xi` binary against its own temporary data directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_xi"))
        .args(args)
        .env("XI_DATA_DIR", data_dir)
        .env_remove("XI_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_cli_success(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "CLI command {args:?} failed: {stderr}");
    stdout
}

/// Create a habit and return its id.
fn add_habit(data_dir: &Path, args: &[&str]) -> String {
    let mut full = vec!["habit", "add"];
    full.extend_from_slice(args);
    let stdout = run_cli_success(data_dir, &full);
    let first = stdout.lines().next().unwrap();
    first.trim_start_matches("Habit created: ").trim().to_string()
}

/// Everything after the first line of output, parsed as JSON.
fn json_body(stdout: &str) -> serde_json::Value {
    let body: String = stdout.lines().skip(1).collect::<Vec<_>>().join("\n");
    serde_json::from_str(&body).unwrap()
}

#[test]
fn test_habit_add_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let id = add_habit(dir.path(), &["Drink Water"]);
    assert_eq!(id.len(), 36);

    let list = run_cli_success(dir.path(), &["habit", "list"]);
    assert!(list.contains("Drink Water"));
    assert!(list.contains(&id[..8]));

    let json = run_cli_success(dir.path(), &["habit", "list", "--json"]);
    let habits: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(habits.as_array().unwrap().len(), 1);
    assert_eq!(habits[0]["frequency"], "daily");
    assert_eq!(habits[0]["current_interval_secs"], 86_400);
}

#[test]
fn test_blank_name_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["habit", "add", "   "]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_respond_by_prefix_promotes_multiplier() {
    let dir = tempfile::tempdir().unwrap();
    let id = add_habit(dir.path(), &["Stretch", "--frequency", "weekly"]);
    let prefix = &id[..8];

    for _ in 0..3 {
        run_cli_success(dir.path(), &["respond", prefix, "success"]);
    }
    let show = run_cli_success(dir.path(), &["habit", "show", prefix]);
    let show: serde_json::Value = serde_json::from_str(&show).unwrap();
    assert_eq!(show["habit"]["interval_multiplier"], 2);
    assert_eq!(show["habit"]["current_interval_secs"], 1_209_600);
    assert_eq!(show["stats"]["streak_count"], 3);
    assert_eq!(show["recent_events"].as_array().unwrap().len(), 3);

    let out = run_cli_success(dir.path(), &["respond", prefix, "n"]);
    let habit = json_body(&out);
    assert_eq!(habit["interval_multiplier"], 1);
}

#[test]
fn test_unknown_habit_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["respond", "deadbeef", "success"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Habit not found"));
}

#[test]
fn test_reminders_follow_habit_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let id = add_habit(dir.path(), &["Floss"]);

    let list = run_cli_success(dir.path(), &["reminders", "list", "--json"]);
    let pending: serde_json::Value = serde_json::from_str(&list).unwrap();
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["content"]["body"], "Did you do your habit: Floss?");

    run_cli_success(dir.path(), &["habit", "deactivate", &id]);
    let list = run_cli_success(dir.path(), &["reminders", "list"]);
    assert!(list.contains("No reminders scheduled."));

    run_cli_success(dir.path(), &["habit", "activate", &id]);
    run_cli_success(dir.path(), &["habit", "delete", &id]);
    let list = run_cli_success(dir.path(), &["habit", "list"]);
    assert!(list.contains("No habits yet."));
}

#[test]
fn test_notification_action() {
    let dir = tempfile::tempdir().unwrap();
    let id = add_habit(dir.path(), &["Read"]);

    let out = run_cli_success(dir.path(), &["action", &id, "LATER_ACTION"]);
    assert!(out.contains("Later"));
    let out = run_cli_success(dir.path(), &["action", &id, "com.apple.default"]);
    assert!(out.contains("Did you do your habit: Read?"));

    let show = run_cli_success(dir.path(), &["habit", "show", &id]);
    let show: serde_json::Value = serde_json::from_str(&show).unwrap();
    assert_eq!(show["stats"]["laters"], 1);
}

#[test]
fn test_check_with_nothing_overdue() {
    let dir = tempfile::tempdir().unwrap();
    add_habit(dir.path(), &["Walk"]);

    let out = run_cli_success(dir.path(), &["check"]);
    let queue: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(queue["confirming"].is_null());
    assert!(queue["pending"].as_array().unwrap().is_empty());

    let mut child = Command::new(env!("CARGO_BIN_EXE_xi"))
        .args(["check", "--interactive"])
        .env("XI_DATA_DIR", dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"").unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Nothing overdue."));
}

#[test]
fn test_config_get_set() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_cli_success(dir.path(), &["config", "get", "queue.order"]);
    assert_eq!(out.trim(), "most_overdue");

    run_cli_success(dir.path(), &["config", "set", "habits.default_frequency", "monthly"]);
    let id = add_habit(dir.path(), &["Budget review"]);
    let show = run_cli_success(dir.path(), &["habit", "show", &id]);
    let show: serde_json::Value = serde_json::from_str(&show).unwrap();
    assert_eq!(show["habit"]["frequency"], "monthly");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "queue.order", "random"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(dir.path(), &["config", "get", "nope"]);
    assert_eq!(code, 1);

    run_cli_success(dir.path(), &["config", "set", "reminders.enabled", "false"]);
    let out = run_cli_success(dir.path(), &["reminders", "test", &id]);
    assert!(out.contains("disabled"));
}

#[test]
fn test_out_of_range_test_delay_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let id = add_habit(dir.path(), &["Meditate"]);

    for delay in ["10000000000000", "9223372036854775807"] {
        let (_, stderr, code) = run_cli(dir.path(), &["reminders", "test", &id, "--delay", delay]);
        assert_eq!(code, 1, "delay {delay} should be rejected");
        assert!(stderr.contains("error:"));
        assert!(stderr.contains("delay"));
    }

    let out = run_cli_success(dir.path(), &["reminders", "test", &id, "--delay", "60"]);
    assert!(out.contains("Test reminder scheduled"));
}

#[test]
fn test_habit_edit() {
    let dir = tempfile::tempdir().unwrap();
    let id = add_habit(dir.path(), &["Run"]);

    let out = run_cli_success(
        dir.path(),
        &["habit", "edit", &id, "--frequency", "weekly", "--icon", " "],
    );
    let habit = json_body(&out);
    assert_eq!(habit["frequency"], "weekly");
    assert_eq!(habit["current_interval_secs"], 604_800);
    assert_eq!(habit["icon"], "✅");

    let (_, stderr, code) = run_cli(dir.path(), &["habit", "edit", &id, "--name", "  "]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Habit name must not be empty"));
}
