//! Integration tests for saved views and configuration via the CLI.
//!
//! These tests verify:
//! - `cairn view list/save/rm` with the system presets and the ten-view cap
//! - `cairn task list --view` restores a view's filters, by id or by name
//! - Ad hoc filters that equal a saved view label the listing with it
//! - `cairn config get/set/list` round-trips and validates its keys

mod common;

use chrono::{Duration, Local};
use common::TestEnv;
use predicates::prelude::*;

fn date_offset(days: i64) -> String {
    (Local::now().date_naive() + Duration::days(days)).to_string()
}

// === View List Tests ===

#[test]
fn test_view_list_includes_system_presets() {
    let env = TestEnv::init();

    env.cairn()
        .args(["view", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\":\"view-all\""))
        .stdout(predicate::str::contains("\"id\":\"view-today\""))
        .stdout(predicate::str::contains("\"id\":\"view-overdue\""))
        .stdout(predicate::str::contains("\"is_system\":true"));

    env.cairn()
        .args(["view", "list", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(system)"))
        .stdout(predicate::str::contains("3 views"));
}

// === View Save Tests ===

#[test]
fn test_view_save_json() {
    let env = TestEnv::init();

    env.cairn()
        .args(["view", "save", "Focus", "priorities=high&due=today"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\":\"Focus\""))
        .stdout(predicate::str::contains("\"priorities\":[\"high\"]"))
        .stdout(predicate::str::contains("\"due\":\"today\""))
        .stdout(predicate::str::contains("\"is_system\":false"));
}

#[test]
fn test_view_save_rejects_blank_name() {
    let env = TestEnv::init();

    env.cairn()
        .args(["view", "save", "   ", "due=today"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("View name cannot be empty"));
}

#[test]
fn test_view_save_rejects_long_name() {
    let env = TestEnv::init();
    let name = "x".repeat(31);

    env.cairn()
        .args(["view", "save", &name, "due=today"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot exceed 30 characters"));
}

#[test]
fn test_view_save_enforces_cap() {
    let env = TestEnv::init();
    for i in 0..10 {
        let name = format!("View {}", i);
        env.cairn()
            .args(["view", "save", &name, "due=today"])
            .assert()
            .success();
    }

    env.cairn()
        .args(["view", "save", "One too many", "due=today"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("View limit reached"));
}

// === View Remove Tests ===

#[test]
fn test_view_rm_user_view() {
    let env = TestEnv::init();
    let id = env.run_for_id(&["view", "save", "Short lived", "due=today"]);

    env.cairn()
        .args(["view", "rm", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\":true"));

    env.cairn()
        .args(["view", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Short lived").not());
}

#[test]
fn test_view_rm_system_refused() {
    let env = TestEnv::init();

    env.cairn()
        .args(["view", "rm", "view-today"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("System views cannot be removed"));
}

#[test]
fn test_view_rm_unknown() {
    let env = TestEnv::init();

    env.cairn()
        .args(["view", "rm", "not-a-view"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("View not found"));
}

// === Listing Through Views ===

#[test]
fn test_task_list_through_system_view_by_name() {
    let env = TestEnv::init();
    env.run_for_id(&["task", "add", "Due now", "--due", &date_offset(0)]);
    env.run_for_id(&["task", "add", "Unscheduled"]);

    env.cairn()
        .args(["task", "list", "--view", "today"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"view\":\"Today\""))
        .stdout(predicate::str::contains("Due now"))
        .stdout(predicate::str::contains("Unscheduled").not());
}

#[test]
fn test_task_list_through_saved_view_by_id() {
    let env = TestEnv::init();
    let view = env.run_for_id(&["view", "save", "High wire", "priorities=high"]);
    env.run_for_id(&["task", "add", "Urgent fix", "--priority", "high"]);
    env.run_for_id(&["task", "add", "Background read", "--priority", "low"]);

    env.cairn()
        .args(["task", "list", "--view", &view, "--flat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"view\":\"High wire\""))
        .stdout(predicate::str::contains("Urgent fix"))
        .stdout(predicate::str::contains("Background read").not());
}

#[test]
fn test_task_list_unknown_view() {
    let env = TestEnv::init();

    env.cairn()
        .args(["task", "list", "--view", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("View not found"));
}

#[test]
fn test_task_list_labels_matching_ad_hoc_filters() {
    let env = TestEnv::init();
    env.run_for_id(&["task", "add", "Due now", "--due", &date_offset(0)]);

    // due=today equals the Today preset's filters, so the listing is labeled
    env.cairn()
        .args(["task", "list", "--due", "today"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"view\":\"Today\""));
}

// === Config Tests ===

#[test]
fn test_config_get_unset() {
    let env = TestEnv::init();

    env.cairn()
        .args(["config", "get", "sort-mode"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"value\":null"));

    env.cairn()
        .args(["config", "get", "sort-mode", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sort-mode (unset)"));
}

#[test]
fn test_config_set_and_get() {
    let env = TestEnv::init();

    env.cairn()
        .args(["config", "set", "sort-mode", "due_date"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"value\":\"due_date\""));

    env.cairn()
        .args(["config", "get", "sort-mode"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"value\":\"due_date\""));
}

#[test]
fn test_config_sort_mode_drives_listing() {
    let env = TestEnv::init();
    env.cairn()
        .args(["config", "set", "sort-mode", "due_date"])
        .assert()
        .success();
    env.run_for_id(&["task", "add", "Later", "--due", &date_offset(3)]);
    env.run_for_id(&["task", "add", "Sooner", "--due", &date_offset(1)]);

    let output = env
        .cairn()
        .args(["task", "list", "--flat"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"sort_mode\":\"due_date\""));
    let sooner = stdout.find("Sooner").unwrap();
    let later = stdout.find("Later").unwrap();
    assert!(sooner < later, "configured sort should order by due date");
}

#[test]
fn test_config_output_format_changes_default() {
    let env = TestEnv::init();
    env.cairn()
        .args(["config", "set", "output-format", "human"])
        .assert()
        .success();

    // No -H flag, yet the output is human-readable
    env.cairn()
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks to show"))
        .stdout(predicate::str::contains("\"total\"").not());
}

#[test]
fn test_config_rejects_unknown_key() {
    let env = TestEnv::init();

    env.cairn()
        .args(["config", "get", "theme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn test_config_rejects_bad_value() {
    let env = TestEnv::init();

    env.cairn()
        .args(["config", "set", "output-format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("output-format must be"));

    env.cairn()
        .args(["config", "set", "sort-mode", "alphabetical"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown sort mode"));
}

#[test]
fn test_config_list() {
    let env = TestEnv::init();
    env.cairn()
        .args(["config", "set", "sort-mode", "manual"])
        .assert()
        .success();

    env.cairn()
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"key\":\"output-format\""))
        .stdout(predicate::str::contains("\"key\":\"sort-mode\""))
        .stdout(predicate::str::contains("\"value\":\"manual\""));

    env.cairn()
        .args(["config", "list", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sort-mode = manual"));
}
