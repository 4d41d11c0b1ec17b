//! Integration tests for the renegotiation flow via the CLI.
//!
//! These tests verify:
//! - `cairn renegotiate --preview` reports overdue state, the available
//!   actions, quick picks, and split suggestions
//! - Applying reschedule/split/park/drop changes the task accordingly and
//!   records an audit entry
//! - Validation: reschedule needs a date, `other` needs a note, and the
//!   action/reason flags are required without --preview

mod common;

use chrono::{Duration, Local};
use common::TestEnv;
use predicates::prelude::*;

fn date_offset(days: i64) -> String {
    (Local::now().date_naive() + Duration::days(days)).to_string()
}

/// Create a task due `days_ago` days in the past and return its ID.
fn overdue_task(env: &TestEnv, title: &str, days_ago: i64) -> String {
    env.run_for_id(&["task", "add", title, "--due", &date_offset(-days_ago)])
}

// === Preview Tests ===

#[test]
fn test_renegotiate_preview_overdue_task() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Write the annual report", 5);

    env.cairn()
        .args(["renegotiate", &id, "--preview"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"days_overdue\":5"))
        .stdout(predicate::str::contains("\"needs_renegotiation\":true"))
        .stdout(predicate::str::contains(
            "\"actions\":[\"reschedule\",\"split\",\"park\",\"drop\"]",
        ))
        .stdout(predicate::str::contains("\"pick\":\"tomorrow\""))
        .stdout(predicate::str::contains("\"pick\":\"next_week\""))
        .stdout(predicate::str::contains("Plan out Write the annual report"));
}

#[test]
fn test_renegotiate_preview_fresh_task() {
    let env = TestEnv::init();
    let id = env.run_for_id(&["task", "add", "Brand new", "--due", &date_offset(0)]);

    env.cairn()
        .args(["renegotiate", &id, "--preview"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"needs_renegotiation\":false"))
        .stdout(predicate::str::contains("\"actions\":[]"));
}

#[test]
fn test_renegotiate_preview_splits_on_connectives() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Sort the photos and back them up", 4);

    env.cairn()
        .args(["renegotiate", &id, "--preview"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\":\"Sort the photos\""))
        .stdout(predicate::str::contains("\"title\":\"back them up\""));
}

#[test]
fn test_renegotiate_preview_estimate_shapes_suggestions() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Clean the garage", 4);

    env.cairn()
        .args(["renegotiate", &id, "--preview", "--estimate", "120"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"estimated_minutes\":40"));
}

#[test]
fn test_renegotiate_preview_human() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Write the annual report", 5);

    env.cairn()
        .args(["renegotiate", &id, "--preview", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 days overdue"))
        .stdout(predicate::str::contains("renegotiation suggested"))
        .stdout(predicate::str::contains("Quick picks:"))
        .stdout(predicate::str::contains("Split suggestions:"));
}

#[test]
fn test_renegotiate_preview_unknown_task() {
    let env = TestEnv::init();

    env.cairn()
        .args(["renegotiate", "cn-ffff", "--preview"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found"));
}

// === Reschedule Tests ===

#[test]
fn test_renegotiate_reschedule_with_quick_pick() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Call the bank", 4);
    let tomorrow = date_offset(1);

    env.cairn()
        .args([
            "renegotiate", &id, "--action", "reschedule", "--reason", "wrong_time",
            "--pick", "tomorrow",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "\"new_due_date\":\"{}\"",
            tomorrow
        )))
        .stdout(predicate::str::contains(format!(
            "\"due_date\":\"{}\"",
            tomorrow
        )))
        .stdout(predicate::str::contains("\"due_time\":\"09:00:00\""))
        .stdout(predicate::str::contains("\"status\":\"active\""));
}

#[test]
fn test_renegotiate_reschedule_with_explicit_date() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Call the bank", 4);
    let date = date_offset(3);

    env.cairn()
        .args([
            "renegotiate", &id, "--action", "reschedule", "--reason", "blocked",
            "--date", &date,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("\"due_date\":\"{}\"", date)));
}

#[test]
fn test_renegotiate_reschedule_needs_date_or_pick() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Call the bank", 4);

    env.cairn()
        .args(["renegotiate", &id, "--action", "reschedule", "--reason", "wrong_time"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Reschedule needs --date or --pick"));
}

// === Split Tests ===

#[test]
fn test_renegotiate_split_with_explicit_steps() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Redo the kitchen", 6);

    env.cairn()
        .args([
            "renegotiate", &id, "--action", "split", "--reason", "too_big",
            "--step", "Get quotes", "--step", "Pick a contractor",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\":\"Get quotes\""))
        .stdout(predicate::str::contains("\"title\":\"Pick a contractor\""))
        .stdout(predicate::str::contains("\"status\":\"dropped\""));

    // The sub-steps land in the bucketed listing; the dropped original does not
    env.cairn()
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Get quotes"))
        .stdout(predicate::str::contains("Redo the kitchen").not());
}

#[test]
fn test_renegotiate_split_defaults_to_suggestions() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Clean the garage", 4);

    env.cairn()
        .args(["renegotiate", &id, "--action", "split", "--reason", "too_big"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan out Clean the garage"))
        .stdout(predicate::str::contains("Finish Clean the garage"));
}

// === Park and Drop Tests ===

#[test]
fn test_renegotiate_park_clears_due() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Learn the accordion", 10);

    env.cairn()
        .args(["renegotiate", &id, "--action", "park", "--reason", "wrong_time"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"active\""))
        .stdout(predicate::str::contains("\"due_date\"").not());

    // Parked work lives in the No Date bucket
    env.cairn()
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"label\":\"No Date\""))
        .stdout(predicate::str::contains("Learn the accordion"));
}

#[test]
fn test_renegotiate_drop() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Old obligation", 8);

    env.cairn()
        .args([
            "renegotiate", &id, "--action", "drop", "--reason", "lost_interest", "-H",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Renegotiated"))
        .stdout(predicate::str::contains("dropped"));

    env.cairn()
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Old obligation").not());
}

// === Validation Tests ===

#[test]
fn test_renegotiate_requires_action_or_preview() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Stuck", 4);

    env.cairn()
        .args(["renegotiate", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Renegotiate needs --action"));
}

#[test]
fn test_renegotiate_requires_reason() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Stuck", 4);

    env.cairn()
        .args(["renegotiate", &id, "--action", "drop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Renegotiate needs --reason"));
}

#[test]
fn test_renegotiate_reason_other_requires_note() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Stuck", 4);

    env.cairn()
        .args(["renegotiate", &id, "--action", "drop", "--reason", "other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires explanatory text"));
}

#[test]
fn test_renegotiate_with_note() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Stuck", 4);

    env.cairn()
        .args([
            "renegotiate", &id, "--action", "drop", "--reason", "other",
            "--note", "Superseded by the office move",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"reason_text\":\"Superseded by the office move\"",
        ));
}

// === History Tests ===

#[test]
fn test_renegotiation_history_in_task_show() {
    let env = TestEnv::init();
    let id = overdue_task(&env, "Call the bank", 4);

    env.cairn()
        .args([
            "renegotiate", &id, "--action", "reschedule", "--reason", "wrong_time",
            "--pick", "next_week",
        ])
        .assert()
        .success();

    env.cairn()
        .args(["task", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"renegotiations\":["))
        .stdout(predicate::str::contains("\"id\":\"cnr-"))
        .stdout(predicate::str::contains("\"action\":\"reschedule\""))
        .stdout(predicate::str::contains("\"reason_code\":\"wrong_time\""));
}
