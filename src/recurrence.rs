//! Next-occurrence math for recurring tasks.
//!
//! The store calls [`spawn_next_occurrence`] when a recurring task is
//! completed or skipped; clients never compute recurrence themselves, they
//! only append the occurrence the server hands back.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::models::{Frequency, RecurrenceRule, Task, TaskStatus};

/// Compute the due date of the occurrence after one due on
/// `completed_due`. Returns `None` once the rule's end date is passed,
/// which terminates the recurrence.
pub fn next_occurrence(rule: &RecurrenceRule, completed_due: NaiveDate) -> Option<NaiveDate> {
    let next = match rule.frequency {
        Frequency::Daily => completed_due + Duration::days(1),
        Frequency::Weekly => completed_due + Duration::days(7),
        Frequency::Monthly => add_month_clamped(completed_due),
        Frequency::Weekdays => next_weekday(completed_due),
    };
    match rule.end_date {
        Some(end) if next > end => None,
        _ => Some(next),
    }
}

/// Same day next month, clamped to the target month's length
/// (Jan 31 -> Feb 28, Oct 31 -> Nov 30).
fn add_month_clamped(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    let day = date.day().min(days_in_month(year, month));
    // Clamped day is always valid for the target month
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// The next Monday..Friday day strictly after `date`.
fn next_weekday(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
        next += Duration::days(1);
    }
    next
}

/// Stable human-readable label for a rule.
pub fn describe(rule: &RecurrenceRule) -> String {
    let base = match rule.frequency {
        Frequency::Daily => "Every day",
        Frequency::Weekly => "Every week",
        Frequency::Monthly => "Every month",
        Frequency::Weekdays => "Weekdays (Mon-Fri)",
    };
    match rule.end_date {
        Some(end) => format!("{} until {}", base, end.format("%Y-%m-%d")),
        None => base.to_string(),
    }
}

/// Build the next occurrence of a recurring task that was just completed
/// or skipped. Returns `None` for non-recurring tasks and for rules whose
/// end date has passed.
///
/// The occurrence keeps the task's title, category, outcome, priority,
/// position, and rule. Completing extends `recurring_streak`; skipping
/// resets it to zero. `today` anchors tasks that recur without a due date.
pub fn spawn_next_occurrence(
    task: &Task,
    id: String,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Option<Task> {
    let rule = task.recurrence_rule.as_ref()?;
    let anchor = task.due_date.unwrap_or(today);
    let next_due = next_occurrence(rule, anchor)?;

    let streak = match task.status {
        TaskStatus::Done => task.recurring_streak + 1,
        _ => 0,
    };

    Some(Task {
        id,
        title: task.title.clone(),
        status: TaskStatus::Active,
        due_date: Some(next_due),
        due_time: task.due_time,
        priority: task.priority.clone(),
        category_id: task.category_id.clone(),
        outcome_id: task.outcome_id.clone(),
        position: task.position,
        is_recurring: true,
        recurrence_rule: Some(rule.clone()),
        recurring_streak: streak,
        category_confidence: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    })
}
