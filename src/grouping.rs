//! The five-bucket task list grouping and its per-bucket sort modes.
//!
//! Placement is an ordered decision table, first match wins: dropped and
//! skipped tasks appear nowhere; done tasks appear in Done Today only when
//! they were completed on the current local day; active tasks fall into
//! Overdue, Today, This Week, or No Date. Sorting happens within a bucket,
//! never across buckets.

use std::fmt;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::models::{Task, TaskStatus};

/// The fixed display buckets, in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Overdue,
    Today,
    ThisWeek,
    NoDate,
    DoneToday,
}

impl Bucket {
    /// All buckets in render order.
    pub fn all() -> &'static [Bucket] {
        &[
            Bucket::Overdue,
            Bucket::Today,
            Bucket::ThisWeek,
            Bucket::NoDate,
            Bucket::DoneToday,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Overdue => "Overdue",
            Bucket::Today => "Today",
            Bucket::ThisWeek => "This Week",
            Bucket::NoDate => "No Date",
            Bucket::DoneToday => "Done Today",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Bucket::Overdue => "#e05252",
            Bucket::Today => "#e8a33d",
            Bucket::ThisWeek => "#4a90d9",
            Bucket::NoDate => "#8a8a8a",
            Bucket::DoneToday => "#57a55a",
        }
    }

    /// Done Today starts collapsed; everything else starts open.
    pub fn collapsed_by_default(&self) -> bool {
        matches!(self, Bucket::DoneToday)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One rendered bucket with its tasks.
#[derive(Debug, Clone, Serialize)]
pub struct BucketGroup {
    pub bucket: Bucket,
    pub label: &'static str,
    pub color: &'static str,
    pub collapsed_by_default: bool,
    pub tasks: Vec<Task>,
}

impl BucketGroup {
    fn empty(bucket: Bucket) -> Self {
        Self {
            bucket,
            label: bucket.label(),
            color: bucket.color(),
            collapsed_by_default: bucket.collapsed_by_default(),
            tasks: Vec::new(),
        }
    }
}

type PlacementRule = (fn(&Task, NaiveDate) -> bool, Option<Bucket>);

/// The placement decision table. Rows are evaluated top to bottom and the
/// first matching row wins; the final row matches everything, so every
/// task resolves to exactly one row.
const PLACEMENT_RULES: &[PlacementRule] = &[
    (hidden_status, None),
    (done_fresh, Some(Bucket::DoneToday)),
    (done_stale, None),
    (due_past, Some(Bucket::Overdue)),
    (due_today, Some(Bucket::Today)),
    (due_this_week, Some(Bucket::ThisWeek)),
    // Anything further out is treated like undated work
    (remainder, Some(Bucket::NoDate)),
];

fn hidden_status(task: &Task, _today: NaiveDate) -> bool {
    matches!(task.status, TaskStatus::Dropped | TaskStatus::Skipped)
}

fn done_fresh(task: &Task, today: NaiveDate) -> bool {
    task.is_done() && completed_today(task, today)
}

fn done_stale(task: &Task, _today: NaiveDate) -> bool {
    task.is_done()
}

fn due_past(task: &Task, today: NaiveDate) -> bool {
    task.due_date.is_some_and(|d| dates::is_overdue(d, today))
}

fn due_today(task: &Task, today: NaiveDate) -> bool {
    task.due_date.is_some_and(|d| dates::is_today(d, today))
}

fn due_this_week(task: &Task, today: NaiveDate) -> bool {
    task.due_date.is_some_and(|d| dates::in_current_week(d, today))
}

fn remainder(_task: &Task, _today: NaiveDate) -> bool {
    true
}

/// Which bucket a task belongs in, or `None` when it is not shown.
pub fn classify(task: &Task, today: NaiveDate) -> Option<Bucket> {
    for (predicate, bucket) in PLACEMENT_RULES {
        if predicate(task, today) {
            return *bucket;
        }
    }
    None
}

fn completed_today(task: &Task, today: NaiveDate) -> bool {
    task.completed_at
        .map(|t| t.with_timezone(&Local).date_naive() == today)
        .unwrap_or(false)
}

/// Distribute tasks into all five buckets in render order. Buckets may be
/// empty; callers strip those with [`retain_nonempty`] before rendering.
pub fn group_tasks(tasks: &[Task], today: NaiveDate) -> Vec<BucketGroup> {
    let mut groups: Vec<BucketGroup> = Bucket::all()
        .iter()
        .map(|b| BucketGroup::empty(*b))
        .collect();
    for task in tasks {
        if let Some(bucket) = classify(task, today) {
            let idx = Bucket::all().iter().position(|b| *b == bucket).unwrap_or(0);
            groups[idx].tasks.push(task.clone());
        }
    }
    groups
}

/// Drop empty buckets, preserving order.
pub fn retain_nonempty(groups: Vec<BucketGroup>) -> Vec<BucketGroup> {
    groups.into_iter().filter(|g| !g.tasks.is_empty()).collect()
}

/// Sort order applied within each bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Ascending by manual position
    #[default]
    Manual,
    /// Ascending by due date, undated tasks last
    DueDate,
    /// Newest first
    CreatedDate,
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortMode::Manual => "manual",
            SortMode::DueDate => "due_date",
            SortMode::CreatedDate => "created_date",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "manual" => Ok(SortMode::Manual),
            "due_date" => Ok(SortMode::DueDate),
            "created_date" => Ok(SortMode::CreatedDate),
            _ => Err(format!("Unknown sort mode: {}", s)),
        }
    }
}

/// Sort a task list in place. All three modes are stable, so ties keep
/// their original relative order.
pub fn sort_tasks(tasks: &mut [Task], mode: SortMode) {
    match mode {
        SortMode::Manual => tasks.sort_by_key(|t| t.position),
        SortMode::DueDate => tasks.sort_by(|a, b| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }),
        SortMode::CreatedDate => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}

/// The full list pipeline: bucket the tasks, then sort inside each bucket.
pub fn group_and_sort(tasks: &[Task], today: NaiveDate, mode: SortMode) -> Vec<BucketGroup> {
    let mut groups = group_tasks(tasks, today);
    for group in &mut groups {
        sort_tasks(&mut group.tasks, mode);
    }
    groups
}
