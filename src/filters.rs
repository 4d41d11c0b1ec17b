//! Multi-dimension task filters and their URL query-string codec.
//!
//! Filter semantics: AND across dimensions, OR within a dimension. An
//! empty dimension is unconstrained, so the default filter set is the
//! identity. The query-string codec is lenient in both directions:
//! decoding never fails, it just drops what it cannot understand.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::models::{Priority, Task, TaskStatus};

/// Sentinel category value selecting tasks that have no category.
pub const UNCATEGORIZED: &str = "none";

/// Due-date bucket a filter can pin tasks to. Mutually exclusive; a task
/// with no due date matches only `NoDate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueBucket {
    Overdue,
    Today,
    Tomorrow,
    ThisWeek,
    NextWeek,
    NoDate,
}

impl DueBucket {
    /// Membership test against an explicit evaluation date.
    pub fn contains(&self, due: Option<NaiveDate>, today: NaiveDate) -> bool {
        match (self, due) {
            (DueBucket::NoDate, None) => true,
            (DueBucket::NoDate, Some(_)) => false,
            (_, None) => false,
            (DueBucket::Overdue, Some(d)) => dates::is_overdue(d, today),
            (DueBucket::Today, Some(d)) => dates::is_today(d, today),
            (DueBucket::Tomorrow, Some(d)) => dates::is_tomorrow(d, today),
            (DueBucket::ThisWeek, Some(d)) => dates::in_current_week(d, today),
            (DueBucket::NextWeek, Some(d)) => dates::in_next_week(d, today),
        }
    }
}

impl fmt::Display for DueBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DueBucket::Overdue => "overdue",
            DueBucket::Today => "today",
            DueBucket::Tomorrow => "tomorrow",
            DueBucket::ThisWeek => "this_week",
            DueBucket::NextWeek => "next_week",
            DueBucket::NoDate => "no_date",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for DueBucket {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "overdue" => Ok(DueBucket::Overdue),
            "today" => Ok(DueBucket::Today),
            "tomorrow" => Ok(DueBucket::Tomorrow),
            "this_week" => Ok(DueBucket::ThisWeek),
            "next_week" => Ok(DueBucket::NextWeek),
            "no_date" => Ok(DueBucket::NoDate),
            _ => Err(format!("Unknown due bucket: {}", s)),
        }
    }
}

/// Active filter selections across every dimension of the task list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilters {
    /// Category ids to include; the [`UNCATEGORIZED`] sentinel selects
    /// tasks without a category
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub categories: BTreeSet<String>,

    /// Statuses to include
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub statuses: BTreeSet<TaskStatus>,

    /// Priorities to include
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub priorities: BTreeSet<Priority>,

    /// Single due-date bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DueBucket>,

    /// Tri-state recurrence flag: None = all, Some(true) = recurring only,
    /// Some(false) = one-off only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<bool>,
}

impl TaskFilters {
    /// Returns true when any dimension is constrained.
    pub fn has_active(&self) -> bool {
        !self.categories.is_empty()
            || !self.statuses.is_empty()
            || !self.priorities.is_empty()
            || self.due.is_some()
            || self.recurring.is_some()
    }

    /// Test a single task against every dimension.
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        if !self.categories.is_empty() {
            let hit = match &task.category_id {
                Some(id) => self.categories.contains(id),
                None => self.categories.contains(UNCATEGORIZED),
            };
            if !hit {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if !self.priorities.is_empty() {
            let hit = task
                .priority
                .as_ref()
                .is_some_and(|p| self.priorities.contains(p));
            if !hit {
                return false;
            }
        }
        if let Some(bucket) = self.due {
            if !bucket.contains(task.due_date, today) {
                return false;
            }
        }
        if let Some(recurring) = self.recurring {
            if task.is_recurring != recurring {
                return false;
            }
        }
        true
    }

    /// Filter a task list, preserving input order.
    pub fn apply(&self, tasks: &[Task], today: NaiveDate) -> Vec<Task> {
        tasks
            .iter()
            .filter(|t| self.matches(t, today))
            .cloned()
            .collect()
    }

    /// Encode as a URL query string with one parameter per dimension.
    /// Unconstrained dimensions are omitted; default filters encode as "".
    /// Values are restricted identifiers, so no percent-escaping is needed.
    pub fn to_query_string(&self) -> String {
        let mut params: Vec<String> = Vec::new();
        if !self.categories.is_empty() {
            let values: Vec<&str> = self.categories.iter().map(|s| s.as_str()).collect();
            params.push(format!("categories={}", values.join(",")));
        }
        if !self.statuses.is_empty() {
            let values: Vec<String> = self.statuses.iter().map(|s| s.to_string()).collect();
            params.push(format!("statuses={}", values.join(",")));
        }
        if !self.priorities.is_empty() {
            let values: Vec<String> = self.priorities.iter().map(|p| p.to_string()).collect();
            params.push(format!("priorities={}", values.join(",")));
        }
        if let Some(bucket) = self.due {
            params.push(format!("due={}", bucket));
        }
        if let Some(recurring) = self.recurring {
            params.push(format!("recurring={}", recurring));
        }
        params.join("&")
    }

    /// Decode a query string. Never fails: unknown keys are ignored and
    /// values that do not parse are dropped, leaving that dimension at its
    /// default. A leading '?' is tolerated.
    pub fn from_query_string(query: &str) -> Self {
        let mut filters = TaskFilters::default();
        let query = query.strip_prefix('?').unwrap_or(query);
        for pair in query.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "categories" => {
                    filters.categories = value
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(String::from)
                        .collect();
                }
                "statuses" => {
                    filters.statuses = value
                        .split(',')
                        .filter_map(|v| v.trim().parse::<TaskStatus>().ok())
                        .collect();
                }
                "priorities" => {
                    filters.priorities = value
                        .split(',')
                        .filter_map(|v| v.trim().parse::<Priority>().ok())
                        .collect();
                }
                "due" => {
                    filters.due = value.trim().parse::<DueBucket>().ok();
                }
                "recurring" => {
                    filters.recurring = match value.trim() {
                        "true" => Some(true),
                        "false" => Some(false),
                        _ => None,
                    };
                }
                _ => {}
            }
        }
        filters
    }
}
