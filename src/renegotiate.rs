//! The renegotiation engine: structured ways out for overdue tasks.
//!
//! When a task has slipped past the overdue threshold the user is offered
//! four actions (reschedule, split, park, drop), always paired with a
//! reason code the user picks themselves. Split suggestions come from
//! plain text heuristics over the title; no model is consulted. This flow
//! is confirm-then-apply: nothing changes until the submission succeeds.

use std::sync::OnceLock;

use chrono::{Duration, NaiveDate, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::models::{ReasonCode, RenegotiationAction, Task};
use crate::{Error, Result};

/// Days past due before a task is flagged for renegotiation.
pub const OVERDUE_THRESHOLD_DAYS: i64 = 3;

/// Most sub-steps a split suggestion will propose.
pub const MAX_SPLIT_STEPS: usize = 5;

/// Smallest duration a sub-step is ever estimated at.
pub const MIN_STEP_MINUTES: u32 = 15;

/// Assumed total effort when the task has no estimate.
const DEFAULT_TOTAL_MINUTES: u32 = 60;

/// The local time rescheduled tasks land on.
pub fn reschedule_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// True when the task should be offered renegotiation: still active and
/// overdue by at least [`OVERDUE_THRESHOLD_DAYS`].
pub fn needs_renegotiation(task: &Task, today: NaiveDate) -> bool {
    task.is_active()
        && task
            .due_date
            .is_some_and(|due| dates::days_overdue(due, today) >= OVERDUE_THRESHOLD_DAYS)
}

/// Actions offered for a task, in display order. Empty when the task is
/// not flagged.
pub fn available_actions(task: &Task, today: NaiveDate) -> &'static [RenegotiationAction] {
    if needs_renegotiation(task, today) {
        &[
            RenegotiationAction::Reschedule,
            RenegotiationAction::Split,
            RenegotiationAction::Park,
            RenegotiationAction::Drop,
        ]
    } else {
        &[]
    }
}

/// A one-tap reschedule target. Custom dates bypass this and supply their
/// own date directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickPick {
    Tomorrow,
    NextWeek,
}

impl QuickPick {
    /// Resolve to a concrete date relative to `today`. Quick picks always
    /// land at the fixed local reschedule time (9:00).
    pub fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveTime) {
        let date = match self {
            QuickPick::Tomorrow => today + Duration::days(1),
            QuickPick::NextWeek => today + Duration::days(7),
        };
        (date, reschedule_time())
    }
}

impl std::fmt::Display for QuickPick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuickPick::Tomorrow => write!(f, "tomorrow"),
            QuickPick::NextWeek => write!(f, "next_week"),
        }
    }
}

impl std::str::FromStr for QuickPick {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tomorrow" => Ok(QuickPick::Tomorrow),
            "next_week" | "next-week" => Ok(QuickPick::NextWeek),
            _ => Err(format!("Unknown quick pick: {}", s)),
        }
    }
}

/// One proposed sub-step of a split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskSuggestion {
    /// Sub-step title
    pub title: String,

    /// Estimated effort in minutes
    pub estimated_minutes: u32,

    /// Suggested due date
    pub due_date: NaiveDate,
}

/// What a renegotiation submission carries to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenegotiationRequest {
    /// Task being renegotiated
    pub task_id: String,

    /// Chosen action
    pub action: RenegotiationAction,

    /// Chosen reason code
    pub reason_code: ReasonCode,

    /// Free text, required when the code is `other`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_text: Option<String>,

    /// New due date, required for reschedule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_due_date: Option<NaiveDate>,

    /// Sub-steps, required for split
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<SubtaskSuggestion>>,
}

/// Check a submission for missing required fields. Runs before any
/// network or store call; a failure here never leaves the client.
pub fn validate(request: &RenegotiationRequest) -> Result<()> {
    if request.task_id.trim().is_empty() {
        return Err(Error::InvalidInput("Renegotiation requires a task id".to_string()));
    }
    if request.reason_code.requires_text()
        && !request
            .reason_text
            .as_ref()
            .is_some_and(|t| !t.trim().is_empty())
    {
        return Err(Error::InvalidInput(
            "Reason 'other' requires explanatory text".to_string(),
        ));
    }
    match request.action {
        RenegotiationAction::Reschedule => {
            if request.new_due_date.is_none() {
                return Err(Error::InvalidInput(
                    "Reschedule requires a new due date".to_string(),
                ));
            }
        }
        RenegotiationAction::Split => {
            let has_steps = request
                .subtasks
                .as_ref()
                .is_some_and(|steps| !steps.is_empty());
            if !has_steps {
                return Err(Error::InvalidInput(
                    "Split requires at least one sub-step".to_string(),
                ));
            }
            if let Some(steps) = &request.subtasks {
                if steps.iter().any(|s| s.title.trim().is_empty()) {
                    return Err(Error::InvalidInput(
                        "Sub-step titles cannot be empty".to_string(),
                    ));
                }
            }
        }
        RenegotiationAction::Park | RenegotiationAction::Drop => {}
    }
    Ok(())
}

fn connective_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+(?:and then|then|and)\s+|\s*[;,]\s*").ok())
        .as_ref()
}

/// Propose sub-steps for a task title. Titles with connectives ("and",
/// "then", commas) split into their clauses; anything else gets a
/// plan/start/finish template. The estimated total is spread evenly over
/// the steps (minimum [`MIN_STEP_MINUTES`] each) and suggested due dates
/// run on consecutive days starting tomorrow.
pub fn split_suggestions(
    title: &str,
    estimated_minutes: Option<u32>,
    today: NaiveDate,
) -> Vec<SubtaskSuggestion> {
    let clauses: Vec<String> = match connective_regex() {
        Some(re) => re
            .split(title)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .take(MAX_SPLIT_STEPS)
            .map(String::from)
            .collect(),
        None => Vec::new(),
    };

    let titles: Vec<String> = if clauses.len() >= 2 {
        clauses
    } else {
        let title = title.trim();
        vec![
            format!("Plan out {}", title),
            format!("Do the first chunk of {}", title),
            format!("Finish {}", title),
        ]
    };

    materialize(titles, estimated_minutes, today)
}

/// Build sub-steps from user-supplied titles, with the same duration
/// spread and consecutive due dates as [`split_suggestions`]. Blank
/// titles are dropped and the step cap still applies.
pub fn steps_from_titles(
    titles: &[String],
    estimated_minutes: Option<u32>,
    today: NaiveDate,
) -> Vec<SubtaskSuggestion> {
    let titles: Vec<String> = titles
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .take(MAX_SPLIT_STEPS)
        .map(String::from)
        .collect();
    materialize(titles, estimated_minutes, today)
}

fn materialize(
    titles: Vec<String>,
    estimated_minutes: Option<u32>,
    today: NaiveDate,
) -> Vec<SubtaskSuggestion> {
    if titles.is_empty() {
        return Vec::new();
    }
    let total = estimated_minutes.unwrap_or(DEFAULT_TOTAL_MINUTES);
    let per_step = (total / titles.len() as u32).max(MIN_STEP_MINUTES);

    titles
        .into_iter()
        .enumerate()
        .map(|(index, title)| SubtaskSuggestion {
            title,
            estimated_minutes: per_step,
            due_date: today + Duration::days(1 + index as i64),
        })
        .collect()
}
