//! Data models for Cairn entities.
//!
//! This module defines the core data structures:
//! - `Task` - Work items with status, due dates, and recurrence
//! - `Category` - User-defined labels tasks can belong to
//! - `Outcome` - Longer-horizon goals tasks roll up into
//! - `Commitment` - Recurring promises attached to an outcome
//! - `RenegotiationRecord` - Audit entries for renegotiated overdue tasks
//! - `TaskPatch` - Partial-update payload applied to a task

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Task status in the workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Active,
    Done,
    /// Soft-deleted; kept for history but hidden from lists
    Dropped,
    /// A recurring occurrence the user let pass without doing
    Skipped,
}

impl TaskStatus {
    /// Get all statuses.
    pub fn all() -> &'static [TaskStatus] {
        &[
            TaskStatus::Active,
            TaskStatus::Done,
            TaskStatus::Dropped,
            TaskStatus::Skipped,
        ]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Active => "active",
            TaskStatus::Done => "done",
            TaskStatus::Dropped => "dropped",
            TaskStatus::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(TaskStatus::Active),
            "done" => Ok(TaskStatus::Done),
            "dropped" => Ok(TaskStatus::Dropped),
            "skipped" => Ok(TaskStatus::Skipped),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

/// Task priority. Absent means the user never set one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// How often a recurring task repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    /// Monday through Friday
    Weekdays,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Weekdays => "weekdays",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "weekdays" => Ok(Frequency::Weekdays),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

/// Recurrence rule attached to a recurring task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// Repeat cadence
    pub frequency: Frequency,

    /// Last date an occurrence may fall on; recurrence stops past it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl RecurrenceRule {
    /// Create a rule with no end date.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            end_date: None,
        }
    }
}

/// A work item tracked by Cairn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (e.g., "cn-a1b2")
    pub id: String,

    /// Task title
    pub title: String,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,

    /// Target date; tasks without one live in the No Date bucket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// Optional time-of-day refinement for the due date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_time: Option<NaiveTime>,

    /// Priority level, unset unless the user chose one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    /// Category this task belongs to; None means uncategorized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,

    /// Outcome this task contributes to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_id: Option<String>,

    /// Manual sort position; not unique, insertion order breaks ties
    #[serde(default)]
    pub position: i64,

    /// True when a recurrence rule is attached
    #[serde(default)]
    pub is_recurring: bool,

    /// Recurrence rule; present if and only if `is_recurring`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<RecurrenceRule>,

    /// Consecutive completed occurrences for recurring tasks
    #[serde(default)]
    pub recurring_streak: u32,

    /// Confidence of a suggested category when the task came from dump parsing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_confidence: Option<f32>,

    /// Completion timestamp; present if and only if status is done
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new active task with the given ID and title.
    pub fn new(id: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            status: TaskStatus::default(),
            due_date: None,
            due_time: None,
            priority: None,
            category_id: None,
            outcome_id: None,
            position: 0,
            is_recurring: false,
            recurrence_rule: None,
            recurring_streak: 0,
            category_confidence: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the task is still open for work.
    pub fn is_active(&self) -> bool {
        self.status == TaskStatus::Active
    }

    /// Returns true if the task has been completed.
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Move to a new status, keeping `completed_at` consistent with it.
    pub fn transition_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        self.completed_at = if status == TaskStatus::Done {
            Some(now)
        } else {
            None
        };
        self.status = status;
        self.updated_at = now;
    }

    /// Attach or remove a recurrence rule, keeping `is_recurring` in sync.
    pub fn set_recurrence(&mut self, rule: Option<RecurrenceRule>) {
        self.is_recurring = rule.is_some();
        self.recurrence_rule = rule;
    }
}

/// A user-defined label tasks can belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier (e.g., "cnc-a1b2")
    pub id: String,

    /// Display name
    pub name: String,

    /// Display color (CSS-style, e.g., "#7c9a72")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Display icon name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new category with the given ID and name.
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            color: None,
            icon: None,
            created_at: Utc::now(),
        }
    }
}

/// Outcome status over its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    #[default]
    Active,
    Achieved,
    Abandoned,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeStatus::Active => "active",
            OutcomeStatus::Achieved => "achieved",
            OutcomeStatus::Abandoned => "abandoned",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for OutcomeStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(OutcomeStatus::Active),
            "achieved" => Ok(OutcomeStatus::Achieved),
            "abandoned" => Ok(OutcomeStatus::Abandoned),
            _ => Err(format!("Unknown outcome status: {}", s)),
        }
    }
}

/// A longer-horizon goal that tasks and commitments roll up into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Unique identifier (e.g., "cno-a1b2")
    pub id: String,

    /// Outcome title
    pub title: String,

    /// Detailed description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Target date for achieving the outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,

    /// Current status
    #[serde(default)]
    pub status: OutcomeStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Outcome {
    /// Create a new active outcome with the given ID and title.
    pub fn new(id: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            description: None,
            target_date: None,
            status: OutcomeStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update applied to an outcome. Absent fields are left
/// untouched; nullable fields use an explicit null to clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomePatch {
    /// New title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// New description; null clears it
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,

    /// New target date; null clears it
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_date: Option<Option<NaiveDate>>,

    /// New status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OutcomeStatus>,
}

impl OutcomePatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == OutcomePatch::default()
    }

    /// Apply this patch to an outcome in place.
    pub fn apply_to(&self, outcome: &mut Outcome, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            outcome.title = title.clone();
        }
        if let Some(description) = &self.description {
            outcome.description = description.clone();
        }
        if let Some(target_date) = self.target_date {
            outcome.target_date = target_date;
        }
        if let Some(status) = &self.status {
            outcome.status = status.clone();
        }
        outcome.updated_at = now;
    }
}

/// Commitment status over its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentStatus {
    #[default]
    Active,
    Kept,
    Broken,
}

impl fmt::Display for CommitmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommitmentStatus::Active => "active",
            CommitmentStatus::Kept => "kept",
            CommitmentStatus::Broken => "broken",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for CommitmentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(CommitmentStatus::Active),
            "kept" => Ok(CommitmentStatus::Kept),
            "broken" => Ok(CommitmentStatus::Broken),
            _ => Err(format!("Unknown commitment status: {}", s)),
        }
    }
}

/// A recurring promise the user makes toward an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    /// Unique identifier (e.g., "cnm-a1b2")
    pub id: String,

    /// Outcome this commitment supports
    pub outcome_id: String,

    /// Commitment title
    pub title: String,

    /// Free-text cadence (e.g., "3x per week")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadence: Option<String>,

    /// Current status
    #[serde(default)]
    pub status: CommitmentStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Commitment {
    /// Create a new active commitment for an outcome.
    pub fn new(id: String, outcome_id: String, title: String) -> Self {
        Self {
            id,
            outcome_id,
            title,
            cadence: None,
            status: CommitmentStatus::default(),
            created_at: Utc::now(),
        }
    }
}

/// What the user chose to do with an overdue task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenegotiationAction {
    /// Move the due date forward
    Reschedule,
    /// Break the task into smaller sub-steps
    Split,
    /// Clear the due date and keep the task as someday work
    Park,
    /// Let the task go
    Drop,
}

impl fmt::Display for RenegotiationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RenegotiationAction::Reschedule => "reschedule",
            RenegotiationAction::Split => "split",
            RenegotiationAction::Park => "park",
            RenegotiationAction::Drop => "drop",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for RenegotiationAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "reschedule" => Ok(RenegotiationAction::Reschedule),
            "split" => Ok(RenegotiationAction::Split),
            "park" => Ok(RenegotiationAction::Park),
            "drop" => Ok(RenegotiationAction::Drop),
            _ => Err(format!("Unknown renegotiation action: {}", s)),
        }
    }
}

/// Why the task did not happen as planned. Always chosen by the user,
/// never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    TooBig,
    WrongTime,
    Blocked,
    LostInterest,
    Other,
}

impl ReasonCode {
    /// Get all reason codes.
    pub fn all() -> &'static [ReasonCode] {
        &[
            ReasonCode::TooBig,
            ReasonCode::WrongTime,
            ReasonCode::Blocked,
            ReasonCode::LostInterest,
            ReasonCode::Other,
        ]
    }

    /// Returns true if this code requires accompanying free text.
    pub fn requires_text(&self) -> bool {
        matches!(self, ReasonCode::Other)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasonCode::TooBig => "too_big",
            ReasonCode::WrongTime => "wrong_time",
            ReasonCode::Blocked => "blocked",
            ReasonCode::LostInterest => "lost_interest",
            ReasonCode::Other => "other",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ReasonCode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "too_big" => Ok(ReasonCode::TooBig),
            "wrong_time" => Ok(ReasonCode::WrongTime),
            "blocked" => Ok(ReasonCode::Blocked),
            "lost_interest" => Ok(ReasonCode::LostInterest),
            "other" => Ok(ReasonCode::Other),
            _ => Err(format!("Unknown reason code: {}", s)),
        }
    }
}

/// Audit entry recorded when an overdue task is renegotiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenegotiationRecord {
    /// Unique identifier (e.g., "cnr-a1b2")
    pub id: String,

    /// Task the renegotiation applied to
    pub task_id: String,

    /// Action taken
    pub action: RenegotiationAction,

    /// Why the task did not happen
    pub reason_code: ReasonCode,

    /// Free text, required when reason_code is `other`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_text: Option<String>,

    /// New due date for reschedule actions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_due_date: Option<NaiveDate>,

    /// Tasks created by a split action
    #[serde(default)]
    pub subtask_ids: Vec<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A single entry in a bulk reorder request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    /// Task ID
    pub id: String,

    /// New manual-sort position
    pub position: i64,
}

/// Response to a task patch: the stored task, plus the next occurrence
/// when the patch completed or skipped a recurring task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchResponse {
    /// The task after the patch was applied
    pub task: Task,

    /// Newly created occurrence of a recurring task, if any
    #[serde(
        rename = "nextOccurrence",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub next_occurrence: Option<Task>,
}

/// Deserialize a field that distinguishes "absent" from "present but null".
/// Absent stays `None` via `#[serde(default)]`; an explicit null becomes
/// `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update applied to a task. Absent fields are left untouched;
/// nullable fields use an explicit null to clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// New status; moving to or from done adjusts `completed_at`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    /// New due date; null clears it
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<NaiveDate>>,

    /// New due time; null clears it
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_time: Option<Option<NaiveTime>>,

    /// New priority; null clears it
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority: Option<Option<Priority>>,

    /// New category; null moves the task to uncategorized
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<Option<String>>,

    /// New outcome link; null detaches
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub outcome_id: Option<Option<String>>,

    /// New manual-sort position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,

    /// New recurrence rule; null removes recurrence
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub recurrence_rule: Option<Option<RecurrenceRule>>,
}

impl TaskPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Convenience patch that only changes status.
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Apply this patch to a task in place. `completed_at` and
    /// `is_recurring` are kept consistent with the fields they mirror.
    pub fn apply_to(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(status) = &self.status {
            task.transition_status(status.clone(), now);
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(due_time) = self.due_time {
            task.due_time = due_time;
        }
        if let Some(priority) = &self.priority {
            task.priority = priority.clone();
        }
        if let Some(category_id) = &self.category_id {
            task.category_id = category_id.clone();
        }
        if let Some(outcome_id) = &self.outcome_id {
            task.outcome_id = outcome_id.clone();
        }
        if let Some(position) = self.position {
            task.position = position;
        }
        if let Some(rule) = &self.recurrence_rule {
            task.set_recurrence(rule.clone());
        }
        task.updated_at = now;
    }
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_time: Option<NaiveTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_confidence: Option<f32>,
}

impl NewTask {
    /// Materialize into a stored task at the given manual-sort position.
    pub fn into_task(self, id: String, position: i64, now: DateTime<Utc>) -> Task {
        let mut task = Task::new(id, self.title);
        task.due_date = self.due_date;
        task.due_time = self.due_time;
        task.priority = self.priority;
        task.category_id = self.category_id;
        task.outcome_id = self.outcome_id;
        task.category_confidence = self.category_confidence;
        task.set_recurrence(self.recurrence);
        task.position = position;
        task.created_at = now;
        task.updated_at = now;
        task
    }
}

/// Fields accepted when creating a category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NewCategory {
    pub fn into_category(self, id: String, now: DateTime<Utc>) -> Category {
        let mut category = Category::new(id, self.name);
        category.color = self.color;
        category.icon = self.icon;
        category.created_at = now;
        category
    }
}

/// Fields accepted when creating an outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewOutcome {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
}

impl NewOutcome {
    pub fn into_outcome(self, id: String, now: DateTime<Utc>) -> Outcome {
        let mut outcome = Outcome::new(id, self.title);
        outcome.description = self.description;
        outcome.target_date = self.target_date;
        outcome.created_at = now;
        outcome.updated_at = now;
        outcome
    }
}

/// Fields accepted when creating a commitment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCommitment {
    pub outcome_id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<String>,
}

impl NewCommitment {
    pub fn into_commitment(self, id: String, now: DateTime<Utc>) -> Commitment {
        let mut commitment = Commitment::new(id, self.outcome_id, self.title);
        commitment.cadence = self.cadence;
        commitment.created_at = now;
        commitment
    }
}
