//! Command implementations for the Cairn CLI.
//!
//! This module contains the business logic for each CLI command.
//! Commands are organized by entity type:
//! - `system` - Data directory initialization
//! - `task` - Task CRUD, completion, and manual ordering
//! - `category` / `outcome` / `commitment` - Supporting entities
//! - `view` / `config` - Preference-backed client state
//! - `renegotiate` - Overdue-task preview and renegotiation
//!
//! Every command returns a typed result implementing [`Output`], so the
//! binary can print it as JSON (the default) or human-readable text.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::dates;
use crate::filters::TaskFilters;
use crate::grouping::{self, BucketGroup, SortMode};
use crate::models::{
    Category, Commitment, NewCategory, NewCommitment, NewOutcome, NewTask, Outcome, OutcomePatch,
    PatchResponse, PositionUpdate, ReasonCode, RenegotiationAction, RenegotiationRecord, Task,
    TaskPatch, TaskStatus,
};
use crate::prefs::Prefs;
use crate::renegotiate::{self, QuickPick, RenegotiationRequest, SubtaskSuggestion};
use crate::store::{self, RenegotiationOutcome, Store};
use crate::views::SavedView;
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

// ---------------------------------------------------------------------------
// System

/// Result of `system init`.
#[derive(Debug, Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub created: bool,
    pub path: PathBuf,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.created {
            format!("Initialized cairn data at {}", self.path.display())
        } else {
            format!("Already initialized at {}", self.path.display())
        }
    }
}

/// Create the data directory and database. Safe to run again; an
/// existing directory is left as it is.
pub fn system_init(data_dir: &Path) -> Result<InitResult> {
    let created = !Store::exists(data_dir);
    Store::init(data_dir)?;
    Ok(InitResult {
        initialized: true,
        created,
        path: data_dir.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Tasks

/// A single created task.
#[derive(Debug, Serialize)]
pub struct TaskResult {
    pub task: Task,
}

impl Output for TaskResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let task = &self.task;
        let mut out = vec![format!("Created {}: {}", task.id, task.title)];
        if let Some(line) = due_line(task) {
            out.push(format!("  due: {}", line));
        }
        if let Some(priority) = &task.priority {
            out.push(format!("  priority: {}", priority));
        }
        if let Some(category) = &task.category_id {
            out.push(format!("  category: {}", category));
        }
        if let Some(outcome) = &task.outcome_id {
            out.push(format!("  outcome: {}", outcome));
        }
        if let Some(rule) = &task.recurrence_rule {
            let mut line = format!("  repeats: {}", rule.frequency);
            if let Some(end) = rule.end_date {
                line.push_str(&format!(" until {}", end));
            }
            out.push(line);
        }
        out.join("\n")
    }
}

/// The grouped (or flat) task listing.
#[derive(Debug, Serialize)]
pub struct TaskListResult {
    pub total: usize,
    pub sort_mode: SortMode,

    /// Name of the saved view the listing was filtered through, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<BucketGroup>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
}

impl Output for TaskListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out: Vec<String> = Vec::new();
        if let Some(view) = &self.view {
            out.push(format!("View: {}", view));
        }
        match (&self.groups, &self.tasks) {
            (Some(groups), _) => {
                for group in groups {
                    out.push(format!("{} ({})", group.label, group.tasks.len()));
                    for task in &group.tasks {
                        out.push(format_task_line(task));
                    }
                }
            }
            (None, Some(tasks)) => {
                for task in tasks {
                    out.push(format_task_line(task));
                }
            }
            (None, None) => {}
        }
        if self.total == 0 {
            out.push("No tasks to show. Add one with `cairn task add \"Title\"`.".to_string());
        } else {
            out.push(format!("{} task(s), sort: {}", self.total, self.sort_mode));
        }
        out.join("\n")
    }
}

/// Full detail for one task, with its linked entities and history.
#[derive(Debug, Serialize)]
pub struct TaskDetail {
    pub task: Task,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,

    pub days_overdue: i64,
    pub needs_renegotiation: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub renegotiations: Vec<RenegotiationRecord>,
}

impl Output for TaskDetail {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let task = &self.task;
        let mut out = vec![format!("{}: {}", task.id, task.title)];
        out.push(format!("  status: {}", task.status));
        if let Some(line) = due_line(task) {
            let mut line = format!("  due: {}", line);
            if self.days_overdue > 0 {
                line.push_str(&format!(" ({} days overdue", self.days_overdue));
                if self.needs_renegotiation {
                    line.push_str(", renegotiation suggested");
                }
                line.push(')');
            }
            out.push(line);
        }
        if let Some(priority) = &task.priority {
            out.push(format!("  priority: {}", priority));
        }
        if let Some(category) = &self.category {
            out.push(format!("  category: {} ({})", category.name, category.id));
        }
        if let Some(outcome) = &self.outcome {
            out.push(format!("  outcome: {} ({})", outcome.title, outcome.id));
        }
        if let Some(rule) = &task.recurrence_rule {
            let mut line = format!("  repeats: {}", rule.frequency);
            if let Some(end) = rule.end_date {
                line.push_str(&format!(" until {}", end));
            }
            line.push_str(&format!(", streak {}", task.recurring_streak));
            out.push(line);
        }
        out.push(format!(
            "  created: {}",
            task.created_at.format("%Y-%m-%d %H:%M")
        ));
        if !self.renegotiations.is_empty() {
            out.push("Renegotiations:".to_string());
            for record in &self.renegotiations {
                let mut line = format!(
                    "  {}  {} ({})",
                    record.created_at.format("%Y-%m-%d"),
                    record.action,
                    record.reason_code
                );
                if let Some(date) = record.new_due_date {
                    line.push_str(&format!(" to {}", date));
                }
                if !record.subtask_ids.is_empty() {
                    line.push_str(&format!(" into {} steps", record.subtask_ids.len()));
                }
                out.push(line);
            }
        }
        out.join("\n")
    }
}

impl Output for PatchResponse {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = vec![format!(
            "Updated {}: {} ({})",
            self.task.id, self.task.title, self.task.status
        )];
        if let Some(next) = &self.next_occurrence {
            let due = next
                .due_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unscheduled".to_string());
            out.push(format!("Next occurrence {} due {}", next.id, due));
        }
        out.join("\n")
    }
}

/// Result of a bulk reorder.
#[derive(Debug, Serialize)]
pub struct ReorderResult {
    pub ok: bool,
    pub updated: usize,
}

impl Output for ReorderResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Reordered {} task(s)", self.updated)
    }
}

/// Create a task at the end of the manual order.
pub fn task_add(data_dir: &Path, new: NewTask) -> Result<TaskResult> {
    if new.title.trim().is_empty() {
        return Err(Error::InvalidInput("Task title cannot be empty".to_string()));
    }
    let mut store = Store::open(data_dir)?;
    let id = store::generate_id(store::TASK_PREFIX, &new.title);
    let position = store.next_position()?;
    let task = new.into_task(id, position, Utc::now());
    store.create_task(&task)?;
    Ok(TaskResult { task })
}

/// List tasks through the given filters, bucketed unless `flat`.
///
/// A saved view (by id or name) replaces the ad hoc filters. The sort
/// mode falls back to the configured default, then to manual. The
/// bucketed listing never shows dropped or skipped tasks; use `flat`
/// with a status filter to inspect those.
pub fn task_list(
    data_dir: &Path,
    mut filters: TaskFilters,
    sort: Option<SortMode>,
    view: Option<&str>,
    flat: bool,
) -> Result<TaskListResult> {
    let store = Store::open(data_dir)?;
    let prefs = Prefs::load(data_dir);

    let mut view_name = None;
    if let Some(wanted) = view {
        let view = find_view(&prefs, wanted)
            .ok_or_else(|| Error::NotFound(format!("View not found: {}", wanted)))?;
        filters = view.filters.clone();
        view_name = Some(view.name);
    } else if filters.has_active() {
        // Label the listing when the ad hoc filters coincide with a saved view
        view_name = prefs.views.find_matching(&filters).map(|v| v.name);
    }

    let sort_mode = sort.or(prefs.sort_mode).unwrap_or_default();
    let today = dates::local_today();
    let tasks = filters.apply(&store.list_tasks(None, None)?, today);

    if flat {
        let mut tasks = tasks;
        grouping::sort_tasks(&mut tasks, sort_mode);
        Ok(TaskListResult {
            total: tasks.len(),
            sort_mode,
            view: view_name,
            groups: None,
            tasks: Some(tasks),
        })
    } else {
        let groups = grouping::retain_nonempty(grouping::group_and_sort(&tasks, today, sort_mode));
        Ok(TaskListResult {
            total: groups.iter().map(|g| g.tasks.len()).sum(),
            sort_mode,
            view: view_name,
            groups: Some(groups),
            tasks: None,
        })
    }
}

/// The default summary shown when cairn runs with no command.
pub fn status(data_dir: &Path) -> Result<TaskListResult> {
    task_list(data_dir, TaskFilters::default(), None, None, false)
}

/// Show one task with linked entities and renegotiation history.
pub fn task_show(data_dir: &Path, id: &str) -> Result<TaskDetail> {
    store::validate_task_id(id)?;
    let store = Store::open(data_dir)?;
    let task = store.get_task(id)?;
    let category = match &task.category_id {
        Some(category_id) => store.get_category(category_id).ok(),
        None => None,
    };
    let outcome = match &task.outcome_id {
        Some(outcome_id) => store.get_outcome(outcome_id).ok(),
        None => None,
    };
    let today = dates::local_today();
    let days_overdue = task
        .due_date
        .map(|d| dates::days_overdue(d, today))
        .unwrap_or(0);
    let needs_renegotiation = renegotiate::needs_renegotiation(&task, today);
    let renegotiations = store.list_renegotiations(Some(id))?;
    Ok(TaskDetail {
        task,
        category,
        outcome,
        days_overdue,
        needs_renegotiation,
        renegotiations,
    })
}

/// Apply a partial patch to a task.
pub fn task_update(data_dir: &Path, id: &str, patch: TaskPatch) -> Result<PatchResponse> {
    if patch.is_empty() {
        return Err(Error::InvalidInput("Nothing to update".to_string()));
    }
    let mut store = Store::open(data_dir)?;
    store.update_task(id, &patch, dates::local_today(), Utc::now())
}

/// Mark a task done. A recurring task spawns its next occurrence.
pub fn task_done(data_dir: &Path, id: &str) -> Result<PatchResponse> {
    task_update(data_dir, id, TaskPatch::status(TaskStatus::Done))
}

/// Skip a recurring occurrence; the streak resets.
pub fn task_skip(data_dir: &Path, id: &str) -> Result<PatchResponse> {
    task_update(data_dir, id, TaskPatch::status(TaskStatus::Skipped))
}

/// Drop a task. It stays in the database but leaves every listing.
pub fn task_drop(data_dir: &Path, id: &str) -> Result<PatchResponse> {
    task_update(data_dir, id, TaskPatch::status(TaskStatus::Dropped))
}

/// Reassign positions from an explicit ID order, spaced 1000 apart.
pub fn task_reorder(data_dir: &Path, ids: &[String]) -> Result<ReorderResult> {
    if ids.is_empty() {
        return Err(Error::InvalidInput(
            "Reorder needs at least one task id".to_string(),
        ));
    }
    let updates: Vec<PositionUpdate> = ids
        .iter()
        .enumerate()
        .map(|(index, id)| PositionUpdate {
            id: id.clone(),
            position: (index as i64) * 1000,
        })
        .collect();
    let mut store = Store::open(data_dir)?;
    store.reorder_tasks(&updates, Utc::now())?;
    Ok(ReorderResult {
        ok: true,
        updated: updates.len(),
    })
}

// ---------------------------------------------------------------------------
// Categories

#[derive(Debug, Serialize)]
pub struct CategoryResult {
    pub category: Category,
}

impl Output for CategoryResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let category = &self.category;
        let mut line = format!("{}  {}", category.id, category.name);
        if let Some(color) = &category.color {
            line.push_str(&format!("  {}", color));
        }
        line
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryListResult {
    pub categories: Vec<Category>,
}

impl Output for CategoryListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.categories.is_empty() {
            return "No categories.".to_string();
        }
        let mut out: Vec<String> = self
            .categories
            .iter()
            .map(|c| {
                let mut line = format!("  {}  {}", c.id, c.name);
                if let Some(color) = &c.color {
                    line.push_str(&format!("  {}", color));
                }
                line
            })
            .collect();
        out.push(format!("{} categories", self.categories.len()));
        out.join("\n")
    }
}

/// Result of a delete, echoing the removed ID.
#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub ok: bool,
    pub id: String,
}

impl Output for DeleteResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted {}", self.id)
    }
}

pub fn category_add(data_dir: &Path, new: NewCategory) -> Result<CategoryResult> {
    if new.name.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Category name cannot be empty".to_string(),
        ));
    }
    let mut store = Store::open(data_dir)?;
    let id = store::generate_id(store::CATEGORY_PREFIX, &new.name);
    let category = new.into_category(id, Utc::now());
    store.create_category(&category)?;
    Ok(CategoryResult { category })
}

pub fn category_list(data_dir: &Path) -> Result<CategoryListResult> {
    let store = Store::open(data_dir)?;
    Ok(CategoryListResult {
        categories: store.list_categories()?,
    })
}

/// Delete a category. Fails with a conflict while active tasks use it.
pub fn category_rm(data_dir: &Path, id: &str) -> Result<DeleteResult> {
    let mut store = Store::open(data_dir)?;
    store.delete_category(id)?;
    Ok(DeleteResult {
        ok: true,
        id: id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Saved views

#[derive(Debug, Serialize)]
pub struct ViewResult {
    pub view: SavedView,
}

impl Output for ViewResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Saved view {}: {}", self.view.id, self.view.name);
        let query = self.view.filters.to_query_string();
        if !query.is_empty() {
            out.push_str(&format!("\n  filters: {}", query));
        }
        out
    }
}

#[derive(Debug, Serialize)]
pub struct ViewListResult {
    pub views: Vec<SavedView>,
}

impl Output for ViewListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out: Vec<String> = Vec::new();
        for view in &self.views {
            let mut line = format!("  {}  {}", view.id, view.name);
            let query = view.filters.to_query_string();
            if !query.is_empty() {
                line.push_str(&format!("  [{}]", query));
            }
            if view.is_system {
                line.push_str("  (system)");
            }
            out.push(line);
        }
        out.push(format!("{} views", self.views.len()));
        out.join("\n")
    }
}

pub fn view_list(data_dir: &Path) -> Result<ViewListResult> {
    let prefs = Prefs::load(data_dir);
    Ok(ViewListResult {
        views: prefs.views.all(),
    })
}

/// Save a filter query string under a name. Capped at ten user views.
pub fn view_save(data_dir: &Path, name: &str, query: &str) -> Result<ViewResult> {
    let filters = TaskFilters::from_query_string(query);
    let mut prefs = Prefs::load(data_dir);
    let view = prefs.views.add(name, filters)?;
    prefs.save(data_dir)?;
    Ok(ViewResult { view })
}

pub fn view_rm(data_dir: &Path, id: &str) -> Result<DeleteResult> {
    let mut prefs = Prefs::load(data_dir);
    if let Some(view) = prefs.views.get(id) {
        if view.is_system {
            return Err(Error::InvalidInput(format!(
                "System views cannot be removed: {}",
                id
            )));
        }
    }
    if !prefs.views.remove(id) {
        return Err(Error::NotFound(format!("View not found: {}", id)));
    }
    prefs.save(data_dir)?;
    Ok(DeleteResult {
        ok: true,
        id: id.to_string(),
    })
}

fn find_view(prefs: &Prefs, wanted: &str) -> Option<SavedView> {
    prefs.views.get(wanted).or_else(|| {
        prefs
            .views
            .all()
            .into_iter()
            .find(|v| v.name.eq_ignore_ascii_case(wanted))
    })
}

// ---------------------------------------------------------------------------
// Outcomes

#[derive(Debug, Serialize)]
pub struct OutcomeResult {
    pub outcome: Outcome,
}

impl Output for OutcomeResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let outcome = &self.outcome;
        let mut line = format!("{}  {} ({})", outcome.id, outcome.title, outcome.status);
        if let Some(target) = outcome.target_date {
            line.push_str(&format!(", target {}", target));
        }
        line
    }
}

#[derive(Debug, Serialize)]
pub struct OutcomeListResult {
    pub outcomes: Vec<Outcome>,
}

impl Output for OutcomeListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.outcomes.is_empty() {
            return "No outcomes.".to_string();
        }
        let mut out: Vec<String> = self
            .outcomes
            .iter()
            .map(|o| {
                let mut line = format!("  {}  {} ({})", o.id, o.title, o.status);
                if let Some(target) = o.target_date {
                    line.push_str(&format!(", target {}", target));
                }
                line
            })
            .collect();
        out.push(format!("{} outcomes", self.outcomes.len()));
        out.join("\n")
    }
}

/// One outcome with the active tasks and commitments attached to it.
#[derive(Debug, Serialize)]
pub struct OutcomeDetail {
    pub outcome: Outcome,
    pub tasks: Vec<Task>,
    pub commitments: Vec<Commitment>,
}

impl Output for OutcomeDetail {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let outcome = &self.outcome;
        let mut out = vec![format!("{}: {}", outcome.id, outcome.title)];
        out.push(format!("  status: {}", outcome.status));
        if let Some(description) = &outcome.description {
            out.push(format!("  {}", description));
        }
        if let Some(target) = outcome.target_date {
            out.push(format!("  target: {}", target));
        }
        out.push(format!("Active tasks ({})", self.tasks.len()));
        for task in &self.tasks {
            out.push(format_task_line(task));
        }
        out.push(format!("Commitments ({})", self.commitments.len()));
        for commitment in &self.commitments {
            let mut line = format!("  {}  {}", commitment.id, commitment.title);
            if let Some(cadence) = &commitment.cadence {
                line.push_str(&format!(" ({})", cadence));
            }
            out.push(line);
        }
        out.join("\n")
    }
}

pub fn outcome_add(data_dir: &Path, new: NewOutcome) -> Result<OutcomeResult> {
    if new.title.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Outcome title cannot be empty".to_string(),
        ));
    }
    let mut store = Store::open(data_dir)?;
    let id = store::generate_id(store::OUTCOME_PREFIX, &new.title);
    let outcome = new.into_outcome(id, Utc::now());
    store.create_outcome(&outcome)?;
    Ok(OutcomeResult { outcome })
}

pub fn outcome_list(data_dir: &Path) -> Result<OutcomeListResult> {
    let store = Store::open(data_dir)?;
    Ok(OutcomeListResult {
        outcomes: store.list_outcomes()?,
    })
}

pub fn outcome_show(data_dir: &Path, id: &str) -> Result<OutcomeDetail> {
    let store = Store::open(data_dir)?;
    let outcome = store.get_outcome(id)?;
    let tasks: Vec<Task> = store
        .list_tasks(Some(&TaskStatus::Active), None)?
        .into_iter()
        .filter(|t| t.outcome_id.as_deref() == Some(id))
        .collect();
    let commitments = store.list_commitments(Some(id))?;
    Ok(OutcomeDetail {
        outcome,
        tasks,
        commitments,
    })
}

pub fn outcome_update(data_dir: &Path, id: &str, patch: OutcomePatch) -> Result<OutcomeResult> {
    if patch.is_empty() {
        return Err(Error::InvalidInput("Nothing to update".to_string()));
    }
    let mut store = Store::open(data_dir)?;
    let outcome = store.update_outcome(id, &patch, Utc::now())?;
    Ok(OutcomeResult { outcome })
}

/// Delete an outcome. Fails with a conflict while active tasks or
/// commitments still reference it.
pub fn outcome_rm(data_dir: &Path, id: &str) -> Result<DeleteResult> {
    let mut store = Store::open(data_dir)?;
    store.delete_outcome(id)?;
    Ok(DeleteResult {
        ok: true,
        id: id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Commitments

#[derive(Debug, Serialize)]
pub struct CommitmentResult {
    pub commitment: Commitment,
}

impl Output for CommitmentResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let commitment = &self.commitment;
        let mut line = format!(
            "{}  {} (for {})",
            commitment.id, commitment.title, commitment.outcome_id
        );
        if let Some(cadence) = &commitment.cadence {
            line.push_str(&format!(", {}", cadence));
        }
        line
    }
}

#[derive(Debug, Serialize)]
pub struct CommitmentListResult {
    pub commitments: Vec<Commitment>,
}

impl Output for CommitmentListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.commitments.is_empty() {
            return "No commitments.".to_string();
        }
        let mut out: Vec<String> = self
            .commitments
            .iter()
            .map(|c| {
                let mut line = format!("  {}  {} (for {})", c.id, c.title, c.outcome_id);
                if let Some(cadence) = &c.cadence {
                    line.push_str(&format!(", {}", cadence));
                }
                line
            })
            .collect();
        out.push(format!("{} commitments", self.commitments.len()));
        out.join("\n")
    }
}

pub fn commitment_add(data_dir: &Path, new: NewCommitment) -> Result<CommitmentResult> {
    if new.title.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Commitment title cannot be empty".to_string(),
        ));
    }
    let mut store = Store::open(data_dir)?;
    let id = store::generate_id(store::COMMITMENT_PREFIX, &new.title);
    let commitment = new.into_commitment(id, Utc::now());
    store.create_commitment(&commitment)?;
    Ok(CommitmentResult { commitment })
}

pub fn commitment_list(data_dir: &Path, outcome: Option<&str>) -> Result<CommitmentListResult> {
    let store = Store::open(data_dir)?;
    Ok(CommitmentListResult {
        commitments: store.list_commitments(outcome)?,
    })
}

pub fn commitment_rm(data_dir: &Path, id: &str) -> Result<DeleteResult> {
    let mut store = Store::open(data_dir)?;
    store.delete_commitment(id)?;
    Ok(DeleteResult {
        ok: true,
        id: id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Renegotiation

/// A quick pick with its resolved date and time.
#[derive(Debug, Serialize)]
pub struct QuickPickOption {
    pub pick: QuickPick,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Everything the renegotiation flow offers for one task, without
/// changing anything.
#[derive(Debug, Serialize)]
pub struct RenegotiatePreview {
    pub task: Task,
    pub days_overdue: i64,
    pub needs_renegotiation: bool,
    pub actions: Vec<RenegotiationAction>,
    pub quick_picks: Vec<QuickPickOption>,
    pub split_suggestions: Vec<SubtaskSuggestion>,
}

impl Output for RenegotiatePreview {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = vec![format!("{}: {}", self.task.id, self.task.title)];
        if self.needs_renegotiation {
            out.push(format!(
                "  {} days overdue; renegotiation suggested",
                self.days_overdue
            ));
        } else if self.days_overdue > 0 {
            out.push(format!("  {} days overdue", self.days_overdue));
        } else {
            out.push("  not overdue".to_string());
        }
        let actions: Vec<String> = self.actions.iter().map(|a| a.to_string()).collect();
        out.push(format!("Actions: {}", actions.join(", ")));
        out.push("Quick picks:".to_string());
        for option in &self.quick_picks {
            out.push(format!(
                "  {:10} {} {}",
                option.pick.to_string(),
                option.date,
                option.time.format("%H:%M")
            ));
        }
        out.push("Split suggestions:".to_string());
        for (index, step) in self.split_suggestions.iter().enumerate() {
            out.push(format!(
                "  {}. {} ({} min, due {})",
                index + 1,
                step.title,
                step.estimated_minutes,
                step.due_date
            ));
        }
        out.join("\n")
    }
}

impl Output for RenegotiationOutcome {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let record = &self.record;
        let mut out = vec![format!(
            "Renegotiated {} ({}, reason {})",
            record.task_id, record.action, record.reason_code
        )];
        match record.action {
            RenegotiationAction::Reschedule => {
                if let Some(date) = record.new_due_date {
                    out.push(format!("  now due {}", date));
                }
            }
            RenegotiationAction::Split => {
                for task in &self.subtasks {
                    out.push(format!("  created {}: {}", task.id, task.title));
                }
            }
            RenegotiationAction::Park => out.push("  parked, no due date".to_string()),
            RenegotiationAction::Drop => out.push("  dropped".to_string()),
        }
        out.push(format!("  recorded as {}", record.id));
        out.join("\n")
    }
}

/// Inputs assembled from the renegotiate command line.
#[derive(Debug, Clone)]
pub struct RenegotiateArgs {
    pub task_id: String,
    pub action: RenegotiationAction,
    pub reason_code: ReasonCode,
    pub reason_text: Option<String>,
    pub pick: Option<QuickPick>,
    pub date: Option<NaiveDate>,
    pub steps: Vec<String>,
    pub estimate: Option<u32>,
}

/// Show what renegotiation would offer for a task: flagged or not,
/// available actions, resolved quick picks, and split suggestions.
pub fn renegotiate_preview(
    data_dir: &Path,
    task_id: &str,
    estimate: Option<u32>,
) -> Result<RenegotiatePreview> {
    store::validate_task_id(task_id)?;
    let store = Store::open(data_dir)?;
    let task = store.get_task(task_id)?;
    let today = dates::local_today();

    let days_overdue = task
        .due_date
        .map(|d| dates::days_overdue(d, today))
        .unwrap_or(0);
    let needs_renegotiation = renegotiate::needs_renegotiation(&task, today);
    let actions = renegotiate::available_actions(&task, today).to_vec();
    let quick_picks = [QuickPick::Tomorrow, QuickPick::NextWeek]
        .iter()
        .map(|pick| {
            let (date, time) = pick.resolve(today);
            QuickPickOption {
                pick: *pick,
                date,
                time,
            }
        })
        .collect();
    let split_suggestions = renegotiate::split_suggestions(&task.title, estimate, today);

    Ok(RenegotiatePreview {
        task,
        days_overdue,
        needs_renegotiation,
        actions,
        quick_picks,
        split_suggestions,
    })
}

/// Build and apply a renegotiation. Reschedule dates come from an
/// explicit date or a quick pick; split steps come from explicit titles
/// or the suggestion engine.
pub fn renegotiate_apply(data_dir: &Path, args: RenegotiateArgs) -> Result<RenegotiationOutcome> {
    let mut store = Store::open(data_dir)?;
    let task = store.get_task(&args.task_id)?;
    let today = dates::local_today();

    let new_due_date = match args.action {
        RenegotiationAction::Reschedule => Some(match (args.date, args.pick) {
            (Some(date), _) => date,
            (None, Some(pick)) => pick.resolve(today).0,
            (None, None) => {
                return Err(Error::InvalidInput(
                    "Reschedule needs --date or --pick".to_string(),
                ));
            }
        }),
        _ => None,
    };

    let subtasks = match args.action {
        RenegotiationAction::Split => Some(if args.steps.is_empty() {
            renegotiate::split_suggestions(&task.title, args.estimate, today)
        } else {
            renegotiate::steps_from_titles(&args.steps, args.estimate, today)
        }),
        _ => None,
    };

    let request = RenegotiationRequest {
        task_id: args.task_id,
        action: args.action,
        reason_code: args.reason_code,
        reason_text: args.reason_text,
        new_due_date,
        subtasks,
    };
    store.apply_renegotiation(&request, Utc::now())
}

// ---------------------------------------------------------------------------
// Config

/// One configuration key with its current value.
#[derive(Debug, Serialize)]
pub struct ConfigValue {
    pub key: String,
    pub value: Option<String>,
}

impl Output for ConfigValue {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match &self.value {
            Some(value) => format!("{} = {}", self.key, value),
            None => format!("{} (unset)", self.key),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigListResult {
    pub entries: Vec<ConfigValue>,
}

impl Output for ConfigListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("  {}", e.to_human()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn config_get(data_dir: &Path, key: &str) -> Result<ConfigValue> {
    let prefs = Prefs::load(data_dir);
    let value = prefs.get_value(key)?;
    Ok(ConfigValue {
        key: key.to_string(),
        value,
    })
}

pub fn config_set(data_dir: &Path, key: &str, value: &str) -> Result<ConfigValue> {
    let mut prefs = Prefs::load(data_dir);
    prefs.set_value(key, value)?;
    prefs.save(data_dir)?;
    Ok(ConfigValue {
        key: key.to_string(),
        value: prefs.get_value(key)?,
    })
}

pub fn config_list(data_dir: &Path) -> Result<ConfigListResult> {
    let prefs = Prefs::load(data_dir);
    let entries = prefs
        .entries()
        .into_iter()
        .map(|(key, value)| ConfigValue {
            key: key.to_string(),
            value,
        })
        .collect();
    Ok(ConfigListResult { entries })
}

// ---------------------------------------------------------------------------
// Formatting helpers

fn due_line(task: &Task) -> Option<String> {
    let date = task.due_date?;
    Some(match task.due_time {
        Some(time) => format!("{} {}", date, time.format("%H:%M")),
        None => date.to_string(),
    })
}

fn format_task_line(task: &Task) -> String {
    let mut line = format!("  {}  {}", task.id, task.title);
    let mut notes: Vec<String> = Vec::new();
    if let Some(priority) = &task.priority {
        notes.push(priority.to_string());
    }
    if let Some(due) = due_line(task) {
        notes.push(format!("due {}", due));
    }
    if let Some(rule) = &task.recurrence_rule {
        notes.push(format!("repeats {}", rule.frequency));
    }
    if !notes.is_empty() {
        line.push_str(&format!(" ({})", notes.join(", ")));
    }
    line
}
