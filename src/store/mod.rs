//! Persistent store for Cairn data.
//!
//! One SQLite database (`cairn.db`) in the per-user data directory holds
//! every entity. All reads and writes are scoped by an owning `user_id`
//! key; rows belonging to another user are invisible through this API.
//! Tasks are soft-deleted through status transitions only. Categories,
//! outcomes, and commitments expose hard deletes, and a delete that
//! would orphan active dependents is rejected with a structured conflict
//! listing their ids instead of cascading.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{Connection, Row, params};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{
    Category, Commitment, Outcome, OutcomePatch, PatchResponse, PositionUpdate,
    RenegotiationAction, RenegotiationRecord, Task, TaskPatch, TaskStatus,
};
use crate::recurrence;
use crate::renegotiate::{self, RenegotiationRequest};
use crate::{Error, Result};

/// ID prefix for tasks (`cn-xxxx`).
pub const TASK_PREFIX: &str = "cn";
/// ID prefix for categories (`cnc-xxxx`).
pub const CATEGORY_PREFIX: &str = "cnc";
/// ID prefix for outcomes (`cno-xxxx`).
pub const OUTCOME_PREFIX: &str = "cno";
/// ID prefix for commitments (`cnm-xxxx`).
pub const COMMITMENT_PREFIX: &str = "cnm";
/// ID prefix for renegotiation records (`cnr-xxxx`).
pub const RENEGOTIATION_PREFIX: &str = "cnr";

/// User key rows are scoped to when no identity is supplied.
pub const DEFAULT_USER: &str = "local";

/// Gap between consecutive manual-sort positions, leaving room to move a
/// task between neighbors without renumbering everything.
const POSITION_STEP: i64 = 1000;

const TASK_COLUMNS: &str = "id, title, status, due_date, due_time, priority, category_id, \
     outcome_id, position, is_recurring, recurrence_rule, recurring_streak, \
     category_confidence, completed_at, created_at, updated_at";

/// Store manager for a single user's data.
pub struct Store {
    /// Directory holding the database
    pub root: PathBuf,
    /// Owning user key; every query filters by it
    user_id: String,
    conn: Connection,
}

impl Store {
    /// Open existing storage in the given data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        Self::open_for_user(data_dir, DEFAULT_USER)
    }

    /// Open existing storage scoped to a specific user.
    pub fn open_for_user(data_dir: &Path, user_id: &str) -> Result<Self> {
        let db_path = data_dir.join("cairn.db");
        if !db_path.exists() {
            return Err(Error::NotInitialized);
        }

        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            root: data_dir.to_path_buf(),
            user_id: user_id.to_string(),
            conn,
        })
    }

    /// Initialize storage in the given data directory.
    pub fn init(data_dir: &Path) -> Result<Self> {
        Self::init_for_user(data_dir, DEFAULT_USER)
    }

    /// Initialize storage scoped to a specific user.
    pub fn init_for_user(data_dir: &Path, user_id: &str) -> Result<Self> {
        fs::create_dir_all(data_dir)?;

        let conn = Connection::open(data_dir.join("cairn.db"))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            root: data_dir.to_path_buf(),
            user_id: user_id.to_string(),
            conn,
        })
    }

    /// Check if storage exists in the given data directory.
    pub fn exists(data_dir: &Path) -> bool {
        data_dir.join("cairn.db").exists()
    }

    /// The user key this store is scoped to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                due_date TEXT,
                due_time TEXT,
                priority TEXT,
                category_id TEXT,
                outcome_id TEXT,
                position INTEGER NOT NULL DEFAULT 0,
                is_recurring INTEGER NOT NULL DEFAULT 0,
                recurrence_rule TEXT,
                recurring_streak INTEGER NOT NULL DEFAULT 0,
                category_confidence REAL,
                completed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                color TEXT,
                icon TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS outcomes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                target_date TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS commitments (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                outcome_id TEXT NOT NULL,
                title TEXT NOT NULL,
                cadence TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS renegotiations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                task_id TEXT NOT NULL,
                action TEXT NOT NULL,
                reason_code TEXT NOT NULL,
                reason_text TEXT,
                new_due_date TEXT,
                subtask_ids TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(due_date);
            CREATE INDEX IF NOT EXISTS idx_tasks_category ON tasks(category_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_outcome ON tasks(outcome_id);
            CREATE INDEX IF NOT EXISTS idx_commitments_outcome ON commitments(outcome_id);
            CREATE INDEX IF NOT EXISTS idx_renegotiations_task ON renegotiations(task_id);
            "#,
        )?;

        // Run migrations for schema changes
        Self::run_migrations(conn)?;

        Ok(())
    }

    /// Run database migrations for schema changes.
    /// This handles adding new columns to existing databases.
    fn run_migrations(conn: &Connection) -> Result<()> {
        // Migration: category_confidence arrived with dump-parsing support.
        // SQLite doesn't support IF NOT EXISTS for ALTER TABLE, so we check the schema first
        let has_confidence: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM pragma_table_info('tasks') WHERE name = 'category_confidence'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !has_confidence {
            conn.execute("ALTER TABLE tasks ADD COLUMN category_confidence REAL", [])?;
        }

        Ok(())
    }

    // === Task Operations ===

    /// Create a new task.
    pub fn create_task(&mut self, task: &Task) -> Result<()> {
        self.write_task(task)
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: &str) -> Result<Task> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE user_id = ?1 AND id = ?2",
            TASK_COLUMNS
        );
        match self
            .conn
            .query_row(&sql, params![self.user_id, id], task_from_row)
        {
            Ok(task) => Ok(task),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(Error::NotFound(format!("Task not found: {}", id)))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// List tasks in manual order, optionally narrowed by status or
    /// category. Richer filtering happens in memory via `TaskFilters`.
    pub fn list_tasks(
        &self,
        status: Option<&TaskStatus>,
        category: Option<&str>,
    ) -> Result<Vec<Task>> {
        let mut sql = format!("SELECT {} FROM tasks WHERE user_id = ?", TASK_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(self.user_id.clone())];

        if let Some(s) = status {
            sql.push_str(" AND status = ?");
            params_vec.push(Box::new(s.to_string()));
        }
        if let Some(c) = category {
            sql.push_str(" AND category_id = ?");
            params_vec.push(Box::new(c.to_string()));
        }

        sql.push_str(" ORDER BY position ASC, created_at ASC");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let tasks: Vec<Task> = stmt
            .query_map(params_refs.as_slice(), task_from_row)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(tasks)
    }

    /// Apply a partial patch to a task and return the stored result.
    ///
    /// Completing or skipping a recurring task also creates its next
    /// occurrence; the new task is stored and returned alongside the
    /// patched one so clients can append it without refetching.
    pub fn update_task(
        &mut self,
        id: &str,
        patch: &TaskPatch,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<PatchResponse> {
        let mut task = self.get_task(id)?;
        let previous_status = task.status.clone();
        patch.apply_to(&mut task, now);
        self.write_task(&task)?;

        let finished = task.status != previous_status
            && matches!(task.status, TaskStatus::Done | TaskStatus::Skipped);
        let next_occurrence = if finished {
            recurrence::spawn_next_occurrence(
                &task,
                generate_id(TASK_PREFIX, &task.title),
                today,
                now,
            )
        } else {
            None
        };
        if let Some(next) = &next_occurrence {
            tracing::debug!(task = %task.id, next = %next.id, "spawned next occurrence");
            self.write_task(next)?;
        }

        Ok(PatchResponse {
            task,
            next_occurrence,
        })
    }

    /// Apply a bulk position update. Every ID must belong to this user;
    /// an unknown ID fails the whole batch before any write.
    pub fn reorder_tasks(&mut self, updates: &[PositionUpdate], now: DateTime<Utc>) -> Result<()> {
        for update in updates {
            self.get_task(&update.id)?;
        }
        for update in updates {
            self.conn.execute(
                "UPDATE tasks SET position = ?1, updated_at = ?2 WHERE user_id = ?3 AND id = ?4",
                params![
                    update.position,
                    now.to_rfc3339(),
                    self.user_id,
                    update.id
                ],
            )?;
        }
        Ok(())
    }

    /// Position for a task appended at the end of the manual order.
    pub fn next_position(&self) -> Result<i64> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(position) FROM tasks WHERE user_id = ?1",
            [&self.user_id],
            |row| row.get(0),
        )?;
        Ok(max.map_or(0, |p| p + POSITION_STEP))
    }

    /// Insert or replace a task row.
    fn write_task(&self, task: &Task) -> Result<()> {
        let rule_json = task
            .recurrence_rule
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO tasks
            (id, user_id, title, status, due_date, due_time, priority, category_id,
             outcome_id, position, is_recurring, recurrence_rule, recurring_streak,
             category_confidence, completed_at, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                task.id,
                self.user_id,
                task.title,
                task.status.to_string(),
                task.due_date.map(|d| d.to_string()),
                task.due_time.map(|t| t.format("%H:%M:%S").to_string()),
                task.priority.as_ref().map(|p| p.to_string()),
                task.category_id,
                task.outcome_id,
                task.position,
                task.is_recurring,
                rule_json,
                task.recurring_streak,
                task.category_confidence.map(f64::from),
                task.completed_at.map(|t| t.to_rfc3339()),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// IDs of active tasks whose `column` references `id`.
    fn active_task_ids_where(&self, column: &str, id: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT id FROM tasks WHERE user_id = ?1 AND {} = ?2 AND status = 'active' ORDER BY id",
            column
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let ids: Vec<String> = stmt
            .query_map(params![self.user_id, id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }

    // === Category Operations ===

    /// Create a new category.
    pub fn create_category(&mut self, category: &Category) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO categories (id, user_id, name, color, icon, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                category.id,
                self.user_id,
                category.name,
                category.color,
                category.icon,
                category.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a category by ID.
    pub fn get_category(&self, id: &str) -> Result<Category> {
        match self.conn.query_row(
            "SELECT id, name, color, icon, created_at FROM categories WHERE user_id = ?1 AND id = ?2",
            params![self.user_id, id],
            category_from_row,
        ) {
            Ok(category) => Ok(category),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(Error::NotFound(format!("Category not found: {}", id)))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// List all categories, sorted by name.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, color, icon, created_at FROM categories WHERE user_id = ?1 ORDER BY name ASC",
        )?;
        let categories: Vec<Category> = stmt
            .query_map([&self.user_id], category_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(categories)
    }

    /// Delete a category.
    ///
    /// Rejected with a conflict listing the dependent task IDs while any
    /// active task still references it. References from settled tasks are
    /// detached rather than left dangling.
    pub fn delete_category(&mut self, id: &str) -> Result<()> {
        self.get_category(id)?;

        let dependents = self.active_task_ids_where("category_id", id)?;
        if !dependents.is_empty() {
            tracing::warn!(category = %id, count = dependents.len(), "category delete blocked");
            return Err(Error::Conflict {
                message: format!("Category {} is still used by active tasks", id),
                dependents,
            });
        }

        self.conn.execute(
            "UPDATE tasks SET category_id = NULL WHERE user_id = ?1 AND category_id = ?2",
            params![self.user_id, id],
        )?;
        self.conn.execute(
            "DELETE FROM categories WHERE user_id = ?1 AND id = ?2",
            params![self.user_id, id],
        )?;
        Ok(())
    }

    // === Outcome Operations ===

    /// Create a new outcome.
    pub fn create_outcome(&mut self, outcome: &Outcome) -> Result<()> {
        self.write_outcome(outcome)
    }

    /// Get an outcome by ID.
    pub fn get_outcome(&self, id: &str) -> Result<Outcome> {
        match self.conn.query_row(
            "SELECT id, title, description, target_date, status, created_at, updated_at \
             FROM outcomes WHERE user_id = ?1 AND id = ?2",
            params![self.user_id, id],
            outcome_from_row,
        ) {
            Ok(outcome) => Ok(outcome),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(Error::NotFound(format!("Outcome not found: {}", id)))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// List all outcomes in creation order.
    pub fn list_outcomes(&self) -> Result<Vec<Outcome>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, target_date, status, created_at, updated_at \
             FROM outcomes WHERE user_id = ?1 ORDER BY created_at ASC",
        )?;
        let outcomes: Vec<Outcome> = stmt
            .query_map([&self.user_id], outcome_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(outcomes)
    }

    /// Apply a partial patch to an outcome and return the stored result.
    pub fn update_outcome(
        &mut self,
        id: &str,
        patch: &OutcomePatch,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let mut outcome = self.get_outcome(id)?;
        patch.apply_to(&mut outcome, now);
        self.write_outcome(&outcome)?;
        Ok(outcome)
    }

    /// Delete an outcome.
    ///
    /// Rejected with a conflict while any active task or active
    /// commitment still depends on it. Otherwise settled tasks are
    /// detached and the outcome's settled commitments go with it.
    pub fn delete_outcome(&mut self, id: &str) -> Result<()> {
        self.get_outcome(id)?;

        let mut dependents = self.active_task_ids_where("outcome_id", id)?;
        dependents.extend(self.active_commitment_ids(id)?);
        if !dependents.is_empty() {
            tracing::warn!(outcome = %id, count = dependents.len(), "outcome delete blocked");
            return Err(Error::Conflict {
                message: format!("Outcome {} still has active tasks or commitments", id),
                dependents,
            });
        }

        self.conn.execute(
            "UPDATE tasks SET outcome_id = NULL WHERE user_id = ?1 AND outcome_id = ?2",
            params![self.user_id, id],
        )?;
        self.conn.execute(
            "DELETE FROM commitments WHERE user_id = ?1 AND outcome_id = ?2",
            params![self.user_id, id],
        )?;
        self.conn.execute(
            "DELETE FROM outcomes WHERE user_id = ?1 AND id = ?2",
            params![self.user_id, id],
        )?;
        Ok(())
    }

    fn write_outcome(&self, outcome: &Outcome) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO outcomes
            (id, user_id, title, description, target_date, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                outcome.id,
                self.user_id,
                outcome.title,
                outcome.description,
                outcome.target_date.map(|d| d.to_string()),
                outcome.status.to_string(),
                outcome.created_at.to_rfc3339(),
                outcome.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// IDs of active commitments attached to an outcome.
    fn active_commitment_ids(&self, outcome_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM commitments WHERE user_id = ?1 AND outcome_id = ?2 AND status = 'active' ORDER BY id",
        )?;
        let ids: Vec<String> = stmt
            .query_map(params![self.user_id, outcome_id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }

    // === Commitment Operations ===

    /// Create a new commitment. The outcome it points at must exist.
    pub fn create_commitment(&mut self, commitment: &Commitment) -> Result<()> {
        self.get_outcome(&commitment.outcome_id)?;
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO commitments
            (id, user_id, outcome_id, title, cadence, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                commitment.id,
                self.user_id,
                commitment.outcome_id,
                commitment.title,
                commitment.cadence,
                commitment.status.to_string(),
                commitment.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a commitment by ID.
    pub fn get_commitment(&self, id: &str) -> Result<Commitment> {
        match self.conn.query_row(
            "SELECT id, outcome_id, title, cadence, status, created_at \
             FROM commitments WHERE user_id = ?1 AND id = ?2",
            params![self.user_id, id],
            commitment_from_row,
        ) {
            Ok(commitment) => Ok(commitment),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(Error::NotFound(format!("Commitment not found: {}", id)))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// List commitments, optionally narrowed to one outcome.
    pub fn list_commitments(&self, outcome: Option<&str>) -> Result<Vec<Commitment>> {
        let mut sql = String::from(
            "SELECT id, outcome_id, title, cadence, status, created_at \
             FROM commitments WHERE user_id = ?",
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(self.user_id.clone())];

        if let Some(o) = outcome {
            sql.push_str(" AND outcome_id = ?");
            params_vec.push(Box::new(o.to_string()));
        }

        sql.push_str(" ORDER BY created_at ASC");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let commitments: Vec<Commitment> = stmt
            .query_map(params_refs.as_slice(), commitment_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(commitments)
    }

    /// Delete a commitment.
    pub fn delete_commitment(&mut self, id: &str) -> Result<()> {
        self.get_commitment(id)?;
        self.conn.execute(
            "DELETE FROM commitments WHERE user_id = ?1 AND id = ?2",
            params![self.user_id, id],
        )?;
        Ok(())
    }

    // === Renegotiation Operations ===

    /// Validate and apply a renegotiation, recording the action taken.
    ///
    /// Reschedule moves the due date to the requested day at 09:00. Split
    /// creates the sub-step tasks and drops the original as superseded.
    /// Park clears the date entirely. Drop lets the task go. A validation
    /// failure leaves every row untouched.
    pub fn apply_renegotiation(
        &mut self,
        request: &RenegotiationRequest,
        now: DateTime<Utc>,
    ) -> Result<RenegotiationOutcome> {
        renegotiate::validate(request)?;
        let mut task = self.get_task(&request.task_id)?;

        let mut subtask_ids = Vec::new();
        let mut subtasks = Vec::new();
        match request.action {
            RenegotiationAction::Reschedule => {
                task.due_date = request.new_due_date;
                task.due_time = Some(renegotiate::reschedule_time());
                task.updated_at = now;
            }
            RenegotiationAction::Split => {
                let steps = request.subtasks.as_deref().unwrap_or_default();
                let mut position = self.next_position()?;
                for step in steps.iter().take(renegotiate::MAX_SPLIT_STEPS) {
                    let mut subtask =
                        Task::new(generate_id(TASK_PREFIX, &step.title), step.title.clone());
                    subtask.due_date = Some(step.due_date);
                    subtask.priority = task.priority.clone();
                    subtask.category_id = task.category_id.clone();
                    subtask.outcome_id = task.outcome_id.clone();
                    subtask.position = position;
                    subtask.created_at = now;
                    subtask.updated_at = now;
                    position += POSITION_STEP;

                    self.write_task(&subtask)?;
                    subtask_ids.push(subtask.id.clone());
                    subtasks.push(subtask);
                }
                // The original is superseded by its sub-steps.
                task.transition_status(TaskStatus::Dropped, now);
            }
            RenegotiationAction::Park => {
                task.due_date = None;
                task.due_time = None;
                task.updated_at = now;
            }
            RenegotiationAction::Drop => {
                task.transition_status(TaskStatus::Dropped, now);
            }
        }
        self.write_task(&task)?;

        let record = RenegotiationRecord {
            id: generate_id(RENEGOTIATION_PREFIX, &request.task_id),
            task_id: request.task_id.clone(),
            action: request.action,
            reason_code: request.reason_code,
            reason_text: request.reason_text.clone(),
            new_due_date: request.new_due_date,
            subtask_ids,
            created_at: now,
        };
        self.write_renegotiation(&record)?;

        Ok(RenegotiationOutcome {
            record,
            task,
            subtasks,
        })
    }

    /// List renegotiation records, optionally narrowed to one task.
    pub fn list_renegotiations(&self, task: Option<&str>) -> Result<Vec<RenegotiationRecord>> {
        let mut sql = String::from(
            "SELECT id, task_id, action, reason_code, reason_text, new_due_date, \
             subtask_ids, created_at FROM renegotiations WHERE user_id = ?",
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(self.user_id.clone())];

        if let Some(t) = task {
            sql.push_str(" AND task_id = ?");
            params_vec.push(Box::new(t.to_string()));
        }

        sql.push_str(" ORDER BY created_at ASC");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let records: Vec<RenegotiationRecord> = stmt
            .query_map(params_refs.as_slice(), renegotiation_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(records)
    }

    fn write_renegotiation(&self, record: &RenegotiationRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO renegotiations
            (id, user_id, task_id, action, reason_code, reason_text, new_due_date,
             subtask_ids, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.id,
                self.user_id,
                record.task_id,
                record.action.to_string(),
                record.reason_code.to_string(),
                record.reason_text,
                record.new_due_date.map(|d| d.to_string()),
                serde_json::to_string(&record.subtask_ids)?,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

/// Everything a renegotiation changed: the audit record, the task as it
/// now stands, and any sub-step tasks a split created.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RenegotiationOutcome {
    pub record: RenegotiationRecord,
    pub task: Task,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Task>,
}

// Row mappers read lenient: a malformed optional field becomes empty
// rather than poisoning the whole row.

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    let status: String = row.get(2)?;
    let due_date: Option<String> = row.get(3)?;
    let due_time: Option<String> = row.get(4)?;
    let priority: Option<String> = row.get(5)?;
    let rule_json: Option<String> = row.get(10)?;
    let completed_at: Option<String> = row.get(13)?;
    let created_at: String = row.get(14)?;
    let updated_at: String = row.get(15)?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        status: status.parse().unwrap_or_default(),
        due_date: due_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        due_time: due_time.and_then(|s| NaiveTime::parse_from_str(&s, "%H:%M:%S").ok()),
        priority: priority.and_then(|s| s.parse().ok()),
        category_id: row.get(6)?,
        outcome_id: row.get(7)?,
        position: row.get(8)?,
        is_recurring: row.get(9)?,
        recurrence_rule: rule_json.and_then(|s| serde_json::from_str(&s).ok()),
        recurring_streak: row.get(11)?,
        category_confidence: row.get::<_, Option<f64>>(12)?.map(|v| v as f32),
        completed_at: completed_at.as_deref().and_then(parse_timestamp),
        created_at: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
        updated_at: parse_timestamp(&updated_at).unwrap_or_else(Utc::now),
    })
}

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    let created_at: String = row.get(4)?;
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        icon: row.get(3)?,
        created_at: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
    })
}

fn outcome_from_row(row: &Row) -> rusqlite::Result<Outcome> {
    let target_date: Option<String> = row.get(3)?;
    let status: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(Outcome {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        target_date: target_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        status: status.parse().unwrap_or_default(),
        created_at: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
        updated_at: parse_timestamp(&updated_at).unwrap_or_else(Utc::now),
    })
}

fn commitment_from_row(row: &Row) -> rusqlite::Result<Commitment> {
    let status: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(Commitment {
        id: row.get(0)?,
        outcome_id: row.get(1)?,
        title: row.get(2)?,
        cadence: row.get(3)?,
        status: status.parse().unwrap_or_default(),
        created_at: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
    })
}

fn renegotiation_from_row(row: &Row) -> rusqlite::Result<RenegotiationRecord> {
    let action: String = row.get(2)?;
    let reason_code: String = row.get(3)?;
    let new_due_date: Option<String> = row.get(5)?;
    let subtask_ids: String = row.get(6)?;
    let created_at: String = row.get(7)?;

    // Audit rows with an unparseable action or reason are skipped by the
    // list query's filter rather than misreported.
    let action = action
        .parse()
        .map_err(|_| invalid_column(2, "action"))?;
    let reason_code = reason_code
        .parse()
        .map_err(|_| invalid_column(3, "reason_code"))?;

    Ok(RenegotiationRecord {
        id: row.get(0)?,
        task_id: row.get(1)?,
        action,
        reason_code,
        reason_text: row.get(4)?,
        new_due_date: new_due_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        subtask_ids: serde_json::from_str(&subtask_ids).unwrap_or_default(),
        created_at: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
    })
}

fn invalid_column(index: usize, name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(index, name.to_string(), rusqlite::types::Type::Text)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Resolve the data directory: an explicit override wins, then the
/// `CAIRN_DATA_DIR` environment variable, then the platform data dir.
pub fn resolve_data_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var("CAIRN_DATA_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("cairn"))
}

/// Generate a unique short ID.
///
/// Format: `<prefix>-<4 hex chars>`, e.g. `cn-a1b2` for a task.
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..4])
}

/// Validate that an ID matches the expected format.
pub fn validate_id(id: &str, prefix: &str) -> Result<()> {
    if !id.starts_with(&format!("{}-", prefix)) {
        return Err(Error::InvalidId(format!(
            "ID must start with '{}-', got: {}",
            prefix, id
        )));
    }

    let suffix = &id[prefix.len() + 1..];
    if suffix.len() != 4 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidId(format!(
            "ID suffix must be 4 hex characters, got: {}",
            suffix
        )));
    }

    Ok(())
}

/// Validate a task ID (cn-xxxx format).
pub fn validate_task_id(id: &str) -> Result<()> {
    validate_id(id, TASK_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommitmentStatus, Frequency, Priority, RecurrenceRule};
    use crate::renegotiate::SubtaskSuggestion;
    use crate::models::ReasonCode;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::init(dir.path()).unwrap();
        (dir, store)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn task(id: &str, title: &str) -> Task {
        Task::new(id.to_string(), title.to_string())
    }

    #[test]
    fn test_open_uninitialized_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Store::open(dir.path()),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn test_init_then_open() {
        let dir = TempDir::new().unwrap();
        assert!(!Store::exists(dir.path()));
        Store::init(dir.path()).unwrap();
        assert!(Store::exists(dir.path()));
        Store::open(dir.path()).unwrap();
    }

    #[test]
    fn test_task_roundtrip_preserves_all_fields() {
        let (_dir, mut store) = open_store();

        let mut original = task("cn-a1b2", "Water the plants");
        original.due_date = Some(d(2026, 1, 20));
        original.due_time = NaiveTime::from_hms_opt(9, 30, 0);
        original.priority = Some(Priority::High);
        original.category_id = Some("cnc-0001".to_string());
        original.outcome_id = Some("cno-0001".to_string());
        original.position = 3000;
        original.set_recurrence(Some(RecurrenceRule {
            frequency: Frequency::Weekly,
            end_date: Some(d(2026, 6, 1)),
        }));
        original.recurring_streak = 4;
        original.category_confidence = Some(0.75);
        store.create_task(&original).unwrap();

        let loaded = store.get_task("cn-a1b2").unwrap();
        assert_eq!(loaded.title, original.title);
        assert_eq!(loaded.due_date, original.due_date);
        assert_eq!(loaded.due_time, original.due_time);
        assert_eq!(loaded.priority, original.priority);
        assert_eq!(loaded.category_id, original.category_id);
        assert_eq!(loaded.outcome_id, original.outcome_id);
        assert_eq!(loaded.position, 3000);
        assert!(loaded.is_recurring);
        assert_eq!(loaded.recurrence_rule, original.recurrence_rule);
        assert_eq!(loaded.recurring_streak, 4);
        assert_eq!(loaded.category_confidence, Some(0.75));
    }

    #[test]
    fn test_rows_are_scoped_to_user() {
        let dir = TempDir::new().unwrap();
        let mut store = Store::init_for_user(dir.path(), "alice").unwrap();
        store.create_task(&task("cn-a1b2", "Alice's errand")).unwrap();

        let other = Store::open_for_user(dir.path(), "bob").unwrap();
        assert!(matches!(
            other.get_task("cn-a1b2"),
            Err(Error::NotFound(_))
        ));
        assert!(other.list_tasks(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_list_tasks_filters_by_status() {
        let (_dir, mut store) = open_store();
        store.create_task(&task("cn-0001", "Open")).unwrap();
        let mut done = task("cn-0002", "Closed");
        done.transition_status(TaskStatus::Done, Utc::now());
        store.create_task(&done).unwrap();

        let active = store.list_tasks(Some(&TaskStatus::Active), None).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "cn-0001");

        let all = store.list_tasks(None, None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_list_tasks_manual_order() {
        let (_dir, mut store) = open_store();
        let mut late = task("cn-0001", "Second");
        late.position = 2000;
        let mut early = task("cn-0002", "First");
        early.position = 1000;
        store.create_task(&late).unwrap();
        store.create_task(&early).unwrap();

        let tasks = store.list_tasks(None, None).unwrap();
        assert_eq!(tasks[0].id, "cn-0002");
        assert_eq!(tasks[1].id, "cn-0001");
    }

    #[test]
    fn test_update_task_applies_patch() {
        let (_dir, mut store) = open_store();
        store.create_task(&task("cn-0001", "Call dentist")).unwrap();

        let patch: TaskPatch =
            serde_json::from_str(r#"{"title":"Call the dentist","due_date":"2026-02-01"}"#)
                .unwrap();
        let response = store
            .update_task("cn-0001", &patch, d(2026, 1, 14), Utc::now())
            .unwrap();
        assert_eq!(response.task.title, "Call the dentist");
        assert_eq!(response.task.due_date, Some(d(2026, 2, 1)));
        assert!(response.next_occurrence.is_none());

        let stored = store.get_task("cn-0001").unwrap();
        assert_eq!(stored.title, "Call the dentist");
    }

    #[test]
    fn test_update_unknown_task_is_not_found() {
        let (_dir, mut store) = open_store();
        let patch = TaskPatch::status(TaskStatus::Done);
        assert!(matches!(
            store.update_task("cn-ghost", &patch, d(2026, 1, 14), Utc::now()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_completing_recurring_task_spawns_next_occurrence() {
        let (_dir, mut store) = open_store();
        let mut weekly = task("cn-0001", "Weekly review");
        weekly.due_date = Some(d(2026, 1, 14));
        weekly.set_recurrence(Some(RecurrenceRule::new(Frequency::Weekly)));
        weekly.recurring_streak = 2;
        store.create_task(&weekly).unwrap();

        let response = store
            .update_task(
                "cn-0001",
                &TaskPatch::status(TaskStatus::Done),
                d(2026, 1, 14),
                Utc::now(),
            )
            .unwrap();

        let next = response.next_occurrence.expect("next occurrence");
        assert_eq!(next.due_date, Some(d(2026, 1, 21)));
        assert_eq!(next.recurring_streak, 3);
        assert_eq!(next.status, TaskStatus::Active);
        // The occurrence is persisted, not just returned
        let stored = store.get_task(&next.id).unwrap();
        assert_eq!(stored.due_date, Some(d(2026, 1, 21)));
    }

    #[test]
    fn test_skipping_recurring_task_resets_streak() {
        let (_dir, mut store) = open_store();
        let mut daily = task("cn-0001", "Morning stretch");
        daily.due_date = Some(d(2026, 1, 14));
        daily.set_recurrence(Some(RecurrenceRule::new(Frequency::Daily)));
        daily.recurring_streak = 9;
        store.create_task(&daily).unwrap();

        let response = store
            .update_task(
                "cn-0001",
                &TaskPatch::status(TaskStatus::Skipped),
                d(2026, 1, 14),
                Utc::now(),
            )
            .unwrap();

        let next = response.next_occurrence.expect("next occurrence");
        assert_eq!(next.due_date, Some(d(2026, 1, 15)));
        assert_eq!(next.recurring_streak, 0);
    }

    #[test]
    fn test_completing_non_recurring_task_spawns_nothing() {
        let (_dir, mut store) = open_store();
        store.create_task(&task("cn-0001", "One-off errand")).unwrap();

        let response = store
            .update_task(
                "cn-0001",
                &TaskPatch::status(TaskStatus::Done),
                d(2026, 1, 14),
                Utc::now(),
            )
            .unwrap();
        assert!(response.next_occurrence.is_none());
        assert_eq!(store.list_tasks(None, None).unwrap().len(), 1);
    }

    #[test]
    fn test_editing_done_recurring_task_spawns_nothing() {
        let (_dir, mut store) = open_store();
        let mut weekly = task("cn-0001", "Weekly review");
        weekly.due_date = Some(d(2026, 1, 14));
        weekly.set_recurrence(Some(RecurrenceRule::new(Frequency::Weekly)));
        weekly.transition_status(TaskStatus::Done, Utc::now());
        store.create_task(&weekly).unwrap();

        // Status does not change, so no new occurrence
        let patch: TaskPatch = serde_json::from_str(r#"{"title":"Weekly review notes"}"#).unwrap();
        let response = store
            .update_task("cn-0001", &patch, d(2026, 1, 14), Utc::now())
            .unwrap();
        assert!(response.next_occurrence.is_none());
    }

    #[test]
    fn test_recurrence_stops_at_end_date() {
        let (_dir, mut store) = open_store();
        let mut ending = task("cn-0001", "Daily standup");
        ending.due_date = Some(d(2026, 1, 14));
        ending.set_recurrence(Some(RecurrenceRule {
            frequency: Frequency::Daily,
            end_date: Some(d(2026, 1, 14)),
        }));
        store.create_task(&ending).unwrap();

        let response = store
            .update_task(
                "cn-0001",
                &TaskPatch::status(TaskStatus::Done),
                d(2026, 1, 14),
                Utc::now(),
            )
            .unwrap();
        assert!(response.next_occurrence.is_none());
    }

    #[test]
    fn test_reorder_applies_positions() {
        let (_dir, mut store) = open_store();
        store.create_task(&task("cn-000a", "A")).unwrap();
        store.create_task(&task("cn-000b", "B")).unwrap();

        let updates = vec![
            PositionUpdate {
                id: "cn-000b".to_string(),
                position: 0,
            },
            PositionUpdate {
                id: "cn-000a".to_string(),
                position: 1000,
            },
        ];
        store.reorder_tasks(&updates, Utc::now()).unwrap();

        assert_eq!(store.get_task("cn-000b").unwrap().position, 0);
        assert_eq!(store.get_task("cn-000a").unwrap().position, 1000);
    }

    #[test]
    fn test_reorder_unknown_id_fails_whole_batch() {
        let (_dir, mut store) = open_store();
        store.create_task(&task("cn-000a", "A")).unwrap();

        let updates = vec![
            PositionUpdate {
                id: "cn-000a".to_string(),
                position: 5000,
            },
            PositionUpdate {
                id: "cn-ghost".to_string(),
                position: 6000,
            },
        ];
        assert!(store.reorder_tasks(&updates, Utc::now()).is_err());
        // Nothing was written
        assert_eq!(store.get_task("cn-000a").unwrap().position, 0);
    }

    #[test]
    fn test_next_position_steps_past_the_end() {
        let (_dir, mut store) = open_store();
        assert_eq!(store.next_position().unwrap(), 0);

        let mut existing = task("cn-0001", "A");
        existing.position = 4000;
        store.create_task(&existing).unwrap();
        assert_eq!(store.next_position().unwrap(), 5000);
    }

    #[test]
    fn test_category_delete_blocked_by_active_tasks() {
        let (_dir, mut store) = open_store();
        store
            .create_category(&Category::new("cnc-0001".to_string(), "Errands".to_string()))
            .unwrap();
        let mut dependent = task("cn-0001", "Buy stamps");
        dependent.category_id = Some("cnc-0001".to_string());
        store.create_task(&dependent).unwrap();

        match store.delete_category("cnc-0001") {
            Err(Error::Conflict { dependents, .. }) => {
                assert_eq!(dependents, vec!["cn-0001".to_string()]);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        // Category still there
        assert!(store.get_category("cnc-0001").is_ok());
    }

    #[test]
    fn test_category_delete_detaches_settled_tasks() {
        let (_dir, mut store) = open_store();
        store
            .create_category(&Category::new("cnc-0001".to_string(), "Errands".to_string()))
            .unwrap();
        let mut settled = task("cn-0001", "Buy stamps");
        settled.category_id = Some("cnc-0001".to_string());
        settled.transition_status(TaskStatus::Done, Utc::now());
        store.create_task(&settled).unwrap();

        store.delete_category("cnc-0001").unwrap();
        assert!(matches!(
            store.get_category("cnc-0001"),
            Err(Error::NotFound(_))
        ));
        assert!(store.get_task("cn-0001").unwrap().category_id.is_none());
    }

    #[test]
    fn test_outcome_delete_conflict_includes_commitments() {
        let (_dir, mut store) = open_store();
        store
            .create_outcome(&Outcome::new("cno-0001".to_string(), "Run a 10k".to_string()))
            .unwrap();
        store
            .create_commitment(&Commitment::new(
                "cnm-0001".to_string(),
                "cno-0001".to_string(),
                "Run three times a week".to_string(),
            ))
            .unwrap();

        match store.delete_outcome("cno-0001") {
            Err(Error::Conflict { dependents, .. }) => {
                assert_eq!(dependents, vec!["cnm-0001".to_string()]);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_outcome_delete_takes_settled_commitments_along() {
        let (_dir, mut store) = open_store();
        store
            .create_outcome(&Outcome::new("cno-0001".to_string(), "Run a 10k".to_string()))
            .unwrap();
        let mut kept = Commitment::new(
            "cnm-0001".to_string(),
            "cno-0001".to_string(),
            "Run three times a week".to_string(),
        );
        kept.status = CommitmentStatus::Kept;
        store.create_commitment(&kept).unwrap();

        store.delete_outcome("cno-0001").unwrap();
        assert!(matches!(
            store.get_commitment("cnm-0001"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_update_outcome_applies_patch() {
        let (_dir, mut store) = open_store();
        store
            .create_outcome(&Outcome::new("cno-0001".to_string(), "Run a 10k".to_string()))
            .unwrap();

        let patch: OutcomePatch =
            serde_json::from_str(r#"{"target_date":"2026-06-01","status":"achieved"}"#).unwrap();
        let updated = store
            .update_outcome("cno-0001", &patch, Utc::now())
            .unwrap();
        assert_eq!(updated.target_date, Some(d(2026, 6, 1)));
        assert_eq!(
            store.get_outcome("cno-0001").unwrap().status,
            crate::models::OutcomeStatus::Achieved
        );
    }

    #[test]
    fn test_commitment_requires_existing_outcome() {
        let (_dir, mut store) = open_store();
        let orphan = Commitment::new(
            "cnm-0001".to_string(),
            "cno-ghost".to_string(),
            "Floss daily".to_string(),
        );
        assert!(matches!(
            store.create_commitment(&orphan),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_renegotiation_reschedule_sets_date_and_morning_time() {
        let (_dir, mut store) = open_store();
        let mut overdue = task("cn-0001", "Renew the passport");
        overdue.due_date = Some(d(2026, 1, 5));
        store.create_task(&overdue).unwrap();

        let request = RenegotiationRequest {
            task_id: "cn-0001".to_string(),
            action: RenegotiationAction::Reschedule,
            reason_code: ReasonCode::WrongTime,
            reason_text: None,
            new_due_date: Some(d(2026, 1, 15)),
            subtasks: None,
        };
        let outcome = store
            .apply_renegotiation(&request, Utc::now())
            .unwrap();

        assert_eq!(outcome.task.due_date, Some(d(2026, 1, 15)));
        assert_eq!(outcome.task.due_time, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(outcome.record.action, RenegotiationAction::Reschedule);
        assert_eq!(store.list_renegotiations(Some("cn-0001")).unwrap().len(), 1);
    }

    #[test]
    fn test_renegotiation_split_creates_subtasks_and_drops_original() {
        let (_dir, mut store) = open_store();
        let mut overdue = task("cn-0001", "Clear out the garage");
        overdue.due_date = Some(d(2026, 1, 5));
        overdue.category_id = Some("cnc-0001".to_string());
        store.create_task(&overdue).unwrap();

        let request = RenegotiationRequest {
            task_id: "cn-0001".to_string(),
            action: RenegotiationAction::Split,
            reason_code: ReasonCode::TooBig,
            reason_text: None,
            new_due_date: None,
            subtasks: Some(vec![
                SubtaskSuggestion {
                    title: "Sort into keep and donate piles".to_string(),
                    estimated_minutes: 30,
                    due_date: d(2026, 1, 15),
                },
                SubtaskSuggestion {
                    title: "Drive donations over".to_string(),
                    estimated_minutes: 30,
                    due_date: d(2026, 1, 16),
                },
            ]),
        };
        let outcome = store
            .apply_renegotiation(&request, Utc::now())
            .unwrap();

        assert_eq!(outcome.task.status, TaskStatus::Dropped);
        assert_eq!(outcome.subtasks.len(), 2);
        assert_eq!(outcome.record.subtask_ids.len(), 2);
        // Sub-steps inherit the category and are persisted
        for subtask in &outcome.subtasks {
            let stored = store.get_task(&subtask.id).unwrap();
            assert_eq!(stored.category_id, Some("cnc-0001".to_string()));
            assert_eq!(stored.status, TaskStatus::Active);
        }
    }

    #[test]
    fn test_renegotiation_park_clears_date() {
        let (_dir, mut store) = open_store();
        let mut overdue = task("cn-0001", "Learn the accordion");
        overdue.due_date = Some(d(2026, 1, 5));
        overdue.due_time = NaiveTime::from_hms_opt(18, 0, 0);
        store.create_task(&overdue).unwrap();

        let request = RenegotiationRequest {
            task_id: "cn-0001".to_string(),
            action: RenegotiationAction::Park,
            reason_code: ReasonCode::LostInterest,
            reason_text: None,
            new_due_date: None,
            subtasks: None,
        };
        let outcome = store
            .apply_renegotiation(&request, Utc::now())
            .unwrap();
        assert!(outcome.task.due_date.is_none());
        assert!(outcome.task.due_time.is_none());
        assert_eq!(outcome.task.status, TaskStatus::Active);
    }

    #[test]
    fn test_renegotiation_invalid_request_changes_nothing() {
        let (_dir, mut store) = open_store();
        let mut overdue = task("cn-0001", "Renew the passport");
        overdue.due_date = Some(d(2026, 1, 5));
        store.create_task(&overdue).unwrap();

        // Reschedule without a date fails validation before any write
        let request = RenegotiationRequest {
            task_id: "cn-0001".to_string(),
            action: RenegotiationAction::Reschedule,
            reason_code: ReasonCode::WrongTime,
            reason_text: None,
            new_due_date: None,
            subtasks: None,
        };
        assert!(matches!(
            store.apply_renegotiation(&request, Utc::now()),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(store.get_task("cn-0001").unwrap().due_date, Some(d(2026, 1, 5)));
        assert!(store.list_renegotiations(None).unwrap().is_empty());
    }

    #[test]
    fn test_renegotiation_records_roundtrip() {
        let (_dir, mut store) = open_store();
        let mut overdue = task("cn-0001", "Renew the passport");
        overdue.due_date = Some(d(2026, 1, 5));
        store.create_task(&overdue).unwrap();

        let request = RenegotiationRequest {
            task_id: "cn-0001".to_string(),
            action: RenegotiationAction::Drop,
            reason_code: ReasonCode::Other,
            reason_text: Some("Handled at the consulate".to_string()),
            new_due_date: None,
            subtasks: None,
        };
        store
            .apply_renegotiation(&request, Utc::now())
            .unwrap();

        let records = store.list_renegotiations(Some("cn-0001")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, RenegotiationAction::Drop);
        assert_eq!(records[0].reason_code, ReasonCode::Other);
        assert_eq!(
            records[0].reason_text.as_deref(),
            Some("Handled at the consulate")
        );
    }

    #[test]
    fn test_generate_id_format() {
        let id = generate_id(TASK_PREFIX, "Water the plants");
        assert!(id.starts_with("cn-"));
        assert_eq!(id.len(), 7);
        validate_task_id(&id).unwrap();
    }

    #[test]
    fn test_validate_id_rejects_bad_shapes() {
        assert!(validate_id("cn-a1b2", "cn").is_ok());
        assert!(validate_id("cnx-a1b2", "cn").is_err());
        assert!(validate_id("cn-a1b", "cn").is_err());
        assert!(validate_id("cn-zzzz", "cn").is_err());
        assert!(validate_id("a1b2", "cn").is_err());
    }

    #[test]
    fn test_resolve_data_dir_override_wins() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_data_dir(Some(dir.path())).unwrap();
        assert_eq!(resolved, dir.path());
    }
}
