//! Client-side task list with optimistic mutations.
//!
//! [`TaskListSession`] mirrors what a connected UI holds in memory: the
//! current task list plus a ledger of in-flight and settled mutations.
//! Every mutation follows the same cycle: capture a snapshot, apply the
//! optimistic value locally, issue the remote call, then either confirm
//! (the server's value supersedes the optimistic one) or revert (the
//! exact snapshot is restored, never an inverse edit). Drops are the one
//! deliberate exception: nothing is captured and nothing is rolled back.
//!
//! Calls are independent and unordered. There is no queue and no
//! de-duplication; when two edits to the same task race, the later
//! response wins.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{PatchResponse, PositionUpdate, Task, TaskPatch, TaskStatus};
use crate::{Error, Result};

/// Where a mutation stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Optimistic value applied locally, remote call in flight
    Pending,
    /// Remote accepted; its returned value supersedes the optimistic one
    Confirmed,
    /// Remote failed; the captured snapshot was restored
    Reverted,
}

impl MutationState {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationState::Pending)
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, MutationState::Confirmed)
    }

    pub fn is_reverted(&self) -> bool {
        matches!(self, MutationState::Reverted)
    }
}

/// What kind of edit a mutation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ToggleDone,
    Update,
    Reorder,
    Drop,
}

/// State captured before the optimistic apply, for restoration on failure.
#[derive(Debug, Clone)]
enum Snapshot {
    /// Full pre-mutation copy of one task
    Task(Box<Task>),
    /// Previous positions of every task touched by a reorder
    Positions(Vec<(String, i64)>),
    /// Nothing captured; drops are fire-and-forget
    None,
}

/// One entry in the session's mutation ledger.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    /// Unique mutation id
    pub id: String,

    /// Kind of edit
    pub kind: MutationKind,

    /// Task the mutation targets; reorders touch several and carry None
    pub task_id: Option<String>,

    /// Lifecycle state
    pub state: MutationState,

    snapshot: Snapshot,
}

/// A staged patch mutation: the optimistic value is already applied
/// locally, and `patch` is what the caller sends to the remote.
#[derive(Debug, Clone)]
pub struct StagedPatch {
    pub mutation_id: String,
    pub task_id: String,
    pub patch: TaskPatch,
}

/// A staged reorder: positions are already applied locally, and `updates`
/// is the wire payload.
#[derive(Debug, Clone)]
pub struct StagedReorder {
    pub mutation_id: String,
    pub updates: Vec<PositionUpdate>,
}

/// The remote a session talks to. Implemented by the HTTP client and by
/// scripted fakes in tests.
pub trait Remote {
    fn fetch_tasks(&self) -> Result<Vec<Task>>;
    fn patch_task(&self, id: &str, patch: &TaskPatch) -> Result<PatchResponse>;
    fn reorder_tasks(&self, updates: &[PositionUpdate]) -> Result<()>;
}

/// Client-side task list state with optimistic mutation tracking.
#[derive(Debug, Default)]
pub struct TaskListSession {
    tasks: Vec<Task>,
    mutations: Vec<MutationRecord>,
}

impl TaskListSession {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            mutations: Vec::new(),
        }
    }

    /// Build a session from a fresh remote fetch.
    pub fn from_remote(remote: &dyn Remote) -> Result<Self> {
        Ok(Self::new(remote.fetch_tasks()?))
    }

    /// Replace local state with a fresh remote fetch. The mutation ledger
    /// is kept as history.
    pub fn refresh(&mut self, remote: &dyn Remote) -> Result<()> {
        self.tasks = remote.fetch_tasks()?;
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn mutations(&self) -> &[MutationRecord] {
        &self.mutations
    }

    pub fn mutation(&self, id: &str) -> Option<&MutationRecord> {
        self.mutations.iter().find(|m| m.id == id)
    }

    pub fn has_pending(&self) -> bool {
        self.mutations.iter().any(|m| m.state.is_pending())
    }

    // === Staging ===

    /// Flip a task between active and done, optimistically. Returns the
    /// staged patch to send to the remote.
    pub fn stage_toggle_done(
        &mut self,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StagedPatch> {
        let task = self
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::NotFound(format!("Task not found: {}", task_id)))?;
        let next_status = match task.status {
            TaskStatus::Active => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Active,
            ref other => {
                return Err(Error::InvalidInput(format!(
                    "Cannot toggle a {} task",
                    other
                )));
            }
        };
        self.stage_patch(
            task_id,
            TaskPatch::status(next_status),
            MutationKind::ToggleDone,
            now,
        )
    }

    /// Apply an arbitrary partial patch optimistically.
    pub fn stage_update(
        &mut self,
        task_id: &str,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<StagedPatch> {
        if patch.is_empty() {
            return Err(Error::InvalidInput("Patch changes nothing".to_string()));
        }
        self.stage_patch(task_id, patch, MutationKind::Update, now)
    }

    fn stage_patch(
        &mut self,
        task_id: &str,
        patch: TaskPatch,
        kind: MutationKind,
        now: DateTime<Utc>,
    ) -> Result<StagedPatch> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::NotFound(format!("Task not found: {}", task_id)))?;
        let snapshot = Snapshot::Task(Box::new(task.clone()));
        patch.apply_to(task, now);

        let mutation_id = Uuid::new_v4().to_string();
        tracing::debug!(mutation = %mutation_id, task = %task_id, ?kind, "staged mutation");
        self.mutations.push(MutationRecord {
            id: mutation_id.clone(),
            kind,
            task_id: Some(task_id.to_string()),
            state: MutationState::Pending,
            snapshot,
        });
        Ok(StagedPatch {
            mutation_id,
            task_id: task_id.to_string(),
            patch,
        })
    }

    /// Reassign positions to match the given order, spaced 1000 apart so
    /// later insertions have room without renumbering. Captures the prior
    /// position of every touched task.
    pub fn stage_reorder(&mut self, ordered_ids: &[String]) -> Result<StagedReorder> {
        for id in ordered_ids {
            if !self.tasks.iter().any(|t| t.id == *id) {
                return Err(Error::NotFound(format!("Task not found: {}", id)));
            }
        }

        let mut previous = Vec::with_capacity(ordered_ids.len());
        let mut updates = Vec::with_capacity(ordered_ids.len());
        for (index, id) in ordered_ids.iter().enumerate() {
            let position = (index as i64) * 1000;
            if let Some(task) = self.tasks.iter_mut().find(|t| t.id == *id) {
                previous.push((id.clone(), task.position));
                task.position = position;
            }
            updates.push(PositionUpdate {
                id: id.clone(),
                position,
            });
        }

        let mutation_id = Uuid::new_v4().to_string();
        tracing::debug!(mutation = %mutation_id, count = updates.len(), "staged reorder");
        self.mutations.push(MutationRecord {
            id: mutation_id.clone(),
            kind: MutationKind::Reorder,
            task_id: None,
            state: MutationState::Pending,
            snapshot: Snapshot::Positions(previous),
        });
        Ok(StagedReorder {
            mutation_id,
            updates,
        })
    }

    /// Optimistically drop a task. No snapshot is captured; callers do not
    /// roll this back on failure.
    pub fn stage_drop(&mut self, task_id: &str, now: DateTime<Utc>) -> Result<StagedPatch> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::NotFound(format!("Task not found: {}", task_id)))?;
        task.transition_status(TaskStatus::Dropped, now);

        let mutation_id = Uuid::new_v4().to_string();
        tracing::debug!(mutation = %mutation_id, task = %task_id, "staged drop");
        self.mutations.push(MutationRecord {
            id: mutation_id.clone(),
            kind: MutationKind::Drop,
            task_id: Some(task_id.to_string()),
            state: MutationState::Pending,
            snapshot: Snapshot::None,
        });
        Ok(StagedPatch {
            mutation_id,
            task_id: task_id.to_string(),
            patch: TaskPatch::status(TaskStatus::Dropped),
        })
    }

    // === Resolution ===

    /// Settle a mutation as accepted. When the remote returned a task
    /// value it supersedes the optimistic one, and a freshly created
    /// recurring occurrence is appended to local state.
    pub fn confirm(&mut self, mutation_id: &str, response: Option<PatchResponse>) -> Result<()> {
        let record = self.unresolved_mut(mutation_id)?;
        record.state = MutationState::Confirmed;

        if let Some(response) = response {
            let server_task = response.task;
            match self.tasks.iter_mut().find(|t| t.id == server_task.id) {
                Some(local) => *local = server_task,
                None => self.tasks.push(server_task),
            }
            if let Some(occurrence) = response.next_occurrence {
                tracing::debug!(task = %occurrence.id, "appending next occurrence");
                self.tasks.push(occurrence);
            }
        }
        Ok(())
    }

    /// Settle a mutation as failed, restoring exactly what was captured
    /// when it was staged. Transport errors and application errors take
    /// this same path.
    pub fn revert(&mut self, mutation_id: &str) -> Result<()> {
        let record = self.unresolved_mut(mutation_id)?;
        record.state = MutationState::Reverted;
        let snapshot = std::mem::replace(&mut record.snapshot, Snapshot::None);

        match snapshot {
            Snapshot::Task(previous) => {
                tracing::warn!(mutation = %mutation_id, task = %previous.id, "reverting mutation");
                match self.tasks.iter_mut().find(|t| t.id == previous.id) {
                    Some(local) => *local = *previous,
                    None => self.tasks.push(*previous),
                }
            }
            Snapshot::Positions(previous) => {
                tracing::warn!(mutation = %mutation_id, count = previous.len(), "reverting reorder");
                for (id, position) in previous {
                    if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                        task.position = position;
                    }
                }
            }
            Snapshot::None => {
                tracing::warn!(mutation = %mutation_id, "drop rejected by remote; keeping local status");
            }
        }
        Ok(())
    }

    fn unresolved_mut(&mut self, mutation_id: &str) -> Result<&mut MutationRecord> {
        let record = self
            .mutations
            .iter_mut()
            .find(|m| m.id == mutation_id)
            .ok_or_else(|| Error::NotFound(format!("Mutation not found: {}", mutation_id)))?;
        if !record.state.is_pending() {
            return Err(Error::InvalidInput(format!(
                "Mutation already resolved: {}",
                mutation_id
            )));
        }
        Ok(record)
    }

    // === Drivers: stage, call the remote, resolve ===

    /// Toggle done against a remote. On failure the pre-toggle snapshot is
    /// restored and the error is returned for the caller to surface.
    pub fn toggle_done(
        &mut self,
        remote: &dyn Remote,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let staged = self.stage_toggle_done(task_id, now)?;
        match remote.patch_task(&staged.task_id, &staged.patch) {
            Ok(response) => self.confirm(&staged.mutation_id, Some(response)),
            Err(err) => {
                self.revert(&staged.mutation_id)?;
                Err(err)
            }
        }
    }

    /// Apply a partial patch against a remote, reverting on failure.
    pub fn update_task(
        &mut self,
        remote: &dyn Remote,
        task_id: &str,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let staged = self.stage_update(task_id, patch, now)?;
        match remote.patch_task(&staged.task_id, &staged.patch) {
            Ok(response) => self.confirm(&staged.mutation_id, Some(response)),
            Err(err) => {
                self.revert(&staged.mutation_id)?;
                Err(err)
            }
        }
    }

    /// Reorder against a remote, restoring the captured positions on
    /// failure.
    pub fn reorder(&mut self, remote: &dyn Remote, ordered_ids: &[String]) -> Result<()> {
        let staged = self.stage_reorder(ordered_ids)?;
        match remote.reorder_tasks(&staged.updates) {
            Ok(()) => self.confirm(&staged.mutation_id, None),
            Err(err) => {
                self.revert(&staged.mutation_id)?;
                Err(err)
            }
        }
    }

    /// Drop a task, fire-and-forget. A remote failure is logged and
    /// swallowed; the local status stays dropped either way.
    pub fn drop_task(
        &mut self,
        remote: &dyn Remote,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let staged = self.stage_drop(task_id, now)?;
        match remote.patch_task(&staged.task_id, &staged.patch) {
            Ok(response) => self.confirm(&staged.mutation_id, Some(response)),
            Err(err) => {
                tracing::warn!(task = %task_id, error = %err, "drop failed on remote");
                self.revert(&staged.mutation_id)
            }
        }
    }
}
