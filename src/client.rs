//! Blocking HTTP client for the Cairn API.
//!
//! Wraps the JSON endpoints the server exposes and implements the
//! session's [`Remote`] trait, so a [`TaskListSession`] can drive a real
//! server the same way tests drive a scripted one. Renegotiation is not
//! part of that trait: it is confirm-then-apply, submitted here directly
//! and followed by a session refresh.
//!
//! [`TaskListSession`]: crate::session::TaskListSession

use serde::Deserialize;

use crate::models::{
    Category, Commitment, NewCategory, NewCommitment, NewOutcome, NewTask, Outcome, OutcomePatch,
    PatchResponse, PositionUpdate, Task, TaskPatch,
};
use crate::renegotiate::RenegotiationRequest;
use crate::session::Remote;
use crate::store::RenegotiationOutcome;
use crate::{Error, Result};

/// User-Agent header sent with every request.
const USER_AGENT: &str = "cairn-cli";

/// Client for one Cairn server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
}

#[derive(Deserialize)]
struct TasksBody {
    tasks: Vec<Task>,
}

#[derive(Deserialize)]
struct TaskBody {
    task: Task,
}

#[derive(Deserialize)]
struct CategoriesBody {
    categories: Vec<Category>,
}

#[derive(Deserialize)]
struct CategoryBody {
    category: Category,
}

#[derive(Deserialize)]
struct OutcomesBody {
    outcomes: Vec<Outcome>,
}

#[derive(Deserialize)]
struct OutcomeBody {
    outcome: Outcome,
}

#[derive(Deserialize)]
struct CommitmentsBody {
    commitments: Vec<Commitment>,
}

#[derive(Deserialize)]
struct CommitmentBody {
    commitment: Commitment,
}

/// Error body every endpoint uses; `dependents` only on 409.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    dependents: Vec<String>,
}

impl ApiClient {
    /// Create a client for a server base URL such as `http://127.0.0.1:4277`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a task.
    pub fn create_task(&self, new_task: &NewTask) -> Result<Task> {
        let response = ureq::post(&self.url("/api/tasks"))
            .set("User-Agent", USER_AGENT)
            .send_json(new_task);
        let body: TaskBody = read_json(response)?;
        Ok(body.task)
    }

    /// Submit a renegotiation. The server validates, applies the action,
    /// and returns the audit record with the task as it now stands.
    pub fn submit_renegotiation(
        &self,
        request: &RenegotiationRequest,
    ) -> Result<RenegotiationOutcome> {
        let response = ureq::post(&self.url("/api/renegotiations"))
            .set("User-Agent", USER_AGENT)
            .send_json(request);
        read_json(response)
    }

    /// List categories.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let response = ureq::get(&self.url("/api/categories"))
            .set("User-Agent", USER_AGENT)
            .call();
        let body: CategoriesBody = read_json(response)?;
        Ok(body.categories)
    }

    /// Create a category.
    pub fn create_category(&self, new_category: &NewCategory) -> Result<Category> {
        let response = ureq::post(&self.url("/api/categories"))
            .set("User-Agent", USER_AGENT)
            .send_json(new_category);
        let body: CategoryBody = read_json(response)?;
        Ok(body.category)
    }

    /// Delete a category. A 409 with the dependent task IDs becomes
    /// [`Error::Conflict`].
    pub fn delete_category(&self, id: &str) -> Result<()> {
        let response = ureq::delete(&self.url(&format!("/api/categories/{}", id)))
            .set("User-Agent", USER_AGENT)
            .call();
        read_ack(response)
    }

    /// List outcomes.
    pub fn list_outcomes(&self) -> Result<Vec<Outcome>> {
        let response = ureq::get(&self.url("/api/outcomes"))
            .set("User-Agent", USER_AGENT)
            .call();
        let body: OutcomesBody = read_json(response)?;
        Ok(body.outcomes)
    }

    /// Create an outcome.
    pub fn create_outcome(&self, new_outcome: &NewOutcome) -> Result<Outcome> {
        let response = ureq::post(&self.url("/api/outcomes"))
            .set("User-Agent", USER_AGENT)
            .send_json(new_outcome);
        let body: OutcomeBody = read_json(response)?;
        Ok(body.outcome)
    }

    /// Apply a partial patch to an outcome.
    pub fn patch_outcome(&self, id: &str, patch: &OutcomePatch) -> Result<Outcome> {
        let response = ureq::request("PATCH", &self.url(&format!("/api/outcomes/{}", id)))
            .set("User-Agent", USER_AGENT)
            .send_json(patch);
        let body: OutcomeBody = read_json(response)?;
        Ok(body.outcome)
    }

    /// Delete an outcome.
    pub fn delete_outcome(&self, id: &str) -> Result<()> {
        let response = ureq::delete(&self.url(&format!("/api/outcomes/{}", id)))
            .set("User-Agent", USER_AGENT)
            .call();
        read_ack(response)
    }

    /// List commitments, optionally narrowed to one outcome.
    pub fn list_commitments(&self, outcome: Option<&str>) -> Result<Vec<Commitment>> {
        let url = match outcome {
            Some(id) => self.url(&format!("/api/commitments?outcome={}", id)),
            None => self.url("/api/commitments"),
        };
        let response = ureq::get(&url).set("User-Agent", USER_AGENT).call();
        let body: CommitmentsBody = read_json(response)?;
        Ok(body.commitments)
    }

    /// Create a commitment.
    pub fn create_commitment(&self, new_commitment: &NewCommitment) -> Result<Commitment> {
        let response = ureq::post(&self.url("/api/commitments"))
            .set("User-Agent", USER_AGENT)
            .send_json(new_commitment);
        let body: CommitmentBody = read_json(response)?;
        Ok(body.commitment)
    }

    /// Delete a commitment.
    pub fn delete_commitment(&self, id: &str) -> Result<()> {
        let response = ureq::delete(&self.url(&format!("/api/commitments/{}", id)))
            .set("User-Agent", USER_AGENT)
            .call();
        read_ack(response)
    }
}

impl Remote for ApiClient {
    fn fetch_tasks(&self) -> Result<Vec<Task>> {
        let response = ureq::get(&self.url("/api/tasks"))
            .set("User-Agent", USER_AGENT)
            .call();
        let body: TasksBody = read_json(response)?;
        Ok(body.tasks)
    }

    fn patch_task(&self, id: &str, patch: &TaskPatch) -> Result<PatchResponse> {
        let response = ureq::request("PATCH", &self.url(&format!("/api/tasks/{}", id)))
            .set("User-Agent", USER_AGENT)
            .send_json(patch);
        read_json(response)
    }

    fn reorder_tasks(&self, updates: &[PositionUpdate]) -> Result<()> {
        let response = ureq::request("PATCH", &self.url("/api/tasks/reorder"))
            .set("User-Agent", USER_AGENT)
            .send_json(serde_json::json!({ "tasks": updates }));
        read_ack(response)
    }
}

/// Turn a response into deserialized JSON, mapping HTTP and transport
/// failures onto the library error type.
fn read_json<T: serde::de::DeserializeOwned>(
    response: std::result::Result<ureq::Response, ureq::Error>,
) -> Result<T> {
    match response {
        Ok(resp) => Ok(resp.into_json()?),
        Err(ureq::Error::Status(code, resp)) => Err(status_error(code, resp)),
        Err(err) => Err(Error::Transport(err.to_string())),
    }
}

/// Like [`read_json`] for endpoints whose success body is just an ack.
fn read_ack(response: std::result::Result<ureq::Response, ureq::Error>) -> Result<()> {
    match response {
        Ok(_) => Ok(()),
        Err(ureq::Error::Status(code, resp)) => Err(status_error(code, resp)),
        Err(err) => Err(Error::Transport(err.to_string())),
    }
}

fn status_error(status: u16, resp: ureq::Response) -> Error {
    let body = resp.into_string().unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) if status == 409 && !parsed.dependents.is_empty() => Error::Conflict {
            message: parsed.error,
            dependents: parsed.dependents,
        },
        Ok(parsed) => Error::Api {
            status,
            message: parsed.error,
        },
        Err(_) => Error::Api {
            status,
            message: body,
        },
    }
}
