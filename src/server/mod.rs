//! HTTP API server exposing the store as JSON endpoints.
//!
//! Feature-gated behind `server`. The store sits behind an async mutex so
//! handlers share one connection; every handler speaks the same error
//! envelope: `{"error": ...}` with the mapped status code, plus a
//! `"dependents"` list on 409 conflicts. CORS is wide open because the
//! browser client is expected to run on a different origin in
//! development.

use axum::{
    Json, Router,
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    routing::{delete, get, patch},
};
use chrono::Utc;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::dates;
use crate::models::{
    NewCategory, NewCommitment, NewOutcome, NewTask, OutcomePatch, PositionUpdate, TaskPatch,
};
use crate::renegotiate::RenegotiationRequest;
use crate::store::{self, Store};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Store instance behind a mutex so handlers can share it
    pub store: Arc<Mutex<Store>>,
}

type HandlerError = (StatusCode, Json<serde_json::Value>);
type HandlerResult = Result<Json<serde_json::Value>, HandlerError>;

/// Install the global tracing subscriber, honoring `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Start the API server on the given host and port.
pub async fn start_server(
    data_dir: &Path,
    port: u16,
    host: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open(data_dir)?;
    let state = AppState {
        store: Arc::new(Mutex::new(store)),
    };
    let app = router(state);

    let host_addr: std::net::IpAddr = host
        .parse()
        .map_err(|e| format!("Invalid host address '{}': {}", host, e))?;
    let addr = SocketAddr::from((host_addr, port));
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("CAIRN_GIT_COMMIT"),
        %addr,
        "starting api server"
    );
    println!("Serving cairn API at http://{}", addr);
    println!("Press Ctrl+C to stop");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router around shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/reorder", patch(reorder_tasks))
        .route("/api/tasks/{id}", patch(patch_task))
        .route(
            "/api/renegotiations",
            get(list_renegotiations).post(create_renegotiation),
        )
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/{id}", delete(delete_category))
        .route("/api/outcomes", get(list_outcomes).post(create_outcome))
        .route(
            "/api/outcomes/{id}",
            patch(patch_outcome).delete(delete_outcome),
        )
        .route(
            "/api/commitments",
            get(list_commitments).post(create_commitment),
        )
        .route("/api/commitments/{id}", delete(delete_commitment))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Map a library error onto a status code and the shared error envelope.
fn error_response(err: crate::Error) -> HandlerError {
    let status = match &err {
        crate::Error::NotFound(_) => StatusCode::NOT_FOUND,
        crate::Error::InvalidInput(_) | crate::Error::InvalidId(_) => StatusCode::BAD_REQUEST,
        crate::Error::Conflict { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = match err {
        crate::Error::Conflict {
            message,
            dependents,
        } => serde_json::json!({ "error": message, "dependents": dependents }),
        other => serde_json::json!({ "error": other.to_string() }),
    };
    (status, Json(body))
}

fn bad_request(message: &str) -> HandlerError {
    error_response(crate::Error::InvalidInput(message.to_string()))
}

// === Health ===

/// Liveness probe with build information.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("CAIRN_GIT_COMMIT"),
        "built": env!("CAIRN_BUILD_TIMESTAMP"),
    }))
}

// === Tasks ===

/// Get all tasks in manual order.
async fn list_tasks(State(state): State<AppState>) -> HandlerResult {
    let store = state.store.lock().await;
    let tasks = store.list_tasks(None, None).map_err(error_response)?;
    Ok(Json(serde_json::json!({ "tasks": tasks })))
}

/// Create a task at the end of the manual order.
async fn create_task(
    State(state): State<AppState>,
    Json(request): Json<NewTask>,
) -> HandlerResult {
    if request.title.trim().is_empty() {
        return Err(bad_request("Task title cannot be empty"));
    }
    let mut store = state.store.lock().await;
    let position = store.next_position().map_err(error_response)?;
    let id = store::generate_id(store::TASK_PREFIX, &request.title);
    let task = request.into_task(id, position, Utc::now());
    store.create_task(&task).map_err(error_response)?;
    Ok(Json(serde_json::json!({ "task": task })))
}

/// Apply a partial patch to a task. Completing or skipping a recurring
/// task adds `nextOccurrence` to the response.
async fn patch_task(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(request): Json<TaskPatch>,
) -> HandlerResult {
    let mut store = state.store.lock().await;
    let response = store
        .update_task(&id, &request, dates::local_today(), Utc::now())
        .map_err(error_response)?;
    Ok(Json(serde_json::json!(response)))
}

/// Request body for a bulk reorder.
#[derive(Deserialize)]
struct ReorderRequest {
    tasks: Vec<PositionUpdate>,
}

/// Apply a bulk position update. Any unknown ID fails the whole batch.
async fn reorder_tasks(
    State(state): State<AppState>,
    Json(request): Json<ReorderRequest>,
) -> HandlerResult {
    let mut store = state.store.lock().await;
    store
        .reorder_tasks(&request.tasks, Utc::now())
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// === Renegotiations ===

#[derive(Deserialize)]
struct RenegotiationListQuery {
    task: Option<String>,
}

/// List renegotiation records, optionally narrowed to one task.
async fn list_renegotiations(
    State(state): State<AppState>,
    Query(query): Query<RenegotiationListQuery>,
) -> HandlerResult {
    let store = state.store.lock().await;
    let records = store
        .list_renegotiations(query.task.as_deref())
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({ "renegotiations": records })))
}

/// Validate and apply a renegotiation, returning the audit record, the
/// task as it now stands, and any sub-step tasks a split created.
async fn create_renegotiation(
    State(state): State<AppState>,
    Json(request): Json<RenegotiationRequest>,
) -> HandlerResult {
    let mut store = state.store.lock().await;
    let outcome = store
        .apply_renegotiation(&request, Utc::now())
        .map_err(error_response)?;
    Ok(Json(serde_json::json!(outcome)))
}

// === Categories ===

/// Get all categories.
async fn list_categories(State(state): State<AppState>) -> HandlerResult {
    let store = state.store.lock().await;
    let categories = store.list_categories().map_err(error_response)?;
    Ok(Json(serde_json::json!({ "categories": categories })))
}

/// Create a category.
async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<NewCategory>,
) -> HandlerResult {
    if request.name.trim().is_empty() {
        return Err(bad_request("Category name cannot be empty"));
    }
    let mut store = state.store.lock().await;
    let id = store::generate_id(store::CATEGORY_PREFIX, &request.name);
    let category = request.into_category(id, Utc::now());
    store.create_category(&category).map_err(error_response)?;
    Ok(Json(serde_json::json!({ "category": category })))
}

/// Delete a category. Refused with 409 and the dependent task IDs while
/// any active task still uses it.
async fn delete_category(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> HandlerResult {
    let mut store = state.store.lock().await;
    store.delete_category(&id).map_err(error_response)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// === Outcomes ===

/// Get all outcomes.
async fn list_outcomes(State(state): State<AppState>) -> HandlerResult {
    let store = state.store.lock().await;
    let outcomes = store.list_outcomes().map_err(error_response)?;
    Ok(Json(serde_json::json!({ "outcomes": outcomes })))
}

/// Create an outcome.
async fn create_outcome(
    State(state): State<AppState>,
    Json(request): Json<NewOutcome>,
) -> HandlerResult {
    if request.title.trim().is_empty() {
        return Err(bad_request("Outcome title cannot be empty"));
    }
    let mut store = state.store.lock().await;
    let id = store::generate_id(store::OUTCOME_PREFIX, &request.title);
    let outcome = request.into_outcome(id, Utc::now());
    store.create_outcome(&outcome).map_err(error_response)?;
    Ok(Json(serde_json::json!({ "outcome": outcome })))
}

/// Apply a partial patch to an outcome.
async fn patch_outcome(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(request): Json<OutcomePatch>,
) -> HandlerResult {
    let mut store = state.store.lock().await;
    let outcome = store
        .update_outcome(&id, &request, Utc::now())
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({ "outcome": outcome })))
}

/// Delete an outcome. Refused with 409 while active tasks or commitments
/// still depend on it.
async fn delete_outcome(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> HandlerResult {
    let mut store = state.store.lock().await;
    store.delete_outcome(&id).map_err(error_response)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// === Commitments ===

#[derive(Deserialize)]
struct CommitmentListQuery {
    outcome: Option<String>,
}

/// Get commitments, optionally narrowed to one outcome.
async fn list_commitments(
    State(state): State<AppState>,
    Query(query): Query<CommitmentListQuery>,
) -> HandlerResult {
    let store = state.store.lock().await;
    let commitments = store
        .list_commitments(query.outcome.as_deref())
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({ "commitments": commitments })))
}

/// Create a commitment. The outcome it points at must exist.
async fn create_commitment(
    State(state): State<AppState>,
    Json(request): Json<NewCommitment>,
) -> HandlerResult {
    if request.title.trim().is_empty() {
        return Err(bad_request("Commitment title cannot be empty"));
    }
    let mut store = state.store.lock().await;
    let id = store::generate_id(store::COMMITMENT_PREFIX, &request.title);
    let commitment = request.into_commitment(id, Utc::now());
    store.create_commitment(&commitment).map_err(error_response)?;
    Ok(Json(serde_json::json!({ "commitment": commitment })))
}

/// Delete a commitment.
async fn delete_commitment(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> HandlerResult {
    let mut store = state.store.lock().await;
    store.delete_commitment(&id).map_err(error_response)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
