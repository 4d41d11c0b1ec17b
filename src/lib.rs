//! Cairn - a task management library for people who renegotiate with their day.
//!
//! This library provides the core functionality for the `cairn` CLI tool and
//! its HTTP API, including task filtering and grouping, saved views,
//! recurrence, and structured renegotiation of overdue work.

pub mod cli;
pub mod client;
pub mod commands;
pub mod dates;
pub mod filters;
pub mod grouping;
pub mod models;
pub mod prefs;
pub mod recurrence;
pub mod renegotiate;
#[cfg(feature = "server")]
pub mod server;
pub mod session;
pub mod store;
pub mod views;

/// Library-level error type for Cairn operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not initialized: run `cairn system init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A delete was refused because other records still depend on the
    /// target; `dependents` carries their IDs for the caller to surface.
    #[error("{message}")]
    Conflict {
        message: String,
        dependents: Vec<String>,
    },

    #[error("View limit reached: at most {0} saved views")]
    ViewLimit(usize),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Cairn operations.
pub type Result<T> = std::result::Result<T, Error>;
