//! Repository Module
//!
//! CRUD and transactional state-machine operations over SQLite. Free
//! functions taking the pool (or [`crate::db::DbService`] where the
//! operation needs the per-queue lock).

pub mod account;
pub mod call_log;
pub mod queue;
pub mod ticket;

use thiserror::Error;

/// Repository error types
///
/// Kinds map one-to-one onto the operation error taxonomy so callers can
/// branch without string matching.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Queue is closed")]
    Closed,

    #[error("Access token mismatch")]
    Unauthorized,

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("No pending ticket")]
    EmptyQueue,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transient store contention: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            // SQLITE_BUSY and friends are contention, not corruption — the
            // caller may retry these
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if msg.contains("database is locked") || msg.contains("database table is locked") {
                    RepoError::Transient(msg.to_string())
                } else {
                    RepoError::Database(err.to_string())
                }
            }
            sqlx::Error::PoolTimedOut => RepoError::Transient("connection pool timed out".into()),
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
