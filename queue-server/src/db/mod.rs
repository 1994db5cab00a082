//! Database Module
//!
//! Handles the SQLite connection pool, migrations, and the per-queue
//! serialization locks that make read-modify-write operations safe under
//! concurrency.

pub mod locks;
pub mod repository;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tokio::sync::OwnedMutexGuard;

use crate::utils::AppError;
use locks::QueueLocks;
use repository::RepoError;

/// How long a mutation may wait for its queue's serialization lock before
/// failing with a retryable error
const LOCK_WAIT: Duration = Duration::from_secs(5);

/// Database service — owns a SQLite connection pool plus the queue locks
#[derive(Clone)]
pub struct DbService {
    pub pool: SqlitePool,
    locks: Arc<QueueLocks>,
}

impl DbService {
    /// Create a new database service with WAL mode and embedded migrations
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        // Build connection options: WAL, foreign keys, normal sync.
        // busy_timeout: 写冲突时等待 5s 而非立即失败
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| AppError::Database(format!("Invalid database path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON")
            .busy_timeout(Duration::from_secs(5))
            .optimize_on_close(true, None);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {e}")))?;

        tracing::info!("Database connection established (SQLite WAL, busy_timeout=5000ms)");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to apply migrations: {e}")))?;
        tracing::info!("Database migrations applied");

        Ok(Self {
            pool,
            locks: Arc::new(QueueLocks::new(LOCK_WAIT)),
        })
    }

    /// Acquire the serialization lock for one queue.
    ///
    /// Every read-modify-write against a queue's rows (claim, call-next,
    /// status updates, reset) must hold this lock for the duration of its
    /// transaction, so number assignment and the single-serving invariant
    /// hold under true parallelism. Bounded wait; times out as `Transient`.
    pub async fn lock_queue(&self, queue_id: i64) -> Result<OwnedMutexGuard<()>, RepoError> {
        self.locks.acquire(queue_id).await
    }

    /// Drop the lock entry for a queue that no longer exists
    pub fn forget_queue(&self, queue_id: i64) {
        self.locks.forget(queue_id);
    }
}
