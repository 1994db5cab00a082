//! Queue Repository
//!
//! Queue CRUD plus the control operations that must be atomic: reset
//! (all-or-nothing ticket purge + counter zeroing) and token rotation.

use shared::models::{Queue, QueueSummary, Ticket};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{RepoError, RepoResult};
use crate::db::DbService;
use crate::utils::time::now_ms;

const QUEUE_COLUMNS: &str = "id, name, is_open, last_number, token, created_at";

const TICKET_COLUMNS: &str = "id, queue_id, number, status, holder_name, holder_code, \
     created_at, called_at, service_start_at, finished_at, cancel_reason, served_by";

/// Generate a fresh opaque access token
fn fresh_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// All queues, newest first, each with live pending/serving counters
pub async fn find_all_with_counts(pool: &SqlitePool) -> RepoResult<Vec<QueueSummary>> {
    let queues = sqlx::query_as::<_, QueueSummary>(
        "SELECT q.id, q.name, q.is_open, q.last_number, q.created_at, \
           (SELECT COUNT(*) FROM ticket t WHERE t.queue_id = q.id AND t.status = 'pending') AS pending_count, \
           (SELECT COUNT(*) FROM ticket t WHERE t.queue_id = q.id AND t.status = 'serving') AS serving_count \
         FROM queue q ORDER BY q.created_at DESC, q.id DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(queues)
}

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> RepoResult<Option<Queue>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let queue =
        sqlx::query_as::<_, Queue>(&format!("SELECT {QUEUE_COLUMNS} FROM queue WHERE id = ?"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
    Ok(queue)
}

/// A queue's tickets in claim order
pub async fn find_tickets(pool: &SqlitePool, queue_id: i64) -> RepoResult<Vec<Ticket>> {
    let tickets = sqlx::query_as::<_, Ticket>(&format!(
        "SELECT {TICKET_COLUMNS} FROM ticket WHERE queue_id = ? ORDER BY number ASC"
    ))
    .bind(queue_id)
    .fetch_all(pool)
    .await?;
    Ok(tickets)
}

/// Create a queue: open, `last_number = 0`, fresh access token
pub async fn create(pool: &SqlitePool, name: &str) -> RepoResult<Queue> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO queue (name, is_open, last_number, token, created_at) \
         VALUES (?, 1, 0, ?, ?) RETURNING id",
    )
    .bind(name)
    .bind(fresh_token())
    .bind(now_ms())
    .fetch_one(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create queue".into()))
}

/// Partial update of name / open flag
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    name: Option<&str>,
    is_open: Option<bool>,
) -> RepoResult<Queue> {
    let rows = sqlx::query(
        "UPDATE queue SET name = COALESCE(?1, name), is_open = COALESCE(?2, is_open) WHERE id = ?3",
    )
    .bind(name)
    .bind(is_open)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Queue {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Queue {id} not found")))
}

/// Replace the access token with a freshly generated value.
///
/// Outstanding claim links stop authorizing immediately; already-claimed
/// tickets are untouched. A single-field UPDATE is atomic, so concurrent
/// claims observe either the old or the new token, never a torn value.
pub async fn rotate_token(pool: &SqlitePool, id: i64) -> RepoResult<Queue> {
    let rows = sqlx::query("UPDATE queue SET token = ? WHERE id = ?")
        .bind(fresh_token())
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Queue {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Queue {id} not found")))
}

/// Delete every ticket (call logs cascade) and restart numbering at zero.
///
/// Runs under the queue lock in one transaction: a concurrent claim sees
/// either the full pre-reset ticket set or the empty post-reset set.
pub async fn reset(db: &DbService, id: i64) -> RepoResult<Queue> {
    let _guard = db.lock_queue(id).await?;
    let mut tx = db.pool.begin().await?;

    let queue = find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Queue {id} not found")))?;

    sqlx::query("DELETE FROM ticket WHERE queue_id = ?")
        .bind(queue.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE queue SET last_number = 0 WHERE id = ?")
        .bind(queue.id)
        .execute(&mut *tx)
        .await?;

    let queue = find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| RepoError::Database("queue vanished during reset".into()))?;
    tx.commit().await?;
    Ok(queue)
}

/// Remove the queue with all dependent tickets and call logs
pub async fn delete(db: &DbService, id: i64) -> RepoResult<()> {
    {
        let _guard = db.lock_queue(id).await?;
        let rows = sqlx::query("DELETE FROM queue WHERE id = ?")
            .bind(id)
            .execute(&db.pool)
            .await?;
        if rows.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("Queue {id} not found")));
        }
    }
    db.forget_queue(id);
    Ok(())
}
