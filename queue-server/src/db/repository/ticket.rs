//! Ticket Repository — number sequencing and the lifecycle state machine
//!
//! pending → serving → {done, skipped}
//!
//! Every operation here is a single transaction executed while holding the
//! owning queue's serialization lock, so:
//! - two simultaneous claims never receive the same number,
//! - at most one ticket per queue is `serving` at any point,
//! - a failed operation leaves the store untouched (rollback on early
//!   return).

use shared::models::{ACTION_CALL, ACTION_SKIP, GUEST_CANCEL_REASON, Ticket, TicketStatus};
use sqlx::{Sqlite, Transaction};

use super::{RepoError, RepoResult, call_log, queue};
use crate::db::DbService;
use crate::utils::time::now_ms;

const TICKET_COLUMNS: &str = "id, queue_id, number, status, holder_name, holder_code, \
     created_at, called_at, service_start_at, finished_at, cancel_reason, served_by";

/// Result of a call-next: the promoted ticket, plus the previously serving
/// ticket if one had to be auto-resolved to keep the single-serving
/// invariant.
#[derive(Debug, Clone)]
pub struct CallNextOutcome {
    pub ticket: Ticket,
    pub resolved: Option<Ticket>,
}

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> RepoResult<Option<Ticket>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let ticket =
        sqlx::query_as::<_, Ticket>(&format!("SELECT {TICKET_COLUMNS} FROM ticket WHERE id = ?"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
    Ok(ticket)
}

async fn fetch_required(tx: &mut Transaction<'_, Sqlite>, id: i64) -> RepoResult<Ticket> {
    find_by_id(&mut **tx, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Ticket {id} not found")))
}

/// Attach staff identity only when it resolves to a live account.
///
/// Attribution is fail-open: a missing or disabled account degrades to an
/// anonymous call-log entry instead of failing the transition.
async fn resolve_staff(
    tx: &mut Transaction<'_, Sqlite>,
    staff_id: Option<i64>,
) -> RepoResult<Option<i64>> {
    let Some(id) = staff_id else {
        return Ok(None);
    };
    let known: Option<i64> =
        sqlx::query_scalar("SELECT id FROM account WHERE id = ? AND is_active = 1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
    if known.is_none() {
        tracing::debug!(staff_id = id, "staff account not found, recording as anonymous");
    }
    Ok(known)
}

/// Claim the next sequential ticket number in a queue.
///
/// Admission checks (queue exists, open, token match) and the
/// read-max-then-insert all happen inside one transaction under the queue
/// lock; a rejected claim consumes no number.
pub async fn claim(
    db: &DbService,
    queue_id: i64,
    holder_name: &str,
    holder_code: &str,
    token: &str,
) -> RepoResult<Ticket> {
    let _guard = db.lock_queue(queue_id).await?;
    let mut tx = db.pool.begin().await?;

    let queue = queue::find_by_id(&mut *tx, queue_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Queue {queue_id} not found")))?;

    if !queue.is_open {
        return Err(RepoError::Closed);
    }
    // Empty or missing token always fails; comparison is exact
    if token.is_empty() || token != queue.token {
        return Err(RepoError::Unauthorized);
    }

    let max: Option<i64> = sqlx::query_scalar("SELECT MAX(number) FROM ticket WHERE queue_id = ?")
        .bind(queue_id)
        .fetch_one(&mut *tx)
        .await?;
    let next = max.unwrap_or(0) + 1;
    let now = now_ms();

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO ticket (queue_id, number, status, holder_name, holder_code, created_at) \
         VALUES (?, ?, 'pending', ?, ?, ?) RETURNING id",
    )
    .bind(queue_id)
    .bind(next)
    .bind(holder_name)
    .bind(holder_code)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    // Keep the informational counter in step; it only ever moves forward
    sqlx::query("UPDATE queue SET last_number = ? WHERE id = ? AND last_number < ?")
        .bind(next)
        .bind(queue_id)
        .bind(next)
        .execute(&mut *tx)
        .await?;

    let ticket = fetch_required(&mut tx, id).await?;
    tx.commit().await?;
    Ok(ticket)
}

/// Promote the pending ticket with the smallest number to `serving`.
///
/// FIFO by claim order (numeric). If a ticket is still `serving` when the
/// next one is called, it is resolved to `done` in the same transaction —
/// this is what keeps the serving count at 0 or 1 under any interleaving of
/// calls and status updates.
pub async fn call_next(
    db: &DbService,
    queue_id: i64,
    staff_id: Option<i64>,
) -> RepoResult<CallNextOutcome> {
    let _guard = db.lock_queue(queue_id).await?;
    let mut tx = db.pool.begin().await?;

    queue::find_by_id(&mut *tx, queue_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Queue {queue_id} not found")))?;

    let next = sqlx::query_as::<_, Ticket>(&format!(
        "SELECT {TICKET_COLUMNS} FROM ticket \
         WHERE queue_id = ? AND status = 'pending' ORDER BY number ASC LIMIT 1"
    ))
    .bind(queue_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(RepoError::EmptyQueue)?;

    let now = now_ms();
    let staff = resolve_staff(&mut tx, staff_id).await?;

    let serving = sqlx::query_as::<_, Ticket>(&format!(
        "SELECT {TICKET_COLUMNS} FROM ticket \
         WHERE queue_id = ? AND status = 'serving' ORDER BY number ASC LIMIT 1"
    ))
    .bind(queue_id)
    .fetch_optional(&mut *tx)
    .await?;

    let resolved = match serving {
        Some(prev) => {
            sqlx::query("UPDATE ticket SET status = 'done', finished_at = ? WHERE id = ?")
                .bind(now)
                .bind(prev.id)
                .execute(&mut *tx)
                .await?;
            call_log::insert(
                &mut tx,
                prev.id,
                staff,
                TicketStatus::Done.as_str(),
                Some("Auto-resolved by next call"),
                now,
            )
            .await?;
            Some(fetch_required(&mut tx, prev.id).await?)
        }
        None => None,
    };

    sqlx::query(
        "UPDATE ticket SET status = 'serving', called_at = ?, service_start_at = ?, served_by = ? \
         WHERE id = ?",
    )
    .bind(now)
    .bind(now)
    .bind(staff)
    .bind(next.id)
    .execute(&mut *tx)
    .await?;
    call_log::insert(&mut tx, next.id, staff, ACTION_CALL, None, now).await?;

    let ticket = fetch_required(&mut tx, next.id).await?;
    tx.commit().await?;
    Ok(CallNextOutcome { ticket, resolved })
}

/// Staff resolution of a ticket to a terminal state (`done` or `skipped`).
pub async fn update_status(
    db: &DbService,
    ticket_id: i64,
    staff_id: Option<i64>,
    status: TicketStatus,
    reason: Option<&str>,
) -> RepoResult<Ticket> {
    if !status.is_terminal() {
        return Err(RepoError::Validation(
            "status must be done or skipped".into(),
        ));
    }

    let current = find_by_id(&db.pool, ticket_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Ticket {ticket_id} not found")))?;

    let _guard = db.lock_queue(current.queue_id).await?;
    let mut tx = db.pool.begin().await?;

    // Re-read under the lock; the first read only located the queue
    let ticket = fetch_required(&mut tx, ticket_id).await?;
    if ticket.status.is_terminal() {
        return Err(RepoError::InvalidTransition(format!(
            "ticket is already {}",
            ticket.status
        )));
    }

    let now = now_ms();
    let staff = resolve_staff(&mut tx, staff_id).await?;

    sqlx::query("UPDATE ticket SET status = ?, finished_at = ?, cancel_reason = ? WHERE id = ?")
        .bind(status)
        .bind(now)
        .bind(reason)
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?;
    call_log::insert(&mut tx, ticket_id, staff, status.as_str(), reason, now).await?;

    let updated = fetch_required(&mut tx, ticket_id).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Guest self-cancellation, authorized by the owning queue's access token.
///
/// Maps to `skipped` with a fixed system reason; the call-log entry carries
/// no staff id.
pub async fn guest_cancel(db: &DbService, ticket_id: i64, token: &str) -> RepoResult<Ticket> {
    let current = find_by_id(&db.pool, ticket_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Ticket {ticket_id} not found")))?;

    let _guard = db.lock_queue(current.queue_id).await?;
    let mut tx = db.pool.begin().await?;

    let ticket = fetch_required(&mut tx, ticket_id).await?;
    let queue = queue::find_by_id(&mut *tx, ticket.queue_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Queue {} not found", ticket.queue_id)))?;

    if token.is_empty() || token != queue.token {
        return Err(RepoError::Unauthorized);
    }
    if ticket.status.is_terminal() {
        return Err(RepoError::InvalidTransition(format!(
            "ticket is already {}",
            ticket.status
        )));
    }

    let now = now_ms();
    sqlx::query("UPDATE ticket SET status = 'skipped', finished_at = ?, cancel_reason = ? WHERE id = ?")
        .bind(now)
        .bind(GUEST_CANCEL_REASON)
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?;
    call_log::insert(&mut tx, ticket_id, None, ACTION_SKIP, Some(GUEST_CANCEL_REASON), now)
        .await?;

    let updated = fetch_required(&mut tx, ticket_id).await?;
    tx.commit().await?;
    Ok(updated)
}
