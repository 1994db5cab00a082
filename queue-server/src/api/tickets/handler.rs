//! Ticket API Handlers
//!
//! Claim and guest-cancel are public but gated by the queue's access token
//! (the QR link); call-next and status updates are staff operations. Every
//! successful mutation publishes its event after the transaction committed.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::message::BusMessage;
use shared::models::{Ticket, TicketStatus};
use validator::Validate;

use crate::auth::CurrentStaff;
use crate::core::ServerState;
use crate::db::repository::ticket;
use crate::utils::{AppError, AppResult, validate_payload};

#[derive(Debug, Deserialize, Validate)]
pub struct ClaimTicketBody {
    #[validate(length(min = 1, message = "holder name is required"))]
    pub holder_name: String,
    #[validate(length(min = 1, message = "holder code is required"))]
    pub holder_code: String,
    /// Queue access token from the QR link; absent ⇒ unauthorized, not 400
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketStatusBody {
    pub status: TicketStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelTicketBody {
    pub token: Option<String>,
}

/// POST /api/queues/:id/tickets - 领取下一个号码
pub async fn claim(
    State(state): State<ServerState>,
    Path(queue_id): Path<i64>,
    Json(payload): Json<ClaimTicketBody>,
) -> AppResult<Json<Ticket>> {
    validate_payload(&payload)?;

    let ticket = ticket::claim(
        &state.db,
        queue_id,
        &payload.holder_name,
        &payload.holder_code,
        payload.token.as_deref().unwrap_or(""),
    )
    .await?;

    state.publish(BusMessage::ticket_created(&ticket));
    tracing::info!(queue_id, number = ticket.number, "ticket claimed");
    Ok(Json(ticket))
}

/// POST /api/queues/:id/call-next - 叫下一个号
pub async fn call_next(
    State(state): State<ServerState>,
    staff: CurrentStaff,
    Path(queue_id): Path<i64>,
) -> AppResult<Json<Ticket>> {
    let outcome = ticket::call_next(&state.db, queue_id, Some(staff.id)).await?;

    // The auto-resolved predecessor (if any) changed visibly too
    if let Some(resolved) = &outcome.resolved {
        state.publish(BusMessage::ticket_updated(resolved));
    }
    state.publish(BusMessage::ticket_called(&outcome.ticket));

    tracing::info!(
        queue_id,
        number = outcome.ticket.number,
        by = %staff.username,
        "ticket called"
    );
    Ok(Json(outcome.ticket))
}

/// PUT /api/tickets/:id/status - 完成/跳过一张票
pub async fn update_status(
    State(state): State<ServerState>,
    staff: CurrentStaff,
    Path(ticket_id): Path<i64>,
    Json(payload): Json<UpdateTicketStatusBody>,
) -> AppResult<Json<Ticket>> {
    if !payload.status.is_terminal() {
        return Err(AppError::Validation(
            "status must be done or skipped".into(),
        ));
    }

    let ticket = ticket::update_status(
        &state.db,
        ticket_id,
        Some(staff.id),
        payload.status,
        payload.reason.as_deref(),
    )
    .await?;

    state.publish(BusMessage::ticket_updated(&ticket));
    tracing::info!(
        ticket_id,
        status = %ticket.status,
        by = %staff.username,
        "ticket status updated"
    );
    Ok(Json(ticket))
}

/// POST /api/tickets/:id/cancel - 持票人自助取消 (需要队列访问令牌)
pub async fn cancel(
    State(state): State<ServerState>,
    Path(ticket_id): Path<i64>,
    Json(payload): Json<CancelTicketBody>,
) -> AppResult<Json<Ticket>> {
    let ticket = ticket::guest_cancel(
        &state.db,
        ticket_id,
        payload.token.as_deref().unwrap_or(""),
    )
    .await?;

    state.publish(BusMessage::ticket_updated(&ticket));
    tracing::info!(ticket_id, "ticket cancelled by guest");
    Ok(Json(ticket))
}
