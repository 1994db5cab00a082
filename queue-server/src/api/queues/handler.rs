//! Queue API Handlers
//!
//! Queue reads are public (participant pages, TV displays, bridges poll
//! them as the at-most-once backstop); queue mutations are staff-only. The
//! access token appears only in staff responses, never in the public views
//! and never on the event bus.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::message::BusMessage;
use shared::models::{Queue, QueueDetail, QueueSummary};
use validator::Validate;

use crate::auth::CurrentStaff;
use crate::core::ServerState;
use crate::db::repository::queue;
use crate::utils::{AppError, AppResult, validate_payload};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQueueBody {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQueueBody {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    pub is_open: Option<bool>,
}

/// GET /api/queues - 获取所有队列及等待/服务中计数
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<QueueSummary>>> {
    let queues = queue::find_all_with_counts(&state.db.pool).await?;
    Ok(Json(queues))
}

/// GET /api/queues/:id - 获取单个队列及其全部票
pub async fn detail(
    State(state): State<ServerState>,
    Path(queue_id): Path<i64>,
) -> AppResult<Json<QueueDetail>> {
    let queue = queue::find_by_id(&state.db.pool, queue_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Queue {queue_id} not found")))?;
    let tickets = queue::find_tickets(&state.db.pool, queue_id).await?;
    Ok(Json(QueueDetail::from_parts(queue, tickets)))
}

/// POST /api/queues - 创建队列
pub async fn create(
    State(state): State<ServerState>,
    staff: CurrentStaff,
    Json(payload): Json<CreateQueueBody>,
) -> AppResult<Json<Queue>> {
    validate_payload(&payload)?;
    let queue = queue::create(&state.db.pool, &payload.name).await?;

    tracing::info!(queue_id = queue.id, by = %staff.username, "queue created");
    Ok(Json(queue))
}

/// PUT /api/queues/:id - 更新队列 (名称 / 开关)
pub async fn update(
    State(state): State<ServerState>,
    staff: CurrentStaff,
    Path(queue_id): Path<i64>,
    Json(payload): Json<UpdateQueueBody>,
) -> AppResult<Json<Queue>> {
    validate_payload(&payload)?;
    let queue = queue::update(
        &state.db.pool,
        queue_id,
        payload.name.as_deref(),
        payload.is_open,
    )
    .await?;

    tracing::info!(queue_id, by = %staff.username, is_open = queue.is_open, "queue updated");
    Ok(Json(queue))
}

/// DELETE /api/queues/:id - 删除队列 (级联删除票和日志)
pub async fn delete(
    State(state): State<ServerState>,
    staff: CurrentStaff,
    Path(queue_id): Path<i64>,
) -> AppResult<Json<bool>> {
    queue::delete(&state.db, queue_id).await?;

    tracing::info!(queue_id, by = %staff.username, "queue deleted");
    Ok(Json(true))
}

/// POST /api/queues/:id/reset - 清空所有票并重新从 1 开始编号
pub async fn reset(
    State(state): State<ServerState>,
    staff: CurrentStaff,
    Path(queue_id): Path<i64>,
) -> AppResult<Json<Queue>> {
    let queue = queue::reset(&state.db, queue_id).await?;

    state.publish(BusMessage::queue_reset(queue_id));
    tracing::info!(queue_id, by = %staff.username, "queue reset");
    Ok(Json(queue))
}

/// POST /api/queues/:id/rotate-token - 轮换访问令牌
///
/// The response carries the new token for the staff console to re-render QR
/// links; the broadcast event carries only the queue id.
pub async fn rotate_token(
    State(state): State<ServerState>,
    staff: CurrentStaff,
    Path(queue_id): Path<i64>,
) -> AppResult<Json<Queue>> {
    let queue = queue::rotate_token(&state.db.pool, queue_id).await?;

    state.publish(BusMessage::queue_token_rotated(queue_id));
    tracing::info!(queue_id, by = %staff.username, "queue token rotated");
    Ok(Json(queue))
}
