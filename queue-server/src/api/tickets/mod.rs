//! Ticket API 模块
//!
//! 取号与叫号接口挂在队列路径下，状态与取消接口挂在票路径下，
//! 与事件命名保持一致。

mod handler;

pub use handler::{CancelTicketBody, ClaimTicketBody, UpdateTicketStatusBody};

use axum::{
    Router,
    routing::{post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/queues/{queue_id}/tickets", post(handler::claim))
        .route("/api/queues/{queue_id}/call-next", post(handler::call_next))
        .route(
            "/api/tickets/{ticket_id}/status",
            put(handler::update_status),
        )
        .route("/api/tickets/{ticket_id}/cancel", post(handler::cancel))
}
