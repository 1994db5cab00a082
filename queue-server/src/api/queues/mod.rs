//! Queue API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/queues", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route(
            "/{queue_id}",
            get(handler::detail)
                .put(handler::update)
                .delete(handler::delete),
        )
        .route("/{queue_id}/reset", post(handler::reset))
        .route("/{queue_id}/rotate-token", post(handler::rotate_token))
}
