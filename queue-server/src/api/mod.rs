//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 员工登录
//! - [`queues`] - 队列管理接口
//! - [`tickets`] - 取号/叫号/状态接口

pub mod auth;
pub mod health;
pub mod queues;
pub mod tickets;

use std::time::Duration;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Upper bound on request handling; store lock waits are shorter, so this
/// only fires when something is genuinely wedged
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Assemble the full application router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(queues::router())
        .merge(tickets::router())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
