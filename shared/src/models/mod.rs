//! Data models
//!
//! Shared between queue-server and frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod account;
pub mod call_log;
pub mod queue;
pub mod ticket;

// Re-exports
pub use account::*;
pub use call_log::*;
pub use queue::*;
pub use ticket::*;
