//! Shared types for the take-a-number queue system
//!
//! Common types used across the server and its clients: entity models,
//! the realtime bus message types and wire codec, and client DTOs.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), timestamps are Unix millis.

pub mod client;
pub mod message;
pub mod models;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Message bus re-exports (for convenient access)
pub use message::{BusMessage, EventType};
