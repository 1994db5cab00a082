//! 实时事件分发
//!
//! # 架构
//!
//! ```text
//! mutation handlers ──▶ EventHub.publish ──▶ broadcast::Sender<BusMessage>
//!                                                   │
//!                            per-connection forward task (×N)
//!                                                   │
//!                              SubscriptionRegistry filter (joined queues)
//!                                                   ▼
//!                                            TCP subscribers
//! ```
//!
//! Delivery is at-most-once per connected subscriber; viewers poll full
//! state on an interval as the correctness backstop.

pub mod hub;
pub mod registry;

pub use hub::{EventHub, HubConfig};
pub use registry::{SubscriptionRegistry, Tier};

pub use shared::message::{BusMessage, EventType, HandshakePayload, codec};
