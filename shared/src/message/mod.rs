//! 消息总线消息类型定义
//!
//! 这些类型在 queue-server 和 clients (staff console, TV display,
//! hardware bridge) 之间共享，用于进程内和 TCP 通信。
//!
//! 线格式 (little-endian):
//!
//! ```text
//! [event_type u8][queue_id i64][payload_len u32][payload JSON]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Ticket;

pub mod payload;
pub use payload::*;

#[cfg(feature = "net")]
pub mod codec;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

/// Bus event types
///
/// `Handshake`/`JoinQueue`/`LeaveQueue` are client → server control frames;
/// the rest are server → client queue-scoped events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 握手消息 (声明 tier，staff 携带 JWT)
    Handshake = 0,
    /// 订阅某个队列的事件
    JoinQueue = 1,
    /// 退订某个队列的事件
    LeaveQueue = 2,
    /// 新票已领取
    TicketCreated = 3,
    /// 票已被叫号
    TicketCalled = 4,
    /// 票状态已更新
    TicketUpdated = 5,
    /// 队列已重置
    QueueReset = 6,
    /// 队列访问令牌已轮换
    QueueTokenRotated = 7,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Handshake),
            1 => Ok(EventType::JoinQueue),
            2 => Ok(EventType::LeaveQueue),
            3 => Ok(EventType::TicketCreated),
            4 => Ok(EventType::TicketCalled),
            5 => Ok(EventType::TicketUpdated),
            6 => Ok(EventType::QueueReset),
            7 => Ok(EventType::QueueTokenRotated),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

impl EventType {
    /// Event name as published to subscribers
    pub fn event_name(&self) -> &'static str {
        match self {
            EventType::Handshake => "handshake",
            EventType::JoinQueue => "join-queue",
            EventType::LeaveQueue => "leave-queue",
            EventType::TicketCreated => "ticket-created",
            EventType::TicketCalled => "ticket-called",
            EventType::TicketUpdated => "ticket-updated",
            EventType::QueueReset => "queue-reset",
            EventType::QueueTokenRotated => "queue-token-rotated",
        }
    }
}

/// 总线消息 - 队列范围的事件或控制帧
///
/// Ticket events carry the full updated entity as JSON so subscribers can
/// replace rather than patch their local view. `queue-reset` and
/// `queue-token-rotated` carry the queue id only; the new token is never
/// broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    pub event_type: EventType,
    pub queue_id: i64,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, queue_id: i64, payload: Vec<u8>) -> Self {
        Self {
            event_type,
            queue_id,
            payload,
        }
    }

    // ========== Server → client events ==========

    pub fn ticket_created(ticket: &Ticket) -> Self {
        Self::with_ticket(EventType::TicketCreated, ticket)
    }

    pub fn ticket_called(ticket: &Ticket) -> Self {
        Self::with_ticket(EventType::TicketCalled, ticket)
    }

    pub fn ticket_updated(ticket: &Ticket) -> Self {
        Self::with_ticket(EventType::TicketUpdated, ticket)
    }

    pub fn queue_reset(queue_id: i64) -> Self {
        Self::new(EventType::QueueReset, queue_id, Vec::new())
    }

    pub fn queue_token_rotated(queue_id: i64) -> Self {
        Self::new(EventType::QueueTokenRotated, queue_id, Vec::new())
    }

    fn with_ticket(event_type: EventType, ticket: &Ticket) -> Self {
        let payload =
            serde_json::to_vec(ticket).expect("ticket serialization is infallible");
        Self::new(event_type, ticket.queue_id, payload)
    }

    // ========== Client → server control frames ==========

    pub fn handshake(payload: &HandshakePayload) -> Self {
        let bytes =
            serde_json::to_vec(payload).expect("handshake serialization is infallible");
        Self::new(EventType::Handshake, 0, bytes)
    }

    pub fn join_queue(queue_id: i64) -> Self {
        Self::new(EventType::JoinQueue, queue_id, Vec::new())
    }

    pub fn leave_queue(queue_id: i64) -> Self {
        Self::new(EventType::LeaveQueue, queue_id, Vec::new())
    }

    // ========== Accessors ==========

    /// Server-originated events are the only frames broadcast to
    /// subscribers; control frames are consumed by the server and never
    /// forwarded.
    pub fn is_server_event(&self) -> bool {
        matches!(
            self.event_type,
            EventType::TicketCreated
                | EventType::TicketCalled
                | EventType::TicketUpdated
                | EventType::QueueReset
                | EventType::QueueTokenRotated
        )
    }

    /// Parse the payload as a full ticket (ticket-* events)
    pub fn ticket(&self) -> Option<Ticket> {
        serde_json::from_slice(&self.payload).ok()
    }

    /// Parse the payload as a handshake
    pub fn handshake_payload(&self) -> Option<HandshakePayload> {
        serde_json::from_slice(&self.payload).ok()
    }
}
