//! 事件分发中心
//!
//! Queue-scoped fan-out to dynamically joined/left subscriber sets.
//! Mutations publish onto one broadcast channel; each connection gets a
//! forward task that filters by the registry's interest set before writing
//! to the socket. Filtering happens per message, after the registry update,
//! which is what makes `leave-queue` take effect immediately.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shared::message::{BusMessage, EventType, HandshakePayload, codec};

use super::registry::{SubscriptionRegistry, Tier};
use crate::auth::JwtService;
use crate::utils::AppError;

/// Configuration for the event bus listener
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub tcp_listen_addr: String,
    /// Capacity of the broadcast channel (default: 1024)
    pub channel_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            tcp_listen_addr: "0.0.0.0:4100".to_string(),
            channel_capacity: 1024,
        }
    }
}

/// 事件分发中心 - 负责队列事件的扇出
#[derive(Clone)]
pub struct EventHub {
    server_tx: broadcast::Sender<BusMessage>,
    registry: Arc<SubscriptionRegistry>,
    config: HubConfig,
    shutdown_token: CancellationToken,
}

impl EventHub {
    /// 创建默认配置的分发中心
    pub fn new() -> Self {
        Self::from_config(HubConfig::default())
    }

    pub fn from_config(config: HubConfig) -> Self {
        let (server_tx, _) = broadcast::channel(config.channel_capacity);
        Self {
            server_tx,
            registry: Arc::new(SubscriptionRegistry::new()),
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Publish a queue-scoped event to all interested subscribers.
    ///
    /// Fire-and-forget: returns the number of live receivers; zero listeners
    /// is not an error. Mutation outcomes never depend on this call.
    pub fn publish(&self, msg: BusMessage) -> usize {
        match self.server_tx.send(msg) {
            Ok(receivers) => receivers,
            Err(_) => 0,
        }
    }

    /// Subscribe to the raw event stream (in-process consumers, tests)
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.server_tx.subscribe()
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 优雅关闭：取消监听循环和所有连接任务
    pub fn shutdown(&self) {
        tracing::info!("Shutting down event hub");
        self.shutdown_token.cancel();
    }

    /// Run the TCP listener for bus subscribers.
    ///
    /// Per connection: an optional handshake frame (staff tier requires a
    /// valid JWT; an invalid staff handshake closes the connection), then
    /// any number of join/leave frames; server events flow back for joined
    /// queues until disconnect.
    pub async fn start_tcp_server(&self, jwt: Arc<JwtService>) -> Result<(), AppError> {
        let listener = TcpListener::bind(&self.config.tcp_listen_addr)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind event bus: {e}")))?;

        tracing::info!(
            "Event bus TCP server listening on {}",
            self.config.tcp_listen_addr
        );

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Event bus TCP server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let server_tx = self.server_tx.clone();
                            let registry = self.registry.clone();
                            let jwt = jwt.clone();
                            let shutdown = self.shutdown_token.clone();

                            tokio::spawn(async move {
                                handle_connection(stream, addr.to_string(), server_tx, registry, jwt, shutdown)
                                    .await;
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept bus connection: {e}");
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: String,
    server_tx: broadcast::Sender<BusMessage>,
    registry: Arc<SubscriptionRegistry>,
    jwt: Arc<JwtService>,
    shutdown: CancellationToken,
) {
    let conn_id = Uuid::new_v4().to_string();
    registry.register(&conn_id, &addr);
    tracing::info!(conn = %conn_id, %addr, "subscriber connected");

    let (mut read_half, mut write_half) = stream.into_split();
    let conn_token = shutdown.child_token();

    // Forward task: server events → this subscriber, filtered by interest
    let mut rx = server_tx.subscribe();
    let fwd_registry = registry.clone();
    let fwd_conn = conn_id.clone();
    let fwd_token = conn_token.clone();
    let forward = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = fwd_token.cancelled() => break,

                result = rx.recv() => match result {
                    Ok(msg) => {
                        if !msg.is_server_event() {
                            continue;
                        }
                        if !fwd_registry.is_joined(&fwd_conn, msg.queue_id) {
                            continue;
                        }
                        if codec::write_frame(&mut write_half, &msg).await.is_err() {
                            break;
                        }
                    }
                    // At-most-once: a slow subscriber just misses events and
                    // heals on its next poll
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(conn = %fwd_conn, skipped, "subscriber lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    });

    // Read loop: control frames from the subscriber
    loop {
        tokio::select! {
            _ = conn_token.cancelled() => break,

            frame = codec::read_frame(&mut read_half) => match frame {
                Ok(msg) => match msg.event_type {
                    EventType::Handshake => {
                        let payload = msg
                            .handshake_payload()
                            .unwrap_or_else(HandshakePayload::public);
                        if payload.is_staff() {
                            let claims = payload
                                .token
                                .as_deref()
                                .and_then(|t| jwt.validate_token(t).ok());
                            match claims {
                                Some(claims) => {
                                    registry.set_tier(&conn_id, Tier::Staff);
                                    tracing::info!(conn = %conn_id, user = %claims.username, "staff subscriber authenticated");
                                }
                                None => {
                                    tracing::warn!(conn = %conn_id, "staff handshake rejected, closing");
                                    break;
                                }
                            }
                        }
                    }
                    EventType::JoinQueue => {
                        registry.join(&conn_id, msg.queue_id);
                        tracing::debug!(conn = %conn_id, queue_id = msg.queue_id, "joined queue");
                    }
                    EventType::LeaveQueue => {
                        registry.leave(&conn_id, msg.queue_id);
                        tracing::debug!(conn = %conn_id, queue_id = msg.queue_id, "left queue");
                    }
                    other => {
                        tracing::debug!(conn = %conn_id, event = %other, "ignoring server event from client");
                    }
                },
                Err(e) => {
                    tracing::info!(conn = %conn_id, "subscriber disconnected: {e}");
                    break;
                }
            }
        }
    }

    conn_token.cancel();
    registry.remove(&conn_id);
    let _ = forward.await;
    tracing::info!(conn = %conn_id, "subscriber cleaned up");
}
