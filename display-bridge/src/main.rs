//! Display Bridge - 硬件号码显示桥接器
//!
//! Binds one queue to a numeric display device behind a TCP serial gateway.
//!
//! Downstream of the event feed: `ticket-called` pushes the zero-padded
//! number to the device, `queue-reset` blanks it. Upstream, the device's
//! buttons invoke the same REST operations the staff console uses: `C`
//! calls the next ticket; `N` either claims a kiosk ticket or, in staff
//! mode, resolves the current ticket and calls the next.
//!
//! Pushed events are at-most-once, so the bridge also re-syncs the full
//! queue state on an interval — either path alone keeps the display
//! eventually correct.

mod config;
mod device;
mod rest;

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use shared::message::{BusMessage, EventType, HandshakePayload, codec};
use shared::models::{Ticket, TicketStatus};

use config::{BridgeConfig, BridgeMode};
use device::{DeviceWriter, SIGNAL_CALL, SIGNAL_NEXT};
use rest::ApiClient;

/// Reconnect delay for both the bus and the device link
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Debounce window for the device's N button
const NEXT_DEBOUNCE: Duration = Duration::from_millis(400);

struct Bridge {
    config: BridgeConfig,
    api: ApiClient,
    /// Ticket currently being served, as far as the bridge knows
    current: Mutex<Option<Ticket>>,
    device: DeviceWriter,
    last_next: Mutex<Option<Instant>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = BridgeConfig::from_env()?;
    tracing::info!(
        queue_id = config.queue_id,
        mode = ?config.mode,
        "display bridge starting"
    );

    let api = ApiClient::new(&config)?;
    let bridge = Arc::new(Bridge {
        api,
        current: Mutex::new(None),
        device: Arc::new(Mutex::new(None)),
        last_next: Mutex::new(None),
        config,
    });

    {
        let bridge = bridge.clone();
        tokio::spawn(async move { device_loop(bridge).await });
    }
    {
        let bridge = bridge.clone();
        tokio::spawn(async move { bus_loop(bridge).await });
    }
    {
        let bridge = bridge.clone();
        tokio::spawn(async move { resync_loop(bridge).await });
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("display bridge shutting down");
    Ok(())
}

/// Subscribe to the queue's event feed, reconnecting forever
async fn bus_loop(bridge: Arc<Bridge>) {
    loop {
        match TcpStream::connect(&bridge.config.bus_addr).await {
            Ok(mut stream) => {
                tracing::info!(addr = %bridge.config.bus_addr, "bus connected");

                let hello = BusMessage::handshake(&HandshakePayload::public());
                let join = BusMessage::join_queue(bridge.config.queue_id);
                if codec::write_frame(&mut stream, &hello).await.is_err()
                    || codec::write_frame(&mut stream, &join).await.is_err()
                {
                    tracing::warn!("bus handshake failed, retrying");
                    sleep(RETRY_DELAY).await;
                    continue;
                }

                // Catch up on whatever happened while disconnected
                resync_once(&bridge).await;

                loop {
                    match codec::read_frame(&mut stream).await {
                        Ok(msg) => handle_event(&bridge, msg).await,
                        Err(e) => {
                            tracing::warn!("bus read failed: {e}");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(addr = %bridge.config.bus_addr, "bus connect failed: {e}");
            }
        }
        sleep(RETRY_DELAY).await;
    }
}

async fn handle_event(bridge: &Bridge, msg: BusMessage) {
    if msg.queue_id != bridge.config.queue_id {
        return;
    }
    match msg.event_type {
        EventType::TicketCalled => {
            if let Some(ticket) = msg.ticket() {
                tracing::info!(number = ticket.number, "ticket called");
                device::show(&bridge.device, &device::display_line(ticket.number)).await;
                *bridge.current.lock().await = Some(ticket);
            }
        }
        EventType::TicketUpdated => {
            if let Some(ticket) = msg.ticket() {
                let mut current = bridge.current.lock().await;
                let matches_current = current.as_ref().is_some_and(|c| c.id == ticket.id);
                if matches_current && ticket.status.is_terminal() {
                    *current = None;
                }
            }
        }
        EventType::QueueReset => {
            tracing::info!("queue reset");
            *bridge.current.lock().await = None;
            device::show(&bridge.device, &device::blank_line()).await;
        }
        // New claims and token rotations don't change the display
        _ => {}
    }
}

/// Keep the device link alive and translate its button signals
async fn device_loop(bridge: Arc<Bridge>) {
    loop {
        match TcpStream::connect(&bridge.config.device_addr).await {
            Ok(stream) => {
                tracing::info!(addr = %bridge.config.device_addr, "device connected");
                let (read_half, write_half) = stream.into_split();
                *bridge.device.lock().await = Some(write_half);

                // Repaint after reconnect
                if let Some(current) = bridge.current.lock().await.clone() {
                    device::show(&bridge.device, &device::display_line(current.number)).await;
                }

                let mut lines = BufReader::new(read_half).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => on_signal(&bridge, line.trim()).await,
                        Ok(None) => {
                            tracing::warn!("device closed the connection");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!("device read failed: {e}");
                            break;
                        }
                    }
                }
                *bridge.device.lock().await = None;
            }
            Err(e) => {
                tracing::warn!(addr = %bridge.config.device_addr, "device connect failed: {e}");
            }
        }
        sleep(RETRY_DELAY).await;
    }
}

async fn on_signal(bridge: &Bridge, signal: &str) {
    match signal {
        SIGNAL_NEXT => {
            // Hardware buttons bounce; ignore repeats inside the window
            {
                let mut last = bridge.last_next.lock().await;
                if last.is_some_and(|at| at.elapsed() < NEXT_DEBOUNCE) {
                    return;
                }
                *last = Some(Instant::now());
            }

            match bridge.config.mode {
                BridgeMode::Staff => {
                    tracing::info!("device signal N (staff mode)");
                    let current = bridge.current.lock().await.clone();
                    if let (Some(ticket), Some(status)) =
                        (current, bridge.config.serving_advance.as_status())
                    {
                        bridge
                            .api
                            .update_status(ticket.id, status, "Device auto-advance")
                            .await;
                        *bridge.current.lock().await = None;
                    }
                    bridge.api.call_next().await;
                }
                BridgeMode::Kiosk => {
                    tracing::info!("device signal N (kiosk mode) -> create ticket");
                    let code = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_millis().to_string())
                        .unwrap_or_else(|_| "0".into());
                    bridge.api.claim_kiosk_ticket(&code).await;
                }
            }
        }
        SIGNAL_CALL => {
            tracing::info!("device signal C -> call next");
            bridge.api.call_next().await;
        }
        other => {
            tracing::debug!("ignoring device line: {other}");
        }
    }
}

/// Poll the full queue state on an interval — the self-healing backstop
/// for dropped events
async fn resync_loop(bridge: Arc<Bridge>) {
    let interval = Duration::from_secs(bridge.config.resync_secs.max(1));
    loop {
        sleep(interval).await;
        resync_once(&bridge).await;
    }
}

async fn resync_once(bridge: &Bridge) {
    match bridge.api.queue_detail().await {
        Ok(detail) => {
            let serving = detail
                .tickets
                .into_iter()
                .find(|t| t.status == TicketStatus::Serving);

            let mut current = bridge.current.lock().await;
            match &serving {
                Some(ticket) => {
                    let changed = current.as_ref().map(|c| c.id) != Some(ticket.id);
                    if changed {
                        tracing::info!(number = ticket.number, "resync: serving ticket");
                        device::show(&bridge.device, &device::display_line(ticket.number)).await;
                    }
                }
                None => {
                    if current.is_some() {
                        tracing::info!("resync: nothing serving, blanking display");
                        device::show(&bridge.device, &device::blank_line()).await;
                    }
                }
            }
            *current = serving;
        }
        Err(e) => {
            tracing::warn!("resync failed: {e}");
        }
    }
}
