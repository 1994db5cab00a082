//! Display device link
//!
//! The numeric display sits behind a TCP serial gateway (ser2net or
//! similar) speaking a line protocol:
//!
//! - bridge → device: `D,NNNN\n` — show a zero-padded ticket number
//! - device → bridge: `N\n` (next/new button), `C\n` (call button)

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

/// Shared handle to the device's write half; `None` while disconnected
pub type DeviceWriter = Arc<Mutex<Option<OwnedWriteHalf>>>;

/// Device signal: next/new button
pub const SIGNAL_NEXT: &str = "N";
/// Device signal: call button
pub const SIGNAL_CALL: &str = "C";

/// Render a ticket number for the display (zero-padded to 4)
pub fn display_line(number: i64) -> String {
    format!("D,{number:04}\n")
}

/// The blank display shown after a reset
pub fn blank_line() -> String {
    display_line(0)
}

/// Best-effort write to the device; a failed write just drops the update,
/// the reconnect loop will re-sync the display
pub async fn show(writer: &DeviceWriter, line: &str) {
    let mut guard = writer.lock().await;
    let result = match guard.as_mut() {
        Some(half) => half.write_all(line.as_bytes()).await,
        None => Ok(()),
    };
    if let Err(e) = result {
        tracing::warn!("device write failed: {e}");
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_four_digits() {
        assert_eq!(display_line(7), "D,0007\n");
        assert_eq!(display_line(42), "D,0042\n");
        assert_eq!(display_line(12345), "D,12345\n");
        assert_eq!(blank_line(), "D,0000\n");
    }
}
