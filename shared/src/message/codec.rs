//! 总线线协议编解码
//!
//! Frame layout (little-endian):
//!
//! ```text
//! [event_type u8][queue_id i64][payload_len u32][payload]
//! ```
//!
//! Both the server accept loop and bus clients (bridge, consoles) use these
//! helpers, so the two sides cannot drift apart.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{BusMessage, EventType};

/// Fixed header size: type (1) + queue id (8) + payload length (4)
pub const HEADER_LEN: usize = 13;

/// Upper bound on payload size; anything larger is a protocol violation
pub const MAX_PAYLOAD: usize = 256 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown event type: {0}")]
    UnknownEventType(u8),

    #[error("frame payload too large: {0} bytes")]
    Oversize(usize),
}

/// Read one frame from the stream
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<BusMessage, CodecError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;

    let event_type =
        EventType::try_from(header[0]).map_err(|_| CodecError::UnknownEventType(header[0]))?;
    let queue_id = i64::from_le_bytes(header[1..9].try_into().expect("8-byte slice"));
    let len = u32::from_le_bytes(header[9..13].try_into().expect("4-byte slice")) as usize;

    if len > MAX_PAYLOAD {
        return Err(CodecError::Oversize(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(BusMessage::new(event_type, queue_id, payload))
}

/// Write one frame to the stream
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> Result<(), CodecError> {
    let mut data = Vec::with_capacity(HEADER_LEN + msg.payload.len());
    data.push(msg.event_type as u8);
    data.extend_from_slice(&msg.queue_id.to_le_bytes());
    data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&msg.payload);

    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}
