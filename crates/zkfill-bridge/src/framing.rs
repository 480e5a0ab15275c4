//! Native-messaging wire framing.
//!
//! Each message is a 32-bit little-endian length prefix followed by that
//! many bytes of UTF-8 JSON — the framing browsers use to talk to native
//! hosts. Both the outbound client and the inbound host loop share these
//! functions.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{NativeError, Result};

/// Inbound frame size guard. Vault responses are small; anything beyond
/// this is a protocol violation, not data.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Write one framed JSON message.
pub async fn write_frame<W>(writer: &mut W, message: &Value) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(message)?;
    let len = u32::try_from(payload.len()).map_err(|_| NativeError::FrameTooLarge {
        len: payload.len(),
    })?;

    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed JSON message. Returns `None` on a clean EOF before the
/// length prefix.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Value>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(NativeError::FrameTooLarge { len });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    let value = serde_json::from_slice(&payload)?;
    Ok(Some(value))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
