//! Length-prefixed frame encoding/decoding
//!
//! Wire format: [4-byte big-endian length][JSON payload]
//! Maximum frame size: 256KB (sanity limit)

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::Message;

/// Maximum allowed frame size (256KB)
pub const MAX_FRAME_SIZE: u32 = 256 * 1024;

fn closed_on_eof(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::ConnectionClosed
    } else {
        Error::Io(e)
    }
}

/// Read a length-prefixed frame from a stream
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Message> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(closed_on_eof)?;

    let len = u32::from_be_bytes(len_buf);
    if len == 0 {
        return Err(Error::Protocol("Empty frame".into()));
    }
    if len > MAX_FRAME_SIZE {
        return Err(Error::Protocol(format!(
            "Frame too large: {} bytes (max {})",
            len, MAX_FRAME_SIZE
        )));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.map_err(closed_on_eof)?;

    Message::from_bytes(&payload).map_err(|e| Error::Protocol(format!("Invalid JSON: {}", e)))
}

/// Write a length-prefixed frame to a stream
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, msg: &Message) -> Result<()> {
    let payload = msg
        .to_bytes()
        .map_err(|e| Error::Protocol(format!("Serialization failed: {}", e)))?;

    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_SIZE)
        .ok_or_else(|| {
            Error::Protocol(format!(
                "Message too large: {} bytes (max {})",
                payload.len(),
                MAX_FRAME_SIZE
            ))
        })?;

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;

    Ok(())
}

/// Writer task - drains the queue onto the stream until the queue closes
pub(crate) async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::Receiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &msg).await {
            debug!(error = %e, "Write failed");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let msg = Message::Hello {
            client: "front-desk".to_string(),
            admin_token: None,
        };

        let mut buf = Vec::new();
        write_frame(&mut buf, &msg).await.unwrap();
        assert_eq!(&buf[..4], &((buf.len() - 4) as u32).to_be_bytes());

        let mut cursor = Cursor::new(buf);
        match read_frame(&mut cursor).await.unwrap() {
            Message::Hello { client, admin_token } => {
                assert_eq!(client, "front-desk");
                assert!(admin_token.is_none());
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_frame_rejected() {
        let mut cursor = Cursor::new(vec![0, 0, 0, 0]);
        let result = read_frame(&mut cursor).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let len = (MAX_FRAME_SIZE + 1).to_be_bytes();
        let mut cursor = Cursor::new(len.to_vec());
        let result = read_frame(&mut cursor).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_truncated_frame_is_closed_connection() {
        let mut bytes = 10u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"{\"ty");
        let mut cursor = Cursor::new(bytes);
        let result = read_frame(&mut cursor).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_garbage_payload_rejected() {
        let mut bytes = 3u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"abc");
        let mut cursor = Cursor::new(bytes);
        let result = read_frame(&mut cursor).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }
}
