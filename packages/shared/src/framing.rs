//! Transport-level message framing.
//!
//! The protocol itself is a stream of discrete messages; the transport is
//! responsible for preserving their boundaries over TCP. Each message is
//! carried as a u32 little-endian byte length followed by the payload.
//! This prefix is a transport detail and not part of the packet contract.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single wire message. History dumps are the largest
/// legitimate messages; anything beyond this is a corrupt stream.
pub const MAX_WIRE_MESSAGE: usize = 16 * 1024 * 1024;

/// Write one length-delimited message.
pub async fn write_message<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u32_le(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

/// Read one length-delimited message.
///
/// Returns `Ok(None)` on a clean end of stream (the peer closed between
/// messages). A declared length above [`MAX_WIRE_MESSAGE`] is reported as
/// `InvalidData` so the connection can be dropped.
pub async fn read_message<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32_le().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };

    if len > MAX_WIRE_MESSAGE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("wire message too large: {len} bytes"),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        write_message(&mut a, b"hello").await.unwrap();
        write_message(&mut a, b"").await.unwrap();
        drop(a);

        assert_eq!(read_message(&mut b).await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!(read_message(&mut b).await.unwrap(), Some(Vec::new()));
        assert_eq!(read_message(&mut b).await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_length_is_invalid_data() {
        let (mut a, mut b) = tokio::io::duplex(64);

        a.write_u32_le((MAX_WIRE_MESSAGE + 1) as u32).await.unwrap();

        let err = read_message(&mut b).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn truncated_payload_is_an_error() {
        let (mut a, mut b) = tokio::io::duplex(64);

        a.write_u32_le(10).await.unwrap();
        a.write_all(b"abc").await.unwrap();
        drop(a);

        assert!(read_message(&mut b).await.is_err());
    }
}
