//! Async frame I/O

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

use super::frame::{Frame, FrameDecoder};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Buffered frame reader over any byte stream
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    decoder: FrameDecoder,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, max_body_size: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_BUFFER_SIZE),
            decoder: FrameDecoder::new(max_body_size),
        }
    }

    /// Read the next frame; `None` on a clean end of stream
    ///
    /// Cancel-safe: bytes already read stay buffered for the next call.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        loop {
            if let Some(frame) = self.decoder.decode(&mut self.buf)? {
                return Ok(Some(frame));
            }

            if self.inner.read_buf(&mut self.buf).await? == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(ProtocolError::Truncated);
            }
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }
}

/// Write one frame and flush
///
/// The body is written straight from its `Bytes` without copying it into
/// the head buffer.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut head = BytesMut::new();
    frame.encode_head(&mut head)?;

    writer.write_all(&head).await?;
    if !frame.body.is_empty() {
        writer.write_all(&frame.body).await?;
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::protocol::constants::DEFAULT_MAX_BODY_SIZE;
    use crate::protocol::frame::FrameKind;

    fn frame() -> Frame {
        Frame::new(
            FrameKind::Event,
            Bytes::from_static(b"{}"),
            Bytes::from_static(b"hello"),
        )
    }

    fn encoded(frame: &Frame) -> Vec<u8> {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf).unwrap();
        buf.to_vec()
    }

    #[tokio::test]
    async fn test_read_split_frame() {
        let bytes = encoded(&frame());
        let mock = tokio_test::io::Builder::new()
            .read(&bytes[..3])
            .read(&bytes[3..9])
            .read(&bytes[9..])
            .build();

        let mut reader = FrameReader::new(mock, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(reader.read_frame().await.unwrap(), Some(frame()));
        assert_eq!(reader.read_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_eof_mid_frame() {
        let bytes = encoded(&frame());
        let mock = tokio_test::io::Builder::new().read(&bytes[..7]).build();

        let mut reader = FrameReader::new(mock, DEFAULT_MAX_BODY_SIZE);
        assert!(matches!(
            reader.read_frame().await,
            Err(ProtocolError::Truncated)
        ));
    }

    #[tokio::test]
    async fn test_write_frame() {
        let bytes = encoded(&frame());
        let mut mock = tokio_test::io::Builder::new()
            .write(&bytes[..11])
            .write(&bytes[11..])
            .build();

        write_frame(&mut mock, &frame()).await.unwrap();
    }
}
