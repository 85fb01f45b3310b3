//! Frame encoding and incremental decoding
//!
//! ```text
//! +------+------------+-------------+-----------+-----------+
//! | kind | header_len |   header    | body_len  |   body    |
//! |  u8  |  u32 (BE)  |   (JSON)    | u32 (BE)  |  (bytes)  |
//! +------+------------+-------------+-----------+-----------+
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ProtocolError;
use crate::protocol::constants::*;

/// Frame type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Broadcast,
    Subscribe,
    Stats,
    BroadcastAccepted,
    Event,
    StatsSnapshot,
    Error,
}

impl FrameKind {
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            KIND_BROADCAST => Ok(FrameKind::Broadcast),
            KIND_SUBSCRIBE => Ok(FrameKind::Subscribe),
            KIND_STATS => Ok(FrameKind::Stats),
            KIND_BROADCAST_ACCEPTED => Ok(FrameKind::BroadcastAccepted),
            KIND_EVENT => Ok(FrameKind::Event),
            KIND_STATS_SNAPSHOT => Ok(FrameKind::StatsSnapshot),
            KIND_ERROR => Ok(FrameKind::Error),
            other => Err(ProtocolError::UnknownFrameKind(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            FrameKind::Broadcast => KIND_BROADCAST,
            FrameKind::Subscribe => KIND_SUBSCRIBE,
            FrameKind::Stats => KIND_STATS,
            FrameKind::BroadcastAccepted => KIND_BROADCAST_ACCEPTED,
            FrameKind::Event => KIND_EVENT,
            FrameKind::StatsSnapshot => KIND_STATS_SNAPSHOT,
            FrameKind::Error => KIND_ERROR,
        }
    }
}

/// One protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    /// Serialized JSON header (may be empty)
    pub header: Bytes,
    pub body: Bytes,
}

impl Frame {
    pub fn new(kind: FrameKind, header: Bytes, body: Bytes) -> Self {
        Self { kind, header, body }
    }

    /// Build a frame with `header` serialized as JSON
    pub fn with_header<T: Serialize>(
        kind: FrameKind,
        header: &T,
        body: Bytes,
    ) -> Result<Self, ProtocolError> {
        let header = serde_json::to_vec(header)?;
        if header.len() > MAX_HEADER_SIZE {
            return Err(ProtocolError::HeaderTooLarge {
                size: header.len(),
                max: MAX_HEADER_SIZE,
            });
        }

        Ok(Self::new(kind, Bytes::from(header), body))
    }

    /// Deserialize the JSON header
    pub fn parse_header<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_slice(&self.header)?)
    }

    /// Fail if the body is larger than `max` or than its length field holds
    pub fn check_body_size(&self, max: usize) -> Result<(), ProtocolError> {
        let max = max.min(u32::MAX as usize);
        if self.body.len() > max {
            return Err(ProtocolError::BodyTooLarge {
                size: self.body.len(),
                max,
            });
        }
        Ok(())
    }

    /// Everything before the body
    pub fn encode_head(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        let header_len =
            u32::try_from(self.header.len()).map_err(|_| ProtocolError::HeaderTooLarge {
                size: self.header.len(),
                max: u32::MAX as usize,
            })?;
        self.check_body_size(usize::MAX)?;

        buf.reserve(FRAME_PREFIX_LEN + self.header.len() + BODY_LEN_SIZE);
        buf.put_u8(self.kind.as_u8());
        buf.put_u32(header_len);
        buf.put_slice(&self.header);
        buf.put_u32(self.body.len() as u32);
        Ok(())
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        self.encode_head(buf)?;
        buf.put_slice(&self.body);
        Ok(())
    }

    pub fn encoded_len(&self) -> usize {
        FRAME_PREFIX_LEN + self.header.len() + BODY_LEN_SIZE + self.body.len()
    }
}

/// Incremental frame decoder
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    max_body_size: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BODY_SIZE)
    }
}

impl FrameDecoder {
    pub fn new(max_body_size: usize) -> Self {
        Self { max_body_size }
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Take one frame from the front of `buf`
    ///
    /// Returns `Ok(None)` and leaves `buf` untouched until a whole frame is
    /// buffered. Length fields are checked as soon as they arrive, so an
    /// oversize frame fails before its bytes are read.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        if buf.len() < FRAME_PREFIX_LEN {
            return Ok(None);
        }

        let kind = FrameKind::from_u8(buf[0])?;
        let header_len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
        if header_len > MAX_HEADER_SIZE {
            return Err(ProtocolError::HeaderTooLarge {
                size: header_len,
                max: MAX_HEADER_SIZE,
            });
        }

        let body_len_at = FRAME_PREFIX_LEN + header_len;
        if buf.len() < body_len_at + BODY_LEN_SIZE {
            return Ok(None);
        }

        let body_len = u32::from_be_bytes([
            buf[body_len_at],
            buf[body_len_at + 1],
            buf[body_len_at + 2],
            buf[body_len_at + 3],
        ]) as usize;
        if body_len > self.max_body_size {
            return Err(ProtocolError::BodyTooLarge {
                size: body_len,
                max: self.max_body_size,
            });
        }

        let total = body_len_at + BODY_LEN_SIZE + body_len;
        if buf.len() < total {
            buf.reserve(total - buf.len());
            return Ok(None);
        }

        buf.advance(FRAME_PREFIX_LEN);
        let header = buf.split_to(header_len).freeze();
        buf.advance(BODY_LEN_SIZE);
        let body = buf.split_to(body_len).freeze();

        Ok(Some(Frame { kind, header, body }))
    }
}
