//! Bridge protocol constants

/// Bytes before the header: kind (1) + header length (4)
pub const FRAME_PREFIX_LEN: usize = 5;

/// Size of the body length field
pub const BODY_LEN_SIZE: usize = 4;

/// Largest accepted JSON header
pub const MAX_HEADER_SIZE: usize = 64 * 1024;

/// Default largest accepted body (artifact payload)
pub const DEFAULT_MAX_BODY_SIZE: usize = 32 * 1024 * 1024;

// Request kinds (client -> hub)
pub const KIND_BROADCAST: u8 = 0x01;
pub const KIND_SUBSCRIBE: u8 = 0x02;
pub const KIND_STATS: u8 = 0x03;

// Response kinds (hub -> client)
pub const KIND_BROADCAST_ACCEPTED: u8 = 0x81;
pub const KIND_EVENT: u8 = 0x82;
pub const KIND_STATS_SNAPSHOT: u8 = 0x83;
pub const KIND_ERROR: u8 = 0xFF;
