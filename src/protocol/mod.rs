//! Bridge wire protocol
//!
//! Length-prefixed frames between the ingestion side and a remote hub. A
//! connection carries request/response pairs (`Broadcast`, `Stats`) until it
//! sends `Subscribe`; after that the hub only writes `Event` frames to it.

pub mod constants;
pub mod frame;
pub mod io;
pub mod message;

pub use frame::{Frame, FrameDecoder, FrameKind};
pub use io::{write_frame, FrameReader};
pub use message::{EventHeader, Request, Response, StatsSnapshot};
