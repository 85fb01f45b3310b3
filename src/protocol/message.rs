//! Typed bridge messages
//!
//! Maps [`Request`] and [`Response`] values to and from [`Frame`]s. Update
//! events travel as an [`EventHeader`] plus the payload as the frame body,
//! so artifact bytes are never JSON-encoded.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::UpdateEvent;
use crate::blob::BlobPath;
use crate::error::ProtocolError;
use crate::hub::BroadcastReport;
use crate::session::SubscribeRequest;
use crate::stats::HubStats;

use super::constants::MAX_HEADER_SIZE;
use super::frame::{Frame, FrameKind};

/// Room left for subscriber IDs in a report or stats header
const LISTED_IDS_BUDGET: usize = MAX_HEADER_SIZE - 1024;

/// Metadata block of an update event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    pub name: String,
    pub version: String,
    pub checksum: String,
    pub size: u64,
    pub path: BlobPath,
    pub timestamp: DateTime<Utc>,
}

impl EventHeader {
    pub fn from_event(event: &UpdateEvent) -> Self {
        Self {
            name: event.name.clone(),
            version: event.version.clone(),
            checksum: event.checksum.clone(),
            size: event.size,
            path: event.path.clone(),
            timestamp: event.timestamp,
        }
    }

    /// Reattach the payload; its length must match `size`
    pub fn into_event(self, payload: Bytes) -> Result<UpdateEvent, ProtocolError> {
        if payload.len() as u64 != self.size {
            return Err(ProtocolError::InvalidMessage(format!(
                "{}@{} declares {} bytes, body has {}",
                self.name,
                self.version,
                self.size,
                payload.len()
            )));
        }

        Ok(UpdateEvent {
            name: self.name,
            version: self.version,
            checksum: self.checksum,
            size: self.size,
            path: self.path,
            payload,
            timestamp: self.timestamp,
        })
    }
}

/// Hub statistics as reported over the bridge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub active_subscribers: usize,
    /// Registered subscriber IDs, sorted
    ///
    /// Cut short when the IDs do not fit in one frame header;
    /// `active_subscribers` is always the full count.
    pub subscribers: Vec<String>,
    pub hub: HubStats,
}

/// Keep the leading IDs whose JSON encoding fits in `budget`
///
/// Returns how many were cut.
fn fit_ids(ids: &mut Vec<String>, budget: &mut usize) -> usize {
    let mut kept = 0;
    for id in ids.iter() {
        // Quoted and escaped, plus a separating comma
        let cost = serde_json::to_string(id).map_or(usize::MAX, |s| s.len() + 1);
        if cost > *budget {
            break;
        }
        *budget -= cost;
        kept += 1;
    }

    let cut = ids.len() - kept;
    ids.truncate(kept);
    cut
}

fn fit_report(report: &BroadcastReport) -> BroadcastReport {
    let mut report = report.clone();
    let mut budget = LISTED_IDS_BUDGET;
    report.omitted += fit_ids(&mut report.dropped, &mut budget);
    report.omitted += fit_ids(&mut report.closed, &mut budget);
    report
}

fn fit_snapshot(snapshot: &StatsSnapshot) -> StatsSnapshot {
    let mut snapshot = snapshot.clone();
    let mut budget = LISTED_IDS_BUDGET;
    fit_ids(&mut snapshot.subscribers, &mut budget);
    snapshot
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Frame carrying `event` with the given kind
fn event_frame(kind: FrameKind, event: &UpdateEvent) -> Result<Frame, ProtocolError> {
    Frame::with_header(kind, &EventHeader::from_event(event), event.payload.clone())
}

fn parse_event(frame: Frame) -> Result<UpdateEvent, ProtocolError> {
    let header: EventHeader = frame.parse_header()?;
    header.into_event(frame.body)
}

/// Client to hub
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Fan out a committed update
    Broadcast(UpdateEvent),
    /// Turn this connection into a subscriber stream
    Subscribe(SubscribeRequest),
    Stats,
}

impl Request {
    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        match self {
            Request::Broadcast(event) => event_frame(FrameKind::Broadcast, event),
            Request::Subscribe(request) => {
                Frame::with_header(FrameKind::Subscribe, request, Bytes::new())
            }
            Request::Stats => Ok(Frame::new(FrameKind::Stats, Bytes::new(), Bytes::new())),
        }
    }

    pub fn from_frame(frame: Frame) -> Result<Self, ProtocolError> {
        match frame.kind {
            FrameKind::Broadcast => Ok(Request::Broadcast(parse_event(frame)?)),
            FrameKind::Subscribe => Ok(Request::Subscribe(frame.parse_header()?)),
            FrameKind::Stats => Ok(Request::Stats),
            other => Err(ProtocolError::UnexpectedFrame(format!(
                "{:?} is not a request",
                other
            ))),
        }
    }
}

/// Hub to client
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    BroadcastAccepted(BroadcastReport),
    /// One update streamed to a subscriber
    Event(UpdateEvent),
    Stats(StatsSnapshot),
    Error(String),
}

impl Response {
    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        match self {
            Response::BroadcastAccepted(report) => Frame::with_header(
                FrameKind::BroadcastAccepted,
                &fit_report(report),
                Bytes::new(),
            ),
            Response::Event(event) => Self::event_frame(event),
            Response::Stats(snapshot) => Frame::with_header(
                FrameKind::StatsSnapshot,
                &fit_snapshot(snapshot),
                Bytes::new(),
            ),
            Response::Error(message) => Frame::with_header(
                FrameKind::Error,
                &ErrorBody {
                    message: message.clone(),
                },
                Bytes::new(),
            ),
        }
    }

    /// `Event` frame for a shared event, without cloning it into a `Response`
    pub fn event_frame(event: &UpdateEvent) -> Result<Frame, ProtocolError> {
        event_frame(FrameKind::Event, event)
    }

    pub fn from_frame(frame: Frame) -> Result<Self, ProtocolError> {
        match frame.kind {
            FrameKind::BroadcastAccepted => Ok(Response::BroadcastAccepted(frame.parse_header()?)),
            FrameKind::Event => Ok(Response::Event(parse_event(frame)?)),
            FrameKind::StatsSnapshot => Ok(Response::Stats(frame.parse_header()?)),
            FrameKind::Error => {
                let body: ErrorBody = frame.parse_header()?;
                Ok(Response::Error(body.message))
            }
            other => Err(ProtocolError::UnexpectedFrame(format!(
                "{:?} is not a response",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> UpdateEvent {
        UpdateEvent {
            name: "w1".into(),
            version: "1.0.0".into(),
            checksum: "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824".into(),
            size: 5,
            path: BlobPath::new("files/w1/1.0.0"),
            payload: Bytes::from_static(b"hello"),
            timestamp: DateTime::from_timestamp(1_800_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_broadcast_carries_payload_as_body() {
        let frame = Request::Broadcast(event()).to_frame().unwrap();

        assert_eq!(frame.kind, FrameKind::Broadcast);
        assert_eq!(frame.body, Bytes::from_static(b"hello"));

        let header: serde_json::Value = frame.parse_header().unwrap();
        assert_eq!(header["name"], "w1");
        assert_eq!(header["size"], 5);
        assert!(header.get("payload").is_none());

        assert_eq!(
            Request::from_frame(frame).unwrap(),
            Request::Broadcast(event())
        );
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let mut frame = Request::Broadcast(event()).to_frame().unwrap();
        frame.body = Bytes::from_static(b"hell");

        assert!(matches!(
            Request::from_frame(frame),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_subscribe_without_filter() {
        let frame = Frame::new(
            FrameKind::Subscribe,
            Bytes::from_static(br#"{"subscriber_id":"c1"}"#),
            Bytes::new(),
        );

        assert_eq!(
            Request::from_frame(frame).unwrap(),
            Request::Subscribe(SubscribeRequest::new("c1"))
        );
    }

    #[test]
    fn test_error_response() {
        let frame = Response::Error("subscriber_id is required".into())
            .to_frame()
            .unwrap();

        assert_eq!(frame.kind, FrameKind::Error);
        assert_eq!(
            Response::from_frame(frame).unwrap(),
            Response::Error("subscriber_id is required".into())
        );
    }

    #[test]
    fn test_direction_enforced() {
        let response = Response::Stats(StatsSnapshot::default()).to_frame().unwrap();
        assert!(matches!(
            Request::from_frame(response),
            Err(ProtocolError::UnexpectedFrame(_))
        ));

        let request = Request::Stats.to_frame().unwrap();
        assert!(matches!(
            Response::from_frame(request),
            Err(ProtocolError::UnexpectedFrame(_))
        ));
    }

    #[test]
    fn test_large_report_fits_header() {
        let long = "x".repeat(200);
        let report = BroadcastReport {
            delivered: 3,
            dropped: (0..600).map(|i| format!("{}-{:04}", long, i)).collect(),
            closed: vec!["gone".into()],
            omitted: 0,
        };

        let frame = Response::BroadcastAccepted(report.clone()).to_frame().unwrap();
        assert!(frame.header.len() <= MAX_HEADER_SIZE);

        let Response::BroadcastAccepted(received) = Response::from_frame(frame).unwrap() else {
            panic!("expected a broadcast report");
        };
        assert_eq!(received.delivered, 3);
        assert!(received.dropped.len() < report.dropped.len());
        assert_eq!(received.dropped[..], report.dropped[..received.dropped.len()]);
        assert!(received.omitted > 0);
        assert_eq!(received.attempted(), report.attempted());
        assert!(!received.is_complete());
    }

    #[test]
    fn test_large_stats_fits_header() {
        let snapshot = StatsSnapshot {
            active_subscribers: 1000,
            subscribers: (0..1000).map(|i| format!("{:0>100}", i)).collect(),
            hub: HubStats::default(),
        };

        let frame = Response::Stats(snapshot).to_frame().unwrap();
        assert!(frame.header.len() <= MAX_HEADER_SIZE);

        let Response::Stats(received) = Response::from_frame(frame).unwrap() else {
            panic!("expected a stats snapshot");
        };
        assert_eq!(received.active_subscribers, 1000);
        assert!(received.subscribers.len() < 1000);
    }

    #[test]
    fn test_small_report_unchanged() {
        let report = BroadcastReport {
            delivered: 1,
            dropped: vec!["slow".into()],
            closed: vec![],
            omitted: 0,
        };

        let frame = Response::BroadcastAccepted(report.clone()).to_frame().unwrap();
        assert_eq!(
            Response::from_frame(frame).unwrap(),
            Response::BroadcastAccepted(report)
        );
    }
}
