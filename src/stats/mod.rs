//! Statistics and metrics

pub mod metrics;

pub(crate) use metrics::HubCounters;
pub use metrics::{HubStats, SessionStats};
