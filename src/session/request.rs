//! Subscribe request

use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;
use crate::hub::SubscriberFilter;

/// Parameters for opening a subscription
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    /// Unique per active session
    pub subscriber_id: String,

    /// Artifact names to receive; empty receives everything
    #[serde(default)]
    pub artifact_names: Vec<String>,
}

impl SubscribeRequest {
    pub fn new(subscriber_id: impl Into<String>) -> Self {
        Self {
            subscriber_id: subscriber_id.into(),
            artifact_names: Vec::new(),
        }
    }

    /// Restrict the subscription to the given artifact names
    pub fn with_artifacts<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artifact_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), InvalidInput> {
        if self.subscriber_id.is_empty() {
            return Err(InvalidInput::required("subscriber_id"));
        }
        Ok(())
    }

    pub fn filter(&self) -> SubscriberFilter {
        SubscriberFilter::names(self.artifact_names.iter().cloned())
    }
}
