//! Scoped subscriber registration
//!
//! A [`Registration`] registers on creation and unregisters when released.
//! Sessions call [`Registration::release`] on every normal exit path; the
//! `Drop` impl covers panics and aborted tasks so the hub never keeps a dead
//! entry that would silently swallow broadcasts forever.

use std::sync::Arc;

use crate::artifact::UpdateEvent;

use super::store::BroadcastHub;
use super::subscriber::{QueueHandle, SubscriberFilter};

/// Live registration in a [`BroadcastHub`], removed when released or dropped
pub struct Registration {
    hub: Arc<BroadcastHub>,
    queue: QueueHandle,
    released: bool,
}

impl Registration {
    /// Register `subscriber_id` with `filter`
    pub async fn acquire(
        hub: Arc<BroadcastHub>,
        subscriber_id: impl Into<String>,
        filter: SubscriberFilter,
    ) -> Self {
        let queue = hub.register(subscriber_id, filter).await;

        Self {
            hub,
            queue,
            released: false,
        }
    }

    pub fn subscriber_id(&self) -> &str {
        self.queue.subscriber_id()
    }

    pub fn generation(&self) -> u64 {
        self.queue.generation()
    }

    /// Wait for the next queued event; `None` once the queue is closed
    pub async fn recv(&mut self) -> Option<Arc<UpdateEvent>> {
        self.queue.recv().await
    }

    /// Unregister now, returning whether this registration was still current
    pub async fn release(mut self) -> bool {
        self.released = true;
        self.hub
            .unregister_generation(self.queue.subscriber_id(), self.queue.generation())
            .await
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let id = self.queue.subscriber_id().to_string();
        let generation = self.queue.generation();

        if self.hub.try_unregister_generation(&id, generation).is_some() {
            return;
        }

        // Registry lock is busy: finish the removal on the runtime
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let hub = Arc::clone(&self.hub);
                handle.spawn(async move {
                    hub.unregister_generation(&id, generation).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    subscriber = %id,
                    generation = generation,
                    "Registration dropped outside runtime, entry left in hub"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_release_unregisters() {
        let hub = Arc::new(BroadcastHub::new());

        let registration = Registration::acquire(Arc::clone(&hub), "c1", SubscriberFilter::all()).await;
        assert_eq!(registration.subscriber_id(), "c1");
        assert_eq!(hub.active_count().await, 1);

        assert!(registration.release().await);
        assert_eq!(hub.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let hub = Arc::new(BroadcastHub::new());

        {
            let _registration =
                Registration::acquire(Arc::clone(&hub), "c1", SubscriberFilter::all()).await;
            assert_eq!(hub.active_count().await, 1);
        }

        assert_eq!(hub.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_panicking_task_unregisters() {
        let hub = Arc::new(BroadcastHub::new());
        let task_hub = Arc::clone(&hub);

        let result = tokio::spawn(async move {
            let _registration = Registration::acquire(task_hub, "c1", SubscriberFilter::all()).await;
            panic!("session failed");
        })
        .await;

        assert!(result.unwrap_err().is_panic());
        assert_eq!(hub.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_stale_release_keeps_newer() {
        let hub = Arc::new(BroadcastHub::new());

        let old = Registration::acquire(Arc::clone(&hub), "c1", SubscriberFilter::all()).await;
        let new = Registration::acquire(Arc::clone(&hub), "c1", SubscriberFilter::all()).await;

        assert!(!old.release().await);
        assert_eq!(hub.list_subscribers().await, vec!["c1"]);

        assert!(new.release().await);
        assert_eq!(hub.active_count().await, 0);
    }
}
