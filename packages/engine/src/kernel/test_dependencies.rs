// Test doubles for external collaborators.
//
// Provides a recording delivery channel that can be injected into
// EngineDeps for tests.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::common::UserId;
use crate::kernel::delivery::BaseDeliveryChannel;

/// One captured enqueue call.
#[derive(Debug, Clone)]
pub struct EnqueuedNotification {
    pub subscriber_id: UserId,
    pub payload: serde_json::Value,
    pub dedup_key: String,
}

/// Delivery channel that records every enqueue for assertions.
#[derive(Clone, Default)]
pub struct RecordingDeliveryChannel {
    sent: Arc<Mutex<Vec<EnqueuedNotification>>>,
}

impl RecordingDeliveryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured enqueues, in order.
    pub fn sent(&self) -> Vec<EnqueuedNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Whether any enqueue targeted the given subscriber.
    pub fn was_notified(&self, subscriber_id: UserId) -> bool {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .any(|n| n.subscriber_id == subscriber_id)
    }

    /// Captured enqueues for one subscriber.
    pub fn sent_to(&self, subscriber_id: UserId) -> Vec<EnqueuedNotification> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.subscriber_id == subscriber_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BaseDeliveryChannel for RecordingDeliveryChannel {
    async fn enqueue(
        &self,
        subscriber_id: UserId,
        payload: serde_json::Value,
        dedup_key: &str,
    ) -> Result<()> {
        self.sent.lock().unwrap().push(EnqueuedNotification {
            subscriber_id,
            payload,
            dedup_key: dedup_key.to_string(),
        });
        Ok(())
    }
}
