// Delivery channel seam.
//
// The engine's only durable responsibility is a successful enqueue; the
// channel owns transport (email/push) and its own retry policy. Items carry
// a deterministic dedup key so downstream consumers can discard repeats.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::common::UserId;

/// Outbound delivery channel.
#[async_trait]
pub trait BaseDeliveryChannel: Send + Sync {
    /// Enqueue one notification for eventual delivery. At-least-once:
    /// the same dedup key may be enqueued more than once.
    async fn enqueue(
        &self,
        subscriber_id: UserId,
        payload: serde_json::Value,
        dedup_key: &str,
    ) -> Result<()>;
}

/// Default sink that just logs the enqueue. Useful for development and for
/// deployments where delivery is wired up later.
pub struct TracingDeliveryChannel;

#[async_trait]
impl BaseDeliveryChannel for TracingDeliveryChannel {
    async fn enqueue(
        &self,
        subscriber_id: UserId,
        payload: serde_json::Value,
        dedup_key: &str,
    ) -> Result<()> {
        info!(
            subscriber_id = %subscriber_id,
            dedup_key = dedup_key,
            payload = %payload,
            "Notification enqueued"
        );
        Ok(())
    }
}
