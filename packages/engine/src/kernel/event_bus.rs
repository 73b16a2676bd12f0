//! In-process event bus.
//!
//! Engine operations return their emitted events as values; the runtime
//! pushes them onto this bus and a single dispatch loop delivers them to
//! observers. Emitting never blocks the emitting transition.

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::common::{EventId, ServiceId};
use crate::domains::moderation::events::ModerationEvent;
use crate::domains::status::events::StatusEvent;

/// Union of all domain events flowing through the bus.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Status(StatusEvent),
    Moderation(ModerationEvent),
}

impl EngineEvent {
    pub fn event_id(&self) -> EventId {
        match self {
            EngineEvent::Status(event) => event.event_id(),
            EngineEvent::Moderation(event) => event.event_id(),
        }
    }

    pub fn service_id(&self) -> ServiceId {
        match self {
            EngineEvent::Status(event) => event.service_id(),
            EngineEvent::Moderation(event) => event.service_id(),
        }
    }
}

impl From<StatusEvent> for EngineEvent {
    fn from(event: StatusEvent) -> Self {
        EngineEvent::Status(event)
    }
}

impl From<ModerationEvent> for EngineEvent {
    fn from(event: ModerationEvent) -> Self {
        EngineEvent::Moderation(event)
    }
}

/// Message on the dispatch channel. Flush markers let callers wait for
/// everything ahead of them to be processed.
#[derive(Debug)]
pub enum BusMessage {
    Event(EngineEvent),
    Flush(oneshot::Sender<()>),
}

/// Cloneable sender half of the bus.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<BusMessage>,
}

impl EventBus {
    /// Create a bus and the receiver the dispatch loop consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BusMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Fire-and-forget emit. A missing dispatch loop is logged, not fatal.
    pub fn emit(&self, event: impl Into<EngineEvent>) {
        if self.tx.send(BusMessage::Event(event.into())).is_err() {
            warn!("Event dropped, dispatch loop is not running");
        }
    }

    pub fn emit_all<E: Into<EngineEvent>>(&self, events: impl IntoIterator<Item = E>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Wait until every message enqueued before this call has been
    /// processed. Returns immediately if the loop is gone.
    pub async fn settle(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(BusMessage::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (bus, mut rx) = EventBus::channel();

        let first = StatusEvent::ServiceFlaggedStale {
            event_id: EventId::new(),
            service_id: ServiceId::new(),
            manager_id: crate::common::UserId::new(),
            last_capacity_update: chrono::Utc::now(),
            flagged_at: chrono::Utc::now(),
        };
        let first_id = first.event_id();
        bus.emit(first);

        match rx.recv().await.unwrap() {
            BusMessage::Event(event) => assert_eq!(event.event_id(), first_id),
            BusMessage::Flush(_) => panic!("expected event"),
        }
    }

    #[tokio::test]
    async fn test_settle_acks_after_prior_messages() {
        let (bus, mut rx) = EventBus::channel();

        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let BusMessage::Flush(ack) = msg {
                    let _ = ack.send(());
                }
            }
        });

        bus.settle().await;
        drop(bus);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_emit_without_loop_does_not_panic() {
        let (bus, rx) = EventBus::channel();
        drop(rx);
        bus.emit(StatusEvent::ServiceFlaggedStale {
            event_id: EventId::new(),
            service_id: ServiceId::new(),
            manager_id: crate::common::UserId::new(),
            last_capacity_update: chrono::Utc::now(),
            flagged_at: chrono::Utc::now(),
        });
        bus.settle().await;
    }
}
