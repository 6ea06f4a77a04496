//! Domain event broadcasting and the activity-feed recorder.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use fleet_domain::FleetEvent;
use fleet_persistence::{EventRepository, FleetStore};

/// Broadcast channel capacity
pub const CHANNEL_CAPACITY: usize = 1024;

/// Fan-out of engine events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FleetEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(&self, event: FleetEvent) {
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            debug!(title = event.title(), "No event subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

/// Append every received event to the store's activity feed.
///
/// Runs until every sender is dropped. Lagging behind the channel drops the
/// skipped events with a warning rather than stopping.
pub async fn record_events<S>(store: Arc<S>, mut rx: broadcast::Receiver<FleetEvent>)
where
    S: FleetStore + 'static,
{
    loop {
        match rx.recv().await {
            Ok(event) => {
                info!(event = %event, "{}", event.title());
                if let Err(e) = store.events().append(&event).await {
                    warn!(error = %e, "Failed to record fleet event");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event recorder lagged; events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("Event recorder stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fleet_persistence::InMemoryFleetStore;
    use uuid::Uuid;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(FleetEvent::ChargingFinished {
            drone_id: Uuid::new_v4(),
            at: Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_recorder_appends_until_closed() {
        let store = Arc::new(InMemoryFleetStore::new());
        let bus = EventBus::default();
        let recorder = tokio::spawn(record_events(store.clone(), bus.subscribe()));

        let drone_id = Uuid::new_v4();
        bus.publish(FleetEvent::ChargingFinished {
            drone_id,
            at: Utc::now(),
        });
        drop(bus);
        recorder.await.unwrap();

        let recent = store.events().recent(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].drone_id(), drone_id);
    }
}
