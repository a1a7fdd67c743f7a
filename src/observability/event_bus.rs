//! Storage event bus.
//!
//! The dispatcher publishes one [`StorageEvent`] per adapter call, after the
//! call has been served. The event names the backend that served it and,
//! for relational-mode calls answered from the record space, the fallback
//! reason. Subscribers use this to notice a degraded database without
//! polling the adapter.
//!
//! Publishing never blocks the adapter call. With no subscribers the event is
//! dropped; a subscriber that falls behind skips the oldest events.

use super::metrics::{EVENTS_DROPPED_TOTAL, EVENTS_LAGGED_TOTAL, EVENTS_PUBLISHED_TOTAL};
use crate::models::{EntityKind, StorageEvent};
use std::sync::OnceLock;
use tokio::sync::broadcast;

const DEFAULT_EVENT_BUS_CAPACITY: usize = 1024;

/// Broadcast channel carrying storage events to any number of subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StorageEvent>,
}

/// Receiver that only yields events accepted by its predicate.
pub struct FilteredReceiver<F> {
    receiver: broadcast::Receiver<StorageEvent>,
    predicate: F,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes the result of one adapter call.
    pub fn publish(&self, event: StorageEvent) {
        metrics::counter!(EVENTS_PUBLISHED_TOTAL, "type" => event.event_type()).increment(1);
        if self.sender.send(event).is_err() {
            metrics::counter!(EVENTS_DROPPED_TOTAL).increment(1);
        }
    }

    /// Subscribes to every event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.sender.subscribe()
    }

    /// Subscribes to events accepted by `predicate`.
    #[must_use]
    pub fn subscribe_filtered<F>(&self, predicate: F) -> FilteredReceiver<F>
    where
        F: Fn(&StorageEvent) -> bool,
    {
        FilteredReceiver {
            receiver: self.sender.subscribe(),
            predicate,
        }
    }

    /// Subscribes to one event type: `storage.served` or `storage.fallback`.
    #[must_use]
    pub fn subscribe_event_type(
        &self,
        event_type: &'static str,
    ) -> FilteredReceiver<impl Fn(&StorageEvent) -> bool> {
        self.subscribe_filtered(move |event| event.event_type() == event_type)
    }

    /// Subscribes to calls the file backend served in place of the database.
    #[must_use]
    pub fn subscribe_fallbacks(&self) -> FilteredReceiver<impl Fn(&StorageEvent) -> bool> {
        self.subscribe_filtered(|event| event.fallback.is_some())
    }

    /// Subscribes to calls on one entity.
    #[must_use]
    pub fn subscribe_entity(
        &self,
        entity: EntityKind,
    ) -> FilteredReceiver<impl Fn(&StorageEvent) -> bool> {
        self.subscribe_filtered(move |event| event.entity == entity)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&StorageEvent) -> bool,
{
    /// Waits for the next matching event.
    ///
    /// # Errors
    ///
    /// Returns `Closed` once every [`EventBus`] handle has been dropped.
    pub async fn recv(&mut self) -> Result<StorageEvent, broadcast::error::RecvError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if (self.predicate)(&event) => return Ok(event),
                Ok(_) => {},
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    metrics::counter!(EVENTS_LAGGED_TOTAL).increment(skipped);
                },
                Err(err) => return Err(err),
            }
        }
    }

    /// Returns the next buffered matching event without waiting.
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if (self.predicate)(&event) => return Some(event),
                Ok(_) => {},
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    metrics::counter!(EVENTS_LAGGED_TOTAL).increment(skipped);
                },
                Err(_) => return None,
            }
        }
    }
}

static GLOBAL_EVENT_BUS: OnceLock<EventBus> = OnceLock::new();

/// Process-wide bus used by [`PersistenceAdapter::new`](crate::PersistenceAdapter::new).
#[must_use]
pub fn global_event_bus() -> &'static EventBus {
    GLOBAL_EVENT_BUS.get_or_init(EventBus::default)
}
