//! Registry of one-way event-stream consumers keyed by identifier. Each
//! identifier gets its own `broadcast` channel lazily; any number of
//! consumers can subscribe to the same identifier, each getting an
//! independent receiver (and therefore an independent `consumer_id` assigned
//! at registration time by the HTTP handler, not by this module).

use std::collections::HashMap;
use std::sync::Arc;

use signer_protocol::StreamEventName;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Channel depth per identifier. Generous because event volume per signing
/// request is tiny (a handful of heartbeats plus one terminal event).
const CHANNEL_DEPTH: usize = 32;

/// One event-stream frame, already rendered to its `data:` line by the
/// emitting call site; `name` becomes the frame's `event:` line.
#[derive(Debug, Clone)]
pub struct StreamEvent {
    pub name: StreamEventName,
    pub json: String,
}

#[derive(Clone, Default)]
pub struct EventHub {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<StreamEvent>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the channel for `identifier`, creating it if this is the
    /// first subscriber.
    pub async fn get_or_create(&self, identifier: Uuid) -> broadcast::Sender<StreamEvent> {
        {
            let channels = self.channels.read().await;
            if let Some(tx) = channels.get(&identifier) {
                return tx.clone();
            }
        }
        let mut channels = self.channels.write().await;
        if let Some(tx) = channels.get(&identifier) {
            return tx.clone();
        }
        let (tx, _rx) = broadcast::channel(CHANNEL_DEPTH);
        channels.insert(identifier, tx.clone());
        tx
    }

    /// Broadcasts to existing subscribers only; does nothing if no consumer
    /// has ever opened a stream for `identifier` (there is nothing to
    /// deliver to, and no channel is created just to immediately discard).
    pub async fn broadcast(&self, identifier: Uuid, event: StreamEvent) {
        if let Some(tx) = self.channels.read().await.get(&identifier) {
            let _ = tx.send(event);
        }
    }

    /// Drops the channel for `identifier`. Safe to call even if consumers
    /// are still subscribed -- each holds its own `Receiver` clone and will
    /// simply stop receiving new events once the last `Sender` is dropped.
    pub async fn remove(&self, identifier: Uuid) {
        self.channels.write().await.remove(&identifier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_returns_the_same_sender_for_repeated_calls() {
        let hub = EventHub::new();
        let id = Uuid::new_v4();
        let first = hub.get_or_create(id).await;
        let second = hub.get_or_create(id).await;
        assert_eq!(first.receiver_count(), 0);
        // Same underlying channel: a receiver on one sees sends from the other.
        let mut rx = first.subscribe();
        second
            .send(StreamEvent {
                name: StreamEventName::Signed,
                json: "{}".to_owned(),
            })
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, StreamEventName::Signed);
    }

    #[tokio::test]
    async fn broadcast_to_an_identifier_with_no_subscribers_is_a_silent_no_op() {
        let hub = EventHub::new();
        hub.broadcast(
            Uuid::new_v4(),
            StreamEvent {
                name: StreamEventName::Signed,
                json: "{}".to_owned(),
            },
        )
        .await;
    }

    #[tokio::test]
    async fn multiple_consumers_on_the_same_identifier_each_get_the_event() {
        let hub = EventHub::new();
        let id = Uuid::new_v4();
        let tx = hub.get_or_create(id).await;
        let mut consumer_a = tx.subscribe();
        let mut consumer_b = tx.subscribe();

        hub.broadcast(
            id,
            StreamEvent {
                name: StreamEventName::Heartbeat,
                json: "{}".to_owned(),
            },
        )
        .await;

        assert_eq!(consumer_a.recv().await.unwrap().name, StreamEventName::Heartbeat);
        assert_eq!(consumer_b.recv().await.unwrap().name, StreamEventName::Heartbeat);
    }
}
