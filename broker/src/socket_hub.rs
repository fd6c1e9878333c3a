//! Registry of connected full-duplex socket clients, each with an
//! independent outbound queue and a subscription set of identifiers.
//!
//! The hub is the single owner of the registry; network tasks hold only a
//! send handle and a client id, never a reference back into the map.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use signer_protocol::WsMessage;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Outbound queue depth per client. A full queue means the client is too
/// slow (or gone) and gets dropped rather than backpressuring the fan-out.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

struct ClientEntry {
    sender: mpsc::Sender<WsMessage>,
    subscriptions: Arc<RwLock<HashSet<Uuid>>>,
}

/// A connection task's handle into its own registry entry.
pub struct ClientHandle {
    pub client_id: Uuid,
    pub receiver: mpsc::Receiver<WsMessage>,
    subscriptions: Arc<RwLock<HashSet<Uuid>>>,
}

impl ClientHandle {
    pub async fn subscribe(&self, identifier: Uuid) {
        self.subscriptions.write().await.insert(identifier);
    }
}

#[derive(Clone, Default)]
pub struct SocketHub {
    clients: Arc<RwLock<HashMap<Uuid, ClientEntry>>>,
}

impl SocketHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self) -> ClientHandle {
        let client_id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let subscriptions = Arc::new(RwLock::new(HashSet::new()));
        self.clients.write().await.insert(
            client_id,
            ClientEntry {
                sender,
                subscriptions: subscriptions.clone(),
            },
        );
        ClientHandle {
            client_id,
            receiver,
            subscriptions,
        }
    }

    pub async fn unregister(&self, client_id: Uuid) {
        self.clients.write().await.remove(&client_id);
    }

    pub async fn connected_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Enqueues `message` on every client subscribed to `identifier`. A full
    /// outbound queue drops the offending subscriber; it never blocks the
    /// caller and never bubbles an error back.
    pub async fn broadcast(&self, identifier: Uuid, message: WsMessage) {
        let mut overflowed = Vec::new();
        {
            let clients = self.clients.read().await;
            for (client_id, entry) in clients.iter() {
                let is_subscribed = entry.subscriptions.read().await.contains(&identifier);
                if !is_subscribed {
                    continue;
                }
                if entry.sender.try_send(message.clone()).is_err() {
                    overflowed.push(*client_id);
                }
            }
        }
        if !overflowed.is_empty() {
            let mut clients = self.clients.write().await;
            for client_id in overflowed {
                clients.remove(&client_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signer_protocol::{error_codes, ErrorPayload, StatusPayload};

    #[tokio::test]
    async fn unsubscribed_client_receives_nothing() {
        let hub = SocketHub::new();
        let mut client = hub.register().await;
        let identifier = Uuid::new_v4();

        hub.broadcast(
            identifier,
            WsMessage::Status(StatusPayload {
                uuid: identifier,
                is_signed: false,
            }),
        )
        .await;

        assert!(client.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn subscribed_client_receives_a_broadcast_for_its_identifier_only() {
        let hub = SocketHub::new();
        let mut client = hub.register().await;
        let subscribed = Uuid::new_v4();
        let other = Uuid::new_v4();
        client.subscribe(subscribed).await;

        hub.broadcast(
            other,
            WsMessage::Status(StatusPayload {
                uuid: other,
                is_signed: false,
            }),
        )
        .await;
        assert!(client.receiver.try_recv().is_err());

        hub.broadcast(
            subscribed,
            WsMessage::Error(ErrorPayload {
                uuid: subscribed,
                code: error_codes::EXPIRED.to_owned(),
                reason: "expired".to_owned(),
            }),
        )
        .await;
        let received = client.receiver.try_recv().unwrap();
        assert_eq!(
            received,
            WsMessage::Error(ErrorPayload {
                uuid: subscribed,
                code: error_codes::EXPIRED.to_owned(),
                reason: "expired".to_owned(),
            })
        );
    }

    #[tokio::test]
    async fn overflowing_a_clients_outbound_queue_drops_it() {
        let hub = SocketHub::new();
        let client = hub.register().await;
        let identifier = Uuid::new_v4();
        client.subscribe(identifier).await;

        for _ in 0..OUTBOUND_QUEUE_DEPTH + 8 {
            hub.broadcast(
                identifier,
                WsMessage::Status(StatusPayload {
                    uuid: identifier,
                    is_signed: false,
                }),
            )
            .await;
        }

        assert_eq!(hub.connected_count().await, 0);
    }

    #[tokio::test]
    async fn unregister_removes_the_client_from_the_registry() {
        let hub = SocketHub::new();
        let client = hub.register().await;
        assert_eq!(hub.connected_count().await, 1);
        hub.unregister(client.client_id).await;
        assert_eq!(hub.connected_count().await, 0);
    }
}
