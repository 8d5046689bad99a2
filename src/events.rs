//! Broadcast bus for gateway events.
//!
//! The ingestion pipeline announces stored messages here; downstream
//! consumers (notifiers, UI refresh) subscribe independently. Sending with
//! no receivers is fine.

use tokio::sync::broadcast;

use crate::store::{Channel, StoredMessage};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// An event emitted by the gateway.
#[derive(Debug, Clone)]
pub enum BrokerEvent {
    /// A new inbound message was persisted.
    MessageCreated {
        broker_id: String,
        channel_id: String,
        message_id: String,
        external_id: String,
        sender: String,
    },
}

/// Fan-out handle for gateway events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BrokerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self { tx }
    }

    /// Subscribe to gateway events. Each consumer calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<BrokerEvent> {
        self.tx.subscribe()
    }

    /// Announce a freshly stored message.
    pub fn message_created(&self, channel: &Channel, message: &StoredMessage) {
        let _ = self.tx.send(BrokerEvent::MessageCreated {
            broker_id: channel.broker_id.clone(),
            channel_id: channel.id.clone(),
            message_id: message.id.clone(),
            external_id: message.external_id.clone(),
            sender: message.sender.clone(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
