//! Message ingestion pipeline.
//!
//! Runs only after signature verification. Walks the envelope's
//! entry/changes layers, resolves the owning channel per message and
//! persists each one idempotently. Individual bad messages are dropped
//! while their siblings continue.

use tracing::{debug, info, warn};

use crate::broker::Broker;
use crate::error::Error;
use crate::events::EventBus;
use crate::ingest::payload::WebhookEnvelope;
use crate::ingest::resolver::resolve_channel;
use crate::store::{ChannelStore, MessageStore};

/// Change field carrying message events; everything else is ignored.
const MESSAGES_FIELD: &str = "messages";

/// Tally of what one envelope produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Messages newly persisted.
    pub stored: usize,
    /// Replayed deliveries absorbed by the idempotence key.
    pub duplicates: usize,
    /// Messages dropped for missing ids or unsupported content.
    pub skipped: usize,
}

/// Ingestion pipeline over the channel and message stores.
#[derive(Clone)]
pub struct Ingestor {
    channels: ChannelStore,
    messages: MessageStore,
    events: EventBus,
}

impl Ingestor {
    pub fn new(channels: ChannelStore, messages: MessageStore, events: EventBus) -> Self {
        Self {
            channels,
            messages,
            events,
        }
    }

    /// Ingest a verified envelope on behalf of `broker`.
    pub async fn ingest(
        &self,
        broker: &Broker,
        envelope: WebhookEnvelope,
    ) -> Result<IngestOutcome, Error> {
        let mut outcome = IngestOutcome::default();

        for entry in &envelope.entry {
            for change in &entry.changes {
                if change.field != MESSAGES_FIELD {
                    debug!(field = %change.field, "Ignoring non-message change");
                    continue;
                }
                let Some(value) = &change.value else {
                    continue;
                };

                for message in &value.messages {
                    if message.sender.is_empty() || message.id.is_empty() {
                        warn!(entry_id = %entry.id, "Message without sender or id dropped");
                        outcome.skipped += 1;
                        continue;
                    }
                    let Some(body) = message.body() else {
                        debug!(
                            external_id = %message.id,
                            kind = %message.kind,
                            "Unsupported message content dropped"
                        );
                        outcome.skipped += 1;
                        continue;
                    };

                    let display_name = value.contact_name(&message.sender).unwrap_or(&message.sender);
                    let channel =
                        resolve_channel(&self.channels, broker, &message.sender, display_name)
                            .await?;

                    match self
                        .messages
                        .insert(
                            &channel.id,
                            &message.id,
                            &message.sender,
                            body,
                            message.timestamp.as_deref(),
                        )
                        .await?
                    {
                        Some(stored) => {
                            info!(
                                broker_id = %broker.id,
                                channel_id = %channel.id,
                                external_id = %stored.external_id,
                                sender = %stored.sender,
                                "Inbound message stored"
                            );
                            self.events.message_created(&channel, &stored);
                            outcome.stored += 1;
                        }
                        None => outcome.duplicates += 1,
                    }
                }
            }
        }

        Ok(outcome)
    }
}
