//! Channel resolution: map a sender's external id onto its channel.

use crate::broker::Broker;
use crate::error::DatabaseError;
use crate::store::{Channel, ChannelStore};

/// Find the channel for `(broker, external_id)`, creating it on first
/// contact.
///
/// Creation is insert-or-ignore followed by a re-select, so two requests
/// racing on the same pair both end up with the one surviving row. The
/// display name only matters at creation; an existing channel keeps the
/// label it was created with.
pub async fn resolve_channel(
    channels: &ChannelStore,
    broker: &Broker,
    external_id: &str,
    display_name: &str,
) -> Result<Channel, DatabaseError> {
    if let Some(existing) = channels.find(&broker.id, external_id).await? {
        return Ok(existing);
    }

    channels
        .insert_if_absent(&broker.id, external_id, display_name)
        .await?;

    channels
        .find(&broker.id, external_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "channel",
            id: format!("{}:{external_id}", broker.id),
        })
}
