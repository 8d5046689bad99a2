//! Webhook registration state machine and the provider handshake.
//!
//! Lifecycle: `unset -> pending` when an operator arms the webhook,
//! `pending -> integrated` when the provider's GET challenge presents the
//! right verify token, back to `unset` when the webhook is disarmed. The
//! challenge is echoed for any token match, but the state only ever moves
//! out of `pending`.

use tracing::{debug, info, warn};

use crate::broker::{Broker, WebhookState};
use crate::error::{Error, WebhookError};
use crate::store::BrokerStore;

/// Arm a broker's webhook, moving it to `pending`.
pub async fn arm_webhook(brokers: &BrokerStore, broker: &Broker) -> Result<(), Error> {
    if !broker.can_set_webhook() {
        return Err(WebhookError::WebhookKeyMissing.into());
    }
    brokers
        .update_integration_state(&broker.id, WebhookState::Pending)
        .await?;
    info!(broker_id = %broker.id, "Webhook armed, awaiting provider handshake");
    Ok(())
}

/// Disarm a broker's webhook, clearing its integration state.
pub async fn disarm_webhook(brokers: &BrokerStore, broker: &Broker) -> Result<(), Error> {
    brokers
        .update_integration_state(&broker.id, WebhookState::Unset)
        .await?;
    info!(broker_id = %broker.id, "Webhook disarmed");
    Ok(())
}

/// Handle the provider's GET verification challenge.
///
/// The provided token must equal the broker's verify token exactly; on a
/// match the challenge is returned for verbatim echo and a `pending` broker
/// becomes `integrated`. A mismatch changes nothing and reports nothing
/// beyond the rejection.
pub async fn verify_challenge(
    brokers: &BrokerStore,
    broker: &Broker,
    provided_token: &str,
    challenge: &str,
) -> Result<String, Error> {
    let expected = broker.verify_token.as_deref().unwrap_or_default();
    if expected.is_empty() || provided_token != expected {
        warn!(broker_id = %broker.id, "Webhook verify token mismatch");
        return Err(WebhookError::VerificationFailed.into());
    }

    if brokers.try_mark_integrated(&broker.id).await? {
        info!(broker_id = %broker.id, "Webhook handshake completed, broker integrated");
    } else {
        debug!(
            broker_id = %broker.id,
            state = broker.integration_state.as_str(),
            "Handshake token accepted without state change"
        );
    }

    Ok(challenge.to_string())
}
