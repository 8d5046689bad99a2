//! Broker records and the provider/webhook enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Provider kind a broker talks to.
///
/// A closed set: adding a provider means adding a variant here plus its
/// dispatch arms (avatar, outbound), not runtime registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerType {
    Telegram,
    WhatsApp,
}

impl BrokerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerType::Telegram => "telegram",
            BrokerType::WhatsApp => "whatsapp",
        }
    }
}

impl fmt::Display for BrokerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrokerType {
    type Err = UnknownBrokerType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "telegram" => Ok(BrokerType::Telegram),
            "whatsapp" => Ok(BrokerType::WhatsApp),
            other => Err(UnknownBrokerType(other.to_string())),
        }
    }
}

/// Parse error for [`BrokerType`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown broker type: {0}")]
pub struct UnknownBrokerType(pub String);

/// Webhook integration state of a broker.
///
/// `Integrated` is only ever reached through a successful handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookState {
    Unset,
    Pending,
    Integrated,
}

impl WebhookState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookState::Unset => "unset",
            WebhookState::Pending => "pending",
            WebhookState::Integrated => "integrated",
        }
    }

    /// Parse the DB representation; unknown strings collapse to `Unset`.
    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => WebhookState::Pending,
            "integrated" => WebhookState::Integrated,
            _ => WebhookState::Unset,
        }
    }
}

/// A configured endpoint for one external messaging provider integration.
#[derive(Debug, Clone, Serialize)]
pub struct Broker {
    pub id: String,
    pub name: String,
    pub broker_type: BrokerType,
    /// Bearer token for outbound provider API calls.
    pub access_token: Option<String>,
    /// Public path segment webhooks are delivered under.
    pub webhook_key: Option<String>,
    /// HMAC key for inbound payload signatures.
    pub webhook_secret: Option<String>,
    /// Secret echoed back by the provider during the handshake.
    pub verify_token: Option<String>,
    /// Provider-side phone number id used as the outbound sender.
    pub phone_number_id: Option<String>,
    pub api_version: String,
    pub integration_state: WebhookState,
}

impl Broker {
    /// A broker with no webhook key has no public path and cannot be armed.
    pub fn can_set_webhook(&self) -> bool {
        self.webhook_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Fields for creating a broker; everything optional starts unset.
#[derive(Debug, Clone)]
pub struct NewBroker {
    pub name: String,
    pub broker_type: BrokerType,
    pub access_token: Option<String>,
    pub webhook_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub verify_token: Option<String>,
    pub phone_number_id: Option<String>,
    pub api_version: Option<String>,
}

impl NewBroker {
    pub fn new(name: impl Into<String>, broker_type: BrokerType) -> Self {
        Self {
            name: name.into(),
            broker_type,
            access_token: None,
            webhook_key: None,
            webhook_secret: None,
            verify_token: None,
            phone_number_id: None,
            api_version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_type_round_trips_through_str() {
        assert_eq!("whatsapp".parse::<BrokerType>().unwrap(), BrokerType::WhatsApp);
        assert_eq!("telegram".parse::<BrokerType>().unwrap(), BrokerType::Telegram);
        assert_eq!(BrokerType::WhatsApp.as_str(), "whatsapp");
        assert!("signal".parse::<BrokerType>().is_err());
    }

    #[test]
    fn unknown_webhook_state_collapses_to_unset() {
        assert_eq!(WebhookState::parse("integrated"), WebhookState::Integrated);
        assert_eq!(WebhookState::parse("bogus"), WebhookState::Unset);
    }

    #[test]
    fn can_set_webhook_requires_a_key() {
        let mut new = NewBroker::new("b", BrokerType::WhatsApp);
        new.webhook_key = Some("demo_hook".into());
        let broker = Broker {
            id: "x".into(),
            name: new.name.clone(),
            broker_type: new.broker_type,
            access_token: None,
            webhook_key: None,
            webhook_secret: None,
            verify_token: None,
            phone_number_id: None,
            api_version: "15.0".into(),
            integration_state: WebhookState::Unset,
        };
        assert!(!broker.can_set_webhook());
        let armed = Broker {
            webhook_key: new.webhook_key,
            ..broker
        };
        assert!(armed.can_set_webhook());
    }
}
