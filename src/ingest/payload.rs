//! Serde types for the WhatsApp Business webhook envelope.
//!
//! The provider wraps events in entry/changes layers and omits any list it
//! has nothing for, so every collection defaults to empty: an envelope with
//! no messages parses cleanly and simply yields no work.

use serde::Deserialize;

use crate::error::WebhookError;

/// Top-level webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

/// One entry, scoped to a business account.
#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

/// A single change notification within an entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    pub value: Option<ChangeValue>,
}

/// The payload of a change.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messaging_product: String,
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

impl ChangeValue {
    /// Display name for a sender, resolved through the contacts list.
    pub fn contact_name(&self, wa_id: &str) -> Option<&str> {
        self.contacts
            .iter()
            .find(|c| c.wa_id == wa_id)
            .and_then(|c| c.profile.as_ref())
            .map(|p| p.name.as_str())
    }
}

/// Receiving-number metadata attached to a change.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub display_phone_number: String,
    #[serde(default)]
    pub phone_number_id: String,
}

/// Sender identity entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub wa_id: String,
    pub profile: Option<ContactProfile>,
}

/// Profile block of a contact.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactProfile {
    #[serde(default)]
    pub name: String,
}

/// One inbound message object.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Sender's external id.
    #[serde(default, rename = "from")]
    pub sender: String,
    /// Provider-assigned message id, the idempotence key.
    #[serde(default)]
    pub id: String,
    pub timestamp: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: String,
    pub text: Option<MessageText>,
}

impl InboundMessage {
    /// Text content, if this is a message kind we persist.
    pub fn body(&self) -> Option<&str> {
        self.text.as_ref().map(|t| t.body.as_str())
    }
}

/// Text payload of a message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageText {
    #[serde(default)]
    pub body: String,
}

/// Parse raw (already signature-verified) bytes into an envelope.
pub fn parse_envelope(raw: &[u8]) -> Result<WebhookEnvelope, WebhookError> {
    serde_json::from_slice(raw).map_err(|e| WebhookError::MalformedPayload(e.to_string()))
}
