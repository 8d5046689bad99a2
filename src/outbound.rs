//! Outbound message delivery via the provider's Graph API.

use reqwest::Client;
use tracing::info;

use crate::broker::Broker;
use crate::config::DEFAULT_GRAPH_BASE_URL;
use crate::error::OutboundError;

/// Client for the WhatsApp Business Cloud API.
pub struct GraphClient {
    base_url: String,
    client: Client,
}

impl GraphClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_GRAPH_BASE_URL)
    }

    /// Point the client at a non-default API host (staging, tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: Client::new(),
        }
    }

    /// Send a plain text message from the broker's number.
    pub async fn send_text(
        &self,
        broker: &Broker,
        to: &str,
        body: &str,
    ) -> Result<(), OutboundError> {
        let token = broker
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(OutboundError::NotConfigured("access_token"))?;
        let phone_number_id = broker
            .phone_number_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(OutboundError::NotConfigured("phone_number_id"))?;

        let url = message_url(&self.base_url, &broker.api_version, phone_number_id);
        let payload = text_payload(to, body);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| OutboundError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(OutboundError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        info!(broker_id = %broker.id, to = to, "Outbound message sent");
        Ok(())
    }
}

impl Default for GraphClient {
    fn default() -> Self {
        Self::new()
    }
}

fn message_url(base_url: &str, api_version: &str, phone_number_id: &str) -> String {
    format!("{base_url}/v{api_version}/{phone_number_id}/messages")
}

fn text_payload(to: &str, body: &str) -> serde_json::Value {
    serde_json::json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "text",
        "text": {"body": body},
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{BrokerType, WebhookState};

    fn broker(access_token: Option<&str>, phone_number_id: Option<&str>) -> Broker {
        Broker {
            id: "b1".into(),
            name: "broker".into(),
            broker_type: BrokerType::WhatsApp,
            access_token: access_token.map(str::to_string),
            webhook_key: None,
            webhook_secret: None,
            verify_token: None,
            phone_number_id: phone_number_id.map(str::to_string),
            api_version: "15.0".into(),
            integration_state: WebhookState::Unset,
        }
    }

    #[test]
    fn url_includes_version_and_number() {
        assert_eq!(
            message_url("https://graph.facebook.com", "15.0", "4321"),
            "https://graph.facebook.com/v15.0/4321/messages"
        );
    }

    #[test]
    fn payload_shape_matches_the_api() {
        let payload = text_payload("1234", "DEMO");
        assert_eq!(payload["messaging_product"], "whatsapp");
        assert_eq!(payload["to"], "1234");
        assert_eq!(payload["type"], "text");
        assert_eq!(payload["text"]["body"], "DEMO");
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let client = GraphClient::with_base_url("http://127.0.0.1:9");

        let err = client
            .send_text(&broker(None, Some("4321")), "1234", "DEMO")
            .await
            .unwrap_err();
        assert!(matches!(err, OutboundError::NotConfigured("access_token")));

        let err = client
            .send_text(&broker(Some("tok"), None), "1234", "DEMO")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OutboundError::NotConfigured("phone_number_id")
        ));
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        let client = GraphClient::with_base_url("http://localhost:8081/");
        assert_eq!(client.base_url, "http://localhost:8081");
    }
}
