//! Integration tests for the webhook HTTP surface.
//!
//! Each test spins up the real router on a random port and drives it with
//! reqwest the way the provider would: a GET handshake, then signed POST
//! deliveries.

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::net::TcpListener;
use tokio::time::timeout;

use msgbridge::broker::{Broker, BrokerType, NewBroker, WebhookState};
use msgbridge::events::EventBus;
use msgbridge::ingest::Ingestor;
use msgbridge::store::{BrokerStore, ChannelStore, Database, MessageStore};
use msgbridge::webhook::{AppState, handshake, webhook_routes};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const WEBHOOK_KEY: &str = "demo_hook";
const WEBHOOK_SECRET: &str = "MY-SECRET";
const VERIFY_TOKEN: &str = "key";

const MESSAGE_01: &str = r#"{
    "object": "whatsapp_business_account",
    "entry": [{
        "id": "WHATSAPP_BUSINESS_ACCOUNT_ID",
        "changes": [{
            "value": {
                "messaging_product": "whatsapp",
                "metadata": {"display_phone_number": "1234", "phone_number_id": "1234"},
                "contacts": [{"profile": {"name": "NAME"}, "wa_id": "1234"}],
                "messages": [{
                    "from": "1234",
                    "id": "wamid.ID",
                    "timestamp": "1234",
                    "text": {"body": "MESSAGE_BODY"},
                    "type": "text"
                }]
            },
            "field": "messages"
        }]
    }]
}"#;

struct TestServer {
    base_url: String,
    brokers: BrokerStore,
    channels: ChannelStore,
    messages: MessageStore,
    broker: Broker,
}

impl TestServer {
    fn update_url(&self) -> String {
        format!("{}/broker/whatsapp/{WEBHOOK_KEY}/update", self.base_url)
    }

    async fn broker_state(&self) -> WebhookState {
        self.brokers
            .get(&self.broker.id)
            .await
            .unwrap()
            .unwrap()
            .integration_state
    }

    /// Arm the webhook and complete the provider handshake.
    async fn integrate(&self) {
        handshake::arm_webhook(&self.brokers, &self.broker)
            .await
            .unwrap();
        let response = reqwest::get(format!(
            "{}?hub.verify_token={VERIFY_TOKEN}&hub.challenge=22",
            self.update_url()
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(self.broker_state().await, WebhookState::Integrated);
    }

    /// POST a payload; `signature` is the raw header value, if any.
    async fn post_update(&self, payload: &str, signature: Option<String>) -> reqwest::Response {
        let client = reqwest::Client::new();
        let mut request = client
            .post(self.update_url())
            .header("Content-Type", "application/json")
            .body(payload.to_string());
        if let Some(signature) = signature {
            request = request.header("x-hub-signature-256", signature);
        }
        request.send().await.unwrap()
    }
}

/// Start the router on a random port with one configured WhatsApp broker.
async fn start_server() -> TestServer {
    let db = Arc::new(Database::open_in_memory().await.unwrap());
    let brokers = BrokerStore::new(Arc::clone(&db));
    let channels = ChannelStore::new(Arc::clone(&db));
    let messages = MessageStore::new(Arc::clone(&db));

    let mut new = NewBroker::new("broker", BrokerType::WhatsApp);
    new.access_token = Some("token".into());
    new.webhook_key = Some(WEBHOOK_KEY.into());
    new.webhook_secret = Some(WEBHOOK_SECRET.into());
    new.verify_token = Some(VERIFY_TOKEN.into());
    let broker = brokers.create(new).await.unwrap();

    let ingestor = Ingestor::new(channels.clone(), messages.clone(), EventBus::new());
    let app = webhook_routes(AppState::new(brokers.clone(), ingestor));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        base_url: format!("http://127.0.0.1:{port}"),
        brokers,
        channels,
        messages,
        broker,
    }
}

fn sign(secret: &str, payload: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

// ── Handshake ────────────────────────────────────────────────────────

#[tokio::test]
async fn webhook_management() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        assert!(server.broker.can_set_webhook());

        handshake::arm_webhook(&server.brokers, &server.broker)
            .await
            .unwrap();
        assert_eq!(server.broker_state().await, WebhookState::Pending);

        handshake::disarm_webhook(&server.brokers, &server.broker)
            .await
            .unwrap();
        assert_eq!(server.broker_state().await, WebhookState::Unset);

        handshake::arm_webhook(&server.brokers, &server.broker)
            .await
            .unwrap();

        // Wrong token: rejected, still pending.
        let response = reqwest::get(format!(
            "{}?hub.verify_token={VERIFY_TOKEN}12&hub.challenge=22",
            server.update_url()
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), 403);
        assert_eq!(server.broker_state().await, WebhookState::Pending);

        // Correct token: challenge echoed verbatim, broker integrated.
        let response = reqwest::get(format!(
            "{}?hub.verify_token={VERIFY_TOKEN}&hub.challenge=22",
            server.update_url()
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "22");
        assert_eq!(server.broker_state().await, WebhookState::Integrated);

        handshake::disarm_webhook(&server.brokers, &server.broker)
            .await
            .unwrap();
        assert_eq!(server.broker_state().await, WebhookState::Unset);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn handshake_for_unknown_broker_is_not_found() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let response = reqwest::get(format!(
            "{}/broker/whatsapp/other_hook/update?hub.verify_token={VERIFY_TOKEN}&hub.challenge=22",
            server.base_url
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), 404);

        let response = reqwest::get(format!(
            "{}/broker/signal/{WEBHOOK_KEY}/update?hub.verify_token={VERIFY_TOKEN}&hub.challenge=22",
            server.base_url
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), 404);
    })
    .await
    .expect("test timed out");
}

// ── Signed deliveries ────────────────────────────────────────────────

#[tokio::test]
async fn post_message_creates_channel_and_message() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.integrate().await;

        let response = server
            .post_update(MESSAGE_01, Some(sign(WEBHOOK_SECRET, MESSAGE_01)))
            .await;
        assert_eq!(response.status(), 200);

        let channels = server.channels.list_for_broker(&server.broker.id).await.unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].external_id, "1234");
        assert_eq!(channels[0].name, "NAME");

        let messages = server
            .messages
            .list_for_channel(&channels[0].id, 10)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "MESSAGE_BODY");
        assert_eq!(messages[0].sender, "1234");
        assert_eq!(messages[0].external_id, "wamid.ID");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn post_without_signature_creates_nothing() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.integrate().await;

        let response = server.post_update(MESSAGE_01, None).await;
        assert_eq!(response.status(), 200);

        assert!(
            server
                .channels
                .list_for_broker(&server.broker.id)
                .await
                .unwrap()
                .is_empty()
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn post_with_wrong_signature_creates_nothing() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.integrate().await;

        // A digest computed with the right key but corrupted in transit.
        let good = sign(WEBHOOK_SECRET, MESSAGE_01);
        let corrupted = good.replace("sha256=", "sha256=1234");
        let response = server.post_update(MESSAGE_01, Some(corrupted)).await;
        assert_eq!(response.status(), 200);

        // A digest computed with the wrong key.
        let response = server
            .post_update(MESSAGE_01, Some(sign("OTHER-SECRET", MESSAGE_01)))
            .await;
        assert_eq!(response.status(), 200);

        assert!(
            server
                .channels
                .list_for_broker(&server.broker.id)
                .await
                .unwrap()
                .is_empty()
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn replayed_post_does_not_duplicate() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.integrate().await;

        let signature = sign(WEBHOOK_SECRET, MESSAGE_01);
        server.post_update(MESSAGE_01, Some(signature.clone())).await;
        server.post_update(MESSAGE_01, Some(signature)).await;

        let channels = server.channels.list_for_broker(&server.broker.id).await.unwrap();
        assert_eq!(channels.len(), 1);
        let messages = server
            .messages
            .list_for_channel(&channels[0].id, 10)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn signed_garbage_is_dropped_quietly() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.integrate().await;

        let payload = "not json at all";
        let response = server
            .post_update(payload, Some(sign(WEBHOOK_SECRET, payload)))
            .await;
        assert_eq!(response.status(), 200);

        assert!(
            server
                .channels
                .list_for_broker(&server.broker.id)
                .await
                .unwrap()
                .is_empty()
        );
    })
    .await
    .expect("test timed out");
}
