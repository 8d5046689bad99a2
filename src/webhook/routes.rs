//! HTTP surface for provider webhooks.
//!
//! One path per broker, keyed by type and webhook key:
//! `GET  /broker/{broker_type}/{webhook_key}/update` runs the handshake,
//! `POST /broker/{broker_type}/{webhook_key}/update` delivers events.
//!
//! A POST that fails signature verification is still answered 200 so the
//! provider stops retrying a payload we will never accept; it just has no
//! side effects. Unknown paths answer 404 without hinting at which brokers
//! exist.

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::broker::{Broker, BrokerType};
use crate::error::{Error, WebhookError};
use crate::ingest::{Ingestor, parse_envelope};
use crate::store::BrokerStore;
use crate::webhook::handshake;
use crate::webhook::signature::{SIGNATURE_HEADER, verify_signature};

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct AppState {
    pub brokers: BrokerStore,
    pub ingestor: Ingestor,
}

impl AppState {
    pub fn new(brokers: BrokerStore, ingestor: Ingestor) -> Self {
        Self { brokers, ingestor }
    }
}

/// Handshake query parameters, as the provider sends them.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Coarse webhook response body.
#[derive(Serialize)]
struct UpdateResponse {
    status: &'static str,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Build the gateway router.
pub fn webhook_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/broker/{broker_type}/{webhook_key}/update",
            get(verify_webhook).post(receive_update),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET handler: the provider's verification challenge.
async fn verify_webhook(
    State(state): State<AppState>,
    Path((broker_type, webhook_key)): Path<(String, String)>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let broker = match lookup_broker(&state, &broker_type, &webhook_key).await {
        Ok(broker) => broker,
        Err(status) => return status.into_response(),
    };

    let token = query.verify_token.as_deref().unwrap_or("");
    let challenge = query.challenge.as_deref().unwrap_or("");

    match handshake::verify_challenge(&state.brokers, &broker, token, challenge).await {
        Ok(echo) => (StatusCode::OK, echo).into_response(),
        Err(Error::Webhook(WebhookError::VerificationFailed)) => {
            (StatusCode::FORBIDDEN, "Verification failed").into_response()
        }
        Err(e) => {
            error!(error = %e, broker_id = %broker.id, "Handshake handling failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST handler: signed event delivery.
async fn receive_update(
    State(state): State<AppState>,
    Path((broker_type, webhook_key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let broker = match lookup_broker(&state, &broker_type, &webhook_key).await {
        Ok(broker) => broker,
        Err(status) => return status.into_response(),
    };

    let secret = broker.webhook_secret.as_deref().unwrap_or("");
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if !verify_signature(secret, &body, signature) {
        warn!(broker_id = %broker.id, "Discarding unverified webhook payload");
        return (StatusCode::OK, Json(UpdateResponse { status: "ignored" })).into_response();
    }

    let envelope = match parse_envelope(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(broker_id = %broker.id, error = %e, "Discarding malformed webhook payload");
            return (StatusCode::OK, Json(UpdateResponse { status: "ignored" })).into_response();
        }
    };

    match state.ingestor.ingest(&broker, envelope).await {
        Ok(outcome) => {
            info!(
                broker_id = %broker.id,
                stored = outcome.stored,
                duplicates = outcome.duplicates,
                skipped = outcome.skipped,
                "Webhook update processed"
            );
            (StatusCode::OK, Json(UpdateResponse { status: "ok" })).into_response()
        }
        Err(e) => {
            error!(error = %e, broker_id = %broker.id, "Webhook ingestion failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UpdateResponse { status: "error" }),
            )
                .into_response()
        }
    }
}

/// Resolve the path's (type, key) pair to a broker, or the status to answer
/// with. Parse failures and misses both read as 404.
async fn lookup_broker(
    state: &AppState,
    broker_type: &str,
    webhook_key: &str,
) -> Result<Broker, StatusCode> {
    let Ok(broker_type) = broker_type.parse::<BrokerType>() else {
        return Err(StatusCode::NOT_FOUND);
    };

    match state.brokers.get_by_webhook(broker_type, webhook_key).await {
        Ok(Some(broker)) => Ok(broker),
        Ok(None) => {
            warn!(
                broker_type = %broker_type,
                webhook_key = webhook_key,
                "{}",
                WebhookError::UnknownBroker
            );
            Err(StatusCode::NOT_FOUND)
        }
        Err(e) => {
            error!(error = %e, "Broker lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
