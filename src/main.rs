use std::sync::Arc;

use tracing::{error, info};

use msgbridge::config::Config;
use msgbridge::events::{BrokerEvent, EventBus};
use msgbridge::ingest::Ingestor;
use msgbridge::store::{BrokerStore, ChannelStore, Database, MessageStore};
use msgbridge::webhook::{AppState, webhook_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(Database::open(&config.db_path).await?);
    let brokers = BrokerStore::new(Arc::clone(&db));
    let channels = ChannelStore::new(Arc::clone(&db));
    let messages = MessageStore::new(Arc::clone(&db));

    let events = EventBus::new();
    spawn_event_logger(&events);

    let ingestor = Ingestor::new(channels, messages, events);
    let app = webhook_routes(AppState::new(brokers, ingestor));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "msgbridge listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Log stored messages as they arrive. This is the hook point where
/// downstream notification consumers subscribe.
fn spawn_event_logger(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(BrokerEvent::MessageCreated {
                    channel_id, sender, ..
                }) => {
                    info!(channel_id = %channel_id, sender = %sender, "Message created");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    error!(missed = missed, "Event consumer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
