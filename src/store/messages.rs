//! MessageStore, idempotent persistence for inbound messages.
//!
//! The provider redelivers on timeouts and reorders under load, so the
//! insert is keyed on (channel_id, external_id): a replay changes nothing
//! and reports itself as a duplicate rather than an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use libsql::Row;
use tracing::debug;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::db::Database;
use crate::store::{opt_text, parse_datetime};

/// A persisted inbound message. Immutable once written.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: String,
    pub channel_id: String,
    /// The provider-assigned message id, the idempotence key.
    pub external_id: String,
    pub sender: String,
    pub body: String,
    /// Raw provider timestamp, kept verbatim.
    pub provider_timestamp: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// Persistent message storage.
#[derive(Clone)]
pub struct MessageStore {
    db: Arc<Database>,
}

impl MessageStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a message unless its external id was already seen on the
    /// channel. Returns the stored record, or `None` for a duplicate.
    pub async fn insert(
        &self,
        channel_id: &str,
        external_id: &str,
        sender: &str,
        body: &str,
        provider_timestamp: Option<&str>,
    ) -> Result<Option<StoredMessage>, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let received_at = Utc::now();
        let changed = self
            .db
            .conn()
            .execute(
                "INSERT OR IGNORE INTO messages
                    (id, channel_id, external_id, sender, body, provider_timestamp, received_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                libsql::params![
                    id.clone(),
                    channel_id,
                    external_id,
                    sender,
                    body,
                    opt_text(provider_timestamp),
                    received_at.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert message: {e}")))?;

        if changed == 0 {
            debug!(
                channel_id = channel_id,
                external_id = external_id,
                "Duplicate message delivery ignored"
            );
            return Ok(None);
        }

        Ok(Some(StoredMessage {
            id,
            channel_id: channel_id.to_string(),
            external_id: external_id.to_string(),
            sender: sender.to_string(),
            body: body.to_string(),
            provider_timestamp: provider_timestamp.map(str::to_string),
            received_at,
        }))
    }

    /// Look up a message by its provider id within a channel.
    pub async fn get_by_external_id(
        &self,
        channel_id: &str,
        external_id: &str,
    ) -> Result<Option<StoredMessage>, DatabaseError> {
        let mut rows = self
            .db
            .conn()
            .query(
                "SELECT id, channel_id, external_id, sender, body, provider_timestamp, received_at
                 FROM messages WHERE channel_id = ?1 AND external_id = ?2",
                libsql::params![channel_id, external_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get message: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_message(&row)?)),
            None => Ok(None),
        }
    }

    /// Messages on a channel in arrival order, up to `limit`.
    pub async fn list_for_channel(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, DatabaseError> {
        let mut rows = self
            .db
            .conn()
            .query(
                "SELECT id, channel_id, external_id, sender, body, provider_timestamp, received_at
                 FROM messages WHERE channel_id = ?1
                 ORDER BY received_at ASC LIMIT ?2",
                libsql::params![channel_id, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list messages: {e}")))?;

        let mut messages = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            messages.push(row_to_message(&row)?);
        }
        Ok(messages)
    }
}

fn row_to_message(row: &Row) -> Result<StoredMessage, DatabaseError> {
    let received_str: String = row
        .get(6)
        .map_err(|e| DatabaseError::Query(format!("bad message row: {e}")))?;

    Ok(StoredMessage {
        id: row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("bad message row: {e}")))?,
        channel_id: row
            .get(1)
            .map_err(|e| DatabaseError::Query(format!("bad message row: {e}")))?,
        external_id: row
            .get(2)
            .map_err(|e| DatabaseError::Query(format!("bad message row: {e}")))?,
        sender: row
            .get(3)
            .map_err(|e| DatabaseError::Query(format!("bad message row: {e}")))?,
        body: row
            .get(4)
            .map_err(|e| DatabaseError::Query(format!("bad message row: {e}")))?,
        provider_timestamp: row.get(5).ok(),
        received_at: parse_datetime(&received_str),
    })
}
