//! ChannelStore, one row per (broker, external conversation) pair.
//!
//! Creation goes through `INSERT OR IGNORE` against the UNIQUE constraint,
//! so concurrent first-contact races converge on a single row and the
//! caller re-selects the winner.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use libsql::Row;
use tracing::info;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::db::Database;
use crate::store::parse_datetime;

/// A persisted conversation channel.
#[derive(Debug, Clone)]
pub struct Channel {
    /// UUID primary key; also the seed for the channel's avatar color.
    pub id: String,
    pub broker_id: String,
    /// The provider's stable identifier for the sender/conversation.
    pub external_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Persistent channel storage.
#[derive(Clone)]
pub struct ChannelStore {
    db: Arc<Database>,
}

impl ChannelStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Look up a channel by its (broker, external id) pair.
    pub async fn find(
        &self,
        broker_id: &str,
        external_id: &str,
    ) -> Result<Option<Channel>, DatabaseError> {
        let mut rows = self
            .db
            .conn()
            .query(
                "SELECT id, broker_id, external_id, name, created_at FROM channels
                 WHERE broker_id = ?1 AND external_id = ?2",
                libsql::params![broker_id, external_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find channel: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_channel(&row)?)),
            None => Ok(None),
        }
    }

    /// Insert a channel unless one already exists for the pair.
    ///
    /// Losing the race to another writer is not an error; callers re-select
    /// after this returns.
    pub async fn insert_if_absent(
        &self,
        broker_id: &str,
        external_id: &str,
        name: &str,
    ) -> Result<(), DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let changed = self
            .db
            .conn()
            .execute(
                "INSERT INTO channels (id, broker_id, external_id, name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (broker_id, external_id) DO NOTHING",
                libsql::params![
                    id.clone(),
                    broker_id,
                    external_id,
                    name,
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert channel: {e}")))?;

        if changed > 0 {
            info!(
                channel_id = %id,
                broker_id = broker_id,
                external_id = external_id,
                "Channel created"
            );
        }
        Ok(())
    }

    /// All channels owned by a broker, oldest first.
    pub async fn list_for_broker(&self, broker_id: &str) -> Result<Vec<Channel>, DatabaseError> {
        let mut rows = self
            .db
            .conn()
            .query(
                "SELECT id, broker_id, external_id, name, created_at FROM channels
                 WHERE broker_id = ?1 ORDER BY created_at ASC",
                libsql::params![broker_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list channels: {e}")))?;

        let mut channels = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            channels.push(row_to_channel(&row)?);
        }
        Ok(channels)
    }

    /// Administrative removal; messages cascade via the foreign key.
    pub async fn delete(&self, channel_id: &str) -> Result<(), DatabaseError> {
        let changed = self
            .db
            .conn()
            .execute(
                "DELETE FROM channels WHERE id = ?1",
                libsql::params![channel_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete channel: {e}")))?;

        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "channel",
                id: channel_id.to_string(),
            });
        }
        info!(channel_id = channel_id, "Channel deleted");
        Ok(())
    }
}

fn row_to_channel(row: &Row) -> Result<Channel, DatabaseError> {
    let created_str: String = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("bad channel row: {e}")))?;

    Ok(Channel {
        id: row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("bad channel row: {e}")))?,
        broker_id: row
            .get(1)
            .map_err(|e| DatabaseError::Query(format!("bad channel row: {e}")))?,
        external_id: row
            .get(2)
            .map_err(|e| DatabaseError::Query(format!("bad channel row: {e}")))?,
        name: row
            .get(3)
            .map_err(|e| DatabaseError::Query(format!("bad channel row: {e}")))?,
        created_at: parse_datetime(&created_str),
    })
}
