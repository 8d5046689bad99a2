//! BrokerStore, persistence for broker configuration and webhook state.
//!
//! Integration-state changes are single UPDATE statements so they commit
//! independently of any in-flight message processing, and the
//! `pending -> integrated` transition is conditional on the current state,
//! letting SQLite serialize racing handshake attempts.

use std::sync::Arc;

use chrono::Utc;
use libsql::Row;
use tracing::debug;
use uuid::Uuid;

use crate::broker::{Broker, BrokerType, NewBroker, WebhookState};
use crate::error::DatabaseError;
use crate::store::db::Database;
use crate::store::opt_text;

const DEFAULT_API_VERSION: &str = "15.0";

const BROKER_COLUMNS: &str = "id, name, broker_type, access_token, webhook_key, \
     webhook_secret, verify_token, phone_number_id, api_version, integration_state";

/// Persistent broker storage.
#[derive(Clone)]
pub struct BrokerStore {
    db: Arc<Database>,
}

impl BrokerStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new broker. Returns the stored record.
    pub async fn create(&self, new: NewBroker) -> Result<Broker, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let api_version = new
            .api_version
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        self.db
            .conn()
            .execute(
                "INSERT INTO brokers (id, name, broker_type, access_token, webhook_key,
                    webhook_secret, verify_token, phone_number_id, api_version,
                    integration_state, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'unset', ?10, ?10)",
                libsql::params![
                    id.clone(),
                    new.name.clone(),
                    new.broker_type.as_str(),
                    opt_text(new.access_token.as_deref()),
                    opt_text(new.webhook_key.as_deref()),
                    opt_text(new.webhook_secret.as_deref()),
                    opt_text(new.verify_token.as_deref()),
                    opt_text(new.phone_number_id.as_deref()),
                    api_version.clone(),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert broker: {e}")))?;

        debug!(broker_id = %id, broker_type = %new.broker_type, "Broker created");

        Ok(Broker {
            id,
            name: new.name,
            broker_type: new.broker_type,
            access_token: new.access_token,
            webhook_key: new.webhook_key,
            webhook_secret: new.webhook_secret,
            verify_token: new.verify_token,
            phone_number_id: new.phone_number_id,
            api_version,
            integration_state: WebhookState::Unset,
        })
    }

    /// Look up a broker by id.
    pub async fn get(&self, id: &str) -> Result<Option<Broker>, DatabaseError> {
        let mut rows = self
            .db
            .conn()
            .query(
                &format!("SELECT {BROKER_COLUMNS} FROM brokers WHERE id = ?1"),
                libsql::params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get broker: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_broker(&row)?)),
            None => Ok(None),
        }
    }

    /// Look up a broker by its public webhook coordinates.
    ///
    /// This is the only lookup the HTTP surface performs; a miss carries no
    /// information about which brokers exist.
    pub async fn get_by_webhook(
        &self,
        broker_type: BrokerType,
        webhook_key: &str,
    ) -> Result<Option<Broker>, DatabaseError> {
        let mut rows = self
            .db
            .conn()
            .query(
                &format!(
                    "SELECT {BROKER_COLUMNS} FROM brokers
                     WHERE broker_type = ?1 AND webhook_key = ?2"
                ),
                libsql::params![broker_type.as_str(), webhook_key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get broker by webhook: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_broker(&row)?)),
            None => Ok(None),
        }
    }

    /// Set a broker's integration state unconditionally.
    pub async fn update_integration_state(
        &self,
        id: &str,
        state: WebhookState,
    ) -> Result<(), DatabaseError> {
        let changed = self
            .db
            .conn()
            .execute(
                "UPDATE brokers SET integration_state = ?1, updated_at = ?2 WHERE id = ?3",
                libsql::params![state.as_str(), Utc::now().to_rfc3339(), id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update integration state: {e}")))?;

        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "broker",
                id: id.to_string(),
            });
        }
        debug!(broker_id = id, state = state.as_str(), "Integration state updated");
        Ok(())
    }

    /// Transition `pending -> integrated`. Returns whether this call won the
    /// transition; a broker in any other state is left untouched.
    pub async fn try_mark_integrated(&self, id: &str) -> Result<bool, DatabaseError> {
        let changed = self
            .db
            .conn()
            .execute(
                "UPDATE brokers SET integration_state = 'integrated', updated_at = ?1
                 WHERE id = ?2 AND integration_state = 'pending'",
                libsql::params![Utc::now().to_rfc3339(), id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("mark integrated: {e}")))?;

        Ok(changed > 0)
    }
}

fn row_to_broker(row: &Row) -> Result<Broker, DatabaseError> {
    let broker_type_str: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("bad broker row: {e}")))?;
    let broker_type: BrokerType = broker_type_str
        .parse()
        .map_err(|e| DatabaseError::Query(format!("bad broker row: {e}")))?;
    let state_str: String = row
        .get(9)
        .map_err(|e| DatabaseError::Query(format!("bad broker row: {e}")))?;

    Ok(Broker {
        id: row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("bad broker row: {e}")))?,
        name: row
            .get(1)
            .map_err(|e| DatabaseError::Query(format!("bad broker row: {e}")))?,
        broker_type,
        access_token: row.get(3).ok(),
        webhook_key: row.get(4).ok(),
        webhook_secret: row.get(5).ok(),
        verify_token: row.get(6).ok(),
        phone_number_id: row.get(7).ok(),
        api_version: row
            .get(8)
            .map_err(|e| DatabaseError::Query(format!("bad broker row: {e}")))?,
        integration_state: WebhookState::parse(&state_str),
    })
}
