//! Persistence layer, SQLite-backed storage for brokers, channels and messages.

pub mod brokers;
pub mod channels;
pub mod db;
pub mod messages;
pub mod migrations;

pub use brokers::BrokerStore;
pub use channels::{Channel, ChannelStore};
pub use db::Database;
pub use messages::{MessageStore, StoredMessage};

use chrono::{DateTime, Utc};

/// Convert `Option<&str>` to a libsql Value (NULL when absent).
pub(crate) fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Parse an RFC 3339 or SQLite datetime string into `DateTime<Utc>`.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}
