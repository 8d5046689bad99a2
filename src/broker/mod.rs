//! Broker domain model and per-provider capabilities.

pub mod avatar;
pub mod model;

pub use model::{Broker, BrokerType, NewBroker, WebhookState};
