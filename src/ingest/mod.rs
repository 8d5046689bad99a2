//! Inbound message ingestion: envelope parsing, channel resolution,
//! idempotent persistence.

pub mod payload;
pub mod pipeline;
pub mod resolver;

pub use payload::{WebhookEnvelope, parse_envelope};
pub use pipeline::{IngestOutcome, Ingestor};
pub use resolver::resolve_channel;
