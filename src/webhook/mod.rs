//! Inbound webhook handling: handshake, signature verification, routes.

pub mod handshake;
pub mod routes;
pub mod signature;

pub use routes::{AppState, webhook_routes};
pub use signature::{SIGNATURE_HEADER, verify_signature};
