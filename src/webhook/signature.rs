//! Inbound webhook signature verification.
//!
//! The provider signs each POST with HMAC-SHA256 over the raw request body
//! and ships the digest in `x-hub-signature-256: sha256=<hex>`. Verification
//! must run on the exact bytes received; re-serializing the parsed payload
//! would change them and break the digest.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Expected digest prefix in the signature header.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a webhook payload signature.
///
/// Returns `true` only when the header is present, carries the `sha256=`
/// prefix, and its digest matches the HMAC of `body` under `secret`.
pub fn verify_signature(secret: &str, body: &[u8], signature_header: Option<&str>) -> bool {
    if secret.is_empty() {
        warn!("webhook_signature_no_secret_configured");
        return false;
    }

    let Some(header) = signature_header else {
        warn!("webhook_signature_header_missing");
        return false;
    };

    let Some(provided) = header.strip_prefix(SIGNATURE_PREFIX) else {
        warn!("webhook_signature_malformed_prefix");
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("webhook_signature_invalid_key");
            return false;
        }
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    let valid = constant_time_compare(&expected, provided);
    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = provided.len(),
            "webhook_signature_mismatch"
        );
    }
    valid
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
