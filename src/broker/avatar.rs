//! Channel avatar art, dispatched by broker kind.
//!
//! WhatsApp channels get the bundled glyph recolored with a background
//! derived from the channel's id, so a conversation keeps the same color
//! across restarts. Other kinds return `None` and the caller falls back
//! to its default art.

use sha2::{Digest, Sha256};

use super::model::BrokerType;

/// Fill placeholder baked into the bundled SVG sources.
const PLACEHOLDER_FILL: &str = "fill:#875a7b";

/// Speech-bubble glyph used for WhatsApp channels.
const WHATSAPP_AVATAR_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 48 48" width="48" height="48">
  <rect width="48" height="48" rx="24" style="fill:#875a7b"/>
  <path style="fill:#ffffff" d="M24 10c-7.7 0-14 5.8-14 13 0 3.2 1.3 6.2 3.4 8.5L12 38l6.9-1.8c1.6.5 3.3.8 5.1.8 7.7 0 14-5.8 14-13S31.7 10 24 10zm7.2 17.9c-.3.9-1.8 1.7-2.5 1.8-.6.1-1.4.2-4.6-1-3.8-1.6-6.3-5.5-6.5-5.7-.2-.3-1.6-2.1-1.6-4s1-2.9 1.4-3.3c.3-.4.8-.5 1-.5h.7c.2 0 .5-.1.8.6.3.8 1.1 2.7 1.2 2.9.1.2.2.4 0 .7-.1.3-.2.4-.4.7l-.6.7c-.2.2-.4.4-.2.8.2.4 1 1.7 2.2 2.7 1.5 1.3 2.8 1.8 3.2 2 .4.2.6.1.9-.1.2-.3 1-1.2 1.3-1.6.3-.4.5-.3.9-.2.4.1 2.3 1.1 2.7 1.3.4.2.7.3.8.5.1.2.1 1-.2 1.7z"/>
</svg>"##;

/// Build the avatar SVG for a channel, if its broker kind has custom art.
pub fn channel_avatar(broker_type: BrokerType, seed: &str) -> Option<String> {
    match broker_type {
        BrokerType::WhatsApp => {
            let fill = format!("fill:{}", hsl_from_seed(seed));
            Some(WHATSAPP_AVATAR_SVG.replace(PLACEHOLDER_FILL, &fill))
        }
        BrokerType::Telegram => None,
    }
}

/// Derive a stable HSL background color from an opaque seed string.
///
/// Hue spans the full wheel, saturation stays in a 40-70% band and
/// lightness is fixed so any hue remains readable under white glyphs.
pub fn hsl_from_seed(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let hue = u32::from(digest[0]) * 360 / 255;
    let saturation = 40 + u32::from(digest[1]) * 30 / 255;
    format!("hsl({hue}, {saturation}%, 45%)")
}
