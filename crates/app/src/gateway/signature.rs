//! Webhook signatures (HMAC-SHA256).

use hmac::{Hmac, Mac, digest::InvalidLength};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Lower-case hex HMAC-SHA256 of `message` under `key`.
///
/// # Errors
///
/// Returns [`InvalidLength`] if the key is rejected, which HMAC never does.
pub fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(message);

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex HMAC-SHA256 `signature` of `message` under `key`.
///
/// Surrounding whitespace is ignored. The digests are compared in constant
/// time.
#[must_use]
pub fn verify_hmac_sha256_hex(key: &[u8], message: &[u8], signature: &str) -> bool {
    let Ok(signature) = hex::decode(signature.trim()) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(message);

    mac.verify_slice(&signature).is_ok()
}
