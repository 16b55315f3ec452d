//! Cookie signing shared across Leanweb crates
//!
//! Session cookies are signed with HMAC-SHA256 keyed by the configured
//! secret. Signatures are hex encoded; verification goes through the MAC's
//! constant-time check.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn cookie_mac(secret: &str, name: &str, value: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(name.as_bytes());
    mac.update(b"=");
    mac.update(value.as_bytes());
    Some(mac)
}

/// Sign a cookie as `name=value`, returning the hex signature.
///
/// `None` only if the MAC rejects the key, which HMAC never does.
pub fn sign_cookie(secret: &str, name: &str, value: &str) -> Option<String> {
    let mac = cookie_mac(secret, name, value)?;
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a hex cookie signature.
pub fn verify_cookie_signature(secret: &str, name: &str, value: &str, signature: &str) -> bool {
    let candidate = match hex::decode(signature) {
        Ok(candidate) => candidate,
        Err(_) => return false,
    };
    cookie_mac(secret, name, value)
        .map(|mac| mac.verify_slice(&candidate).is_ok())
        .unwrap_or(false)
}
