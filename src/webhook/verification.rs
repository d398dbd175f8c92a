use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use tracing::{debug, error};

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Verifies that `signature` is a valid HMAC of `body` under `secret`.
///
/// Three header encodings are accepted: `sha256=<hex>`, the legacy
/// `sha1=<hex>`, and a bare hex digest (treated as sha256). Verification
/// runs over the exact body string as received; comparison is
/// constant-time. Every failure path collapses to `false`.
pub fn verify_webhook_signature(secret: &str, body: &str, signature: &str) -> bool {
    if secret.is_empty() {
        // Misconfiguration, not an attack: fail closed.
        error!("No webhook secret configured - rejecting webhook");
        return false;
    }
    if signature.is_empty() {
        debug!("Missing webhook signature header");
        return false;
    }

    let (scheme, digest_hex) = match signature.split_once('=') {
        Some(("sha256", rest)) => ("sha256", rest),
        Some(("sha1", rest)) => ("sha1", rest),
        Some((other, _)) => {
            debug!("Unsupported signature scheme: {}", other);
            return false;
        }
        // No prefix: treated as a bare sha256 digest.
        None => ("sha256", signature),
    };

    let provided = match hex::decode(digest_hex) {
        Ok(bytes) => bytes,
        Err(_) => {
            debug!("Webhook signature is not valid hex");
            return false;
        }
    };

    match scheme {
        "sha256" => {
            let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
                return false;
            };
            mac.update(body.as_bytes());
            mac.verify_slice(&provided).is_ok()
        }
        "sha1" => {
            let Ok(mut mac) = HmacSha1::new_from_slice(secret.as_bytes()) else {
                return false;
            };
            mac.update(body.as_bytes());
            mac.verify_slice(&provided).is_ok()
        }
        _ => false,
    }
}

/// Gate for skipping signature verification in non-production environments.
///
/// Panics when the environment is production regardless of caller - the
/// bypass must never be reachable there.
pub fn webhook_auth_bypass(environment: &str) -> bool {
    if environment.eq_ignore_ascii_case("production") {
        panic!("Webhook auth bypass requested in production");
    }
    true
}
