//! Anonymous respondent fingerprinting
//!
//! Respondents have no accounts, so the dedup key is a SHA-256 digest of
//! user-agent, peer address, and form id. Including the form id keeps
//! fingerprints uncorrelated across forms: the same device submits to
//! two forms under two unrelated identifiers.
//!
//! Inputs can be missing (proxies strip headers, sockets without a peer
//! address); a sentinel keeps generation total rather than failing the
//! submission.

use sha2::{Digest, Sha256};
use std::net::IpAddr;
use uuid::Uuid;

const UNKNOWN: &str = "unknown";

/// Derive the stable per-form device fingerprint, hex-encoded
pub fn device_fingerprint(
    user_agent: Option<&str>,
    remote_addr: Option<IpAddr>,
    form_id: Uuid,
) -> String {
    let user_agent = user_agent.filter(|ua| !ua.is_empty()).unwrap_or(UNKNOWN);
    let addr = remote_addr
        .map(|a| a.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}|{}", user_agent, addr, form_id));
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "Mozilla/5.0 (X11; Linux x86_64)";

    fn form(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn ip() -> IpAddr {
        "203.0.113.7".parse().unwrap()
    }

    #[test]
    fn test_deterministic() {
        let a = device_fingerprint(Some(UA), Some(ip()), form(1));
        let b = device_fingerprint(Some(UA), Some(ip()), form(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_scoped_per_form() {
        let a = device_fingerprint(Some(UA), Some(ip()), form(1));
        let b = device_fingerprint(Some(UA), Some(ip()), form(2));
        assert_ne!(a, b);
    }

    #[test]
    fn test_distinct_devices_differ() {
        let a = device_fingerprint(Some(UA), Some(ip()), form(1));
        let b = device_fingerprint(Some("curl/8.5.0"), Some(ip()), form(1));
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_inputs_use_sentinel() {
        // Absent and empty user-agent collapse to the same sentinel;
        // generation never fails.
        let missing = device_fingerprint(None, None, form(1));
        let empty = device_fingerprint(Some(""), None, form(1));
        assert_eq!(missing, empty);
    }

    #[test]
    fn test_full_length_hex_digest() {
        let fp = device_fingerprint(Some(UA), Some(ip()), form(1));
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
