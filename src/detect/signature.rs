//! Payload signature verification
//!
//! Devices sign `sensor_id + payload` with SHA-256; the gateway recomputes
//! the digest and compares. A mismatch is treated as spoofing.

use sha2::{Digest, Sha256};

/// Lowercase hex digest a legitimate device would have attached.
pub fn expected_signature(sensor_id: &str, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sensor_id.as_bytes());
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify(sensor_id: &str, payload: &str, signature: &str) -> bool {
    expected_signature(sensor_id, payload) == signature
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_exact_digest() {
        let sig = expected_signature("soil-1000", "moisture=42");
        assert!(verify("soil-1000", "moisture=42", &sig));
    }

    #[test]
    fn rejects_tampered_payloads() {
        let sig = expected_signature("soil-1000", "moisture=42");
        assert!(!verify("soil-1000", "moisture=99", &sig));
        assert!(!verify("soil-1001", "moisture=42", &sig));
    }

    #[test]
    fn rejects_uppercase_hex() {
        let sig = expected_signature("soil-1000", "x").to_uppercase();
        assert!(!verify("soil-1000", "x", &sig));
    }
}
