use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canon::canonical_json;

/// Compute SHA-256 hash of bytes, returning lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Stable fingerprint of a record: SHA-256 over its canonical JSON.
/// Field order in the Rust struct does not affect the result.
pub fn record_digest<T: Serialize>(record: &T) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(&canonical_json(record)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sha256_empty() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_ignores_key_order() {
        let a = json!({"p25": 20.0, "p50": 40.0, "p75": 60.0});
        let b = json!({"p75": 60.0, "p25": 20.0, "p50": 40.0});
        assert_eq!(record_digest(&a).unwrap(), record_digest(&b).unwrap());
    }

    #[test]
    fn digest_changes_with_content() {
        let a = json!({"threshold": 10});
        let b = json!({"threshold": 11});
        assert_ne!(record_digest(&a).unwrap(), record_digest(&b).unwrap());
    }

    #[test]
    fn digest_is_64_char_lowercase_hex() {
        let h = record_digest(&json!({"version": 1})).unwrap();
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }
}
