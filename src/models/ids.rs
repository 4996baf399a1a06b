//! Content fingerprints using SHA256 hashing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A fingerprint of a match file's raw content.
///
/// Two reads of an unchanged file produce the same fingerprint, which is how
/// duplicate filesystem events for one match start are collapsed.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash raw bytes into a fingerprint.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the fingerprint as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = Fingerprint::of_bytes(br#"{"vehicles": []}"#);
        let b = Fingerprint::of_bytes(br#"{"vehicles": []}"#);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let a = Fingerprint::of_bytes(br#"{"mapId": 1}"#);
        let b = Fingerprint::of_bytes(br#"{"mapId": 2}"#);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_hex_format() {
        let fp = Fingerprint::of_bytes(b"arena");
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp.short().len(), 12);
    }

    #[test]
    fn test_fingerprint_debug() {
        let fp = Fingerprint::from("abcdef0123456789abcdef");
        assert_eq!(format!("{:?}", fp), "Fingerprint(abcdef012345)");
    }
}
