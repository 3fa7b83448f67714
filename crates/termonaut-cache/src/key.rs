//! Fingerprint generation using SHA256 hashing

use sha2::{Digest, Sha256};

/// Current fingerprint format version. Bump whenever the field order,
/// separator or encoding below changes; every existing entry becomes
/// unreachable and ages out through the expiry sweep.
pub const FINGERPRINT_VERSION: u32 = 1;

/// Generates deterministic cache fingerprints for avatar requests
#[derive(Debug, Clone)]
pub struct FingerprintGenerator {
    version: u32,
}

impl FingerprintGenerator {
    /// Create a new generator with the current version
    pub fn new() -> Self {
        Self {
            version: FINGERPRINT_VERSION,
        }
    }

    /// Create a generator pinned to a specific version
    pub fn with_version(version: u32) -> Self {
        Self { version }
    }

    /// Generate a fingerprint for an avatar identity
    ///
    /// The fingerprint is a SHA256 hash of, in order and separated by `|`:
    /// - `v` followed by the format version
    /// - Username, prefixed by its byte length and `:`
    /// - Level
    /// - Style
    /// - Character-art width
    /// - Character-art height
    ///
    /// The vector canvas size is deliberately not part of the key.
    pub fn fingerprint(
        &self,
        username: &str,
        level: u32,
        style: &str,
        ascii_width: u32,
        ascii_height: u32,
    ) -> String {
        let mut hasher = Sha256::new();

        hasher.update(format!("v{}", self.version).as_bytes());
        hasher.update(b"|");

        hasher.update(format!("{}:{}", username.len(), username).as_bytes());
        hasher.update(b"|");

        hasher.update(level.to_string().as_bytes());
        hasher.update(b"|");

        hasher.update(style.as_bytes());
        hasher.update(b"|");

        hasher.update(format!("{}|{}", ascii_width, ascii_height).as_bytes());

        format!("{:x}", hasher.finalize())
    }

    /// Get the format version
    pub fn version(&self) -> u32 {
        self.version
    }
}

impl Default for FingerprintGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprints double as file names, so only accept what the generator
/// could have produced.
pub(crate) fn is_valid_fingerprint(fingerprint: &str) -> bool {
    !fingerprint.is_empty()
        && fingerprint.len() <= 128
        && fingerprint
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let generator = FingerprintGenerator::new();

        let a = generator.fingerprint("alice", 7, "pixel-art", 20, 10);
        let b = generator.fingerprint("alice", 7, "pixel-art", 20, 10);

        assert_eq!(a, b, "Same inputs should produce same fingerprint");
    }

    #[test]
    fn test_fingerprint_sensitive_to_each_field() {
        let generator = FingerprintGenerator::new();
        let base = generator.fingerprint("alice", 7, "pixel-art", 20, 10);

        assert_ne!(base, generator.fingerprint("bob", 7, "pixel-art", 20, 10));
        assert_ne!(base, generator.fingerprint("alice", 8, "pixel-art", 20, 10));
        assert_ne!(base, generator.fingerprint("alice", 7, "bottts", 20, 10));
        assert_ne!(base, generator.fingerprint("alice", 7, "pixel-art", 40, 10));
        assert_ne!(base, generator.fingerprint("alice", 7, "pixel-art", 20, 20));
    }

    #[test]
    fn test_fingerprint_username_separator_ambiguity() {
        let generator = FingerprintGenerator::new();

        let a = generator.fingerprint("a|1", 2, "bottts", 20, 10);
        let b = generator.fingerprint("a", 1, "2|bottts", 20, 10);

        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_different_versions() {
        let v1 = FingerprintGenerator::with_version(1);
        let v2 = FingerprintGenerator::with_version(2);

        assert_ne!(
            v1.fingerprint("alice", 7, "pixel-art", 20, 10),
            v2.fingerprint("alice", 7, "pixel-art", 20, 10),
        );
    }

    #[test]
    fn test_fingerprint_is_64_chars() {
        let generator = FingerprintGenerator::new();
        let fingerprint = generator.fingerprint("alice", 1, "pixel-art", 10, 5);

        assert_eq!(fingerprint.len(), 64, "SHA256 hash should be 64 hex characters");
        assert!(is_valid_fingerprint(&fingerprint));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        assert!(!is_valid_fingerprint(""));
        assert!(!is_valid_fingerprint("../etc/passwd"));
        assert!(!is_valid_fingerprint("a/b"));
        assert!(is_valid_fingerprint("current_user"));
    }
}
