//! SHA-256 hex digests for values that must never be stored in the clear.
//!
//! Refresh-token identifiers are persisted only as their digest, so a leaked
//! `refresh_tokens` table cannot be replayed.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Digest a refresh-token identifier (`jti`) for storage and lookup.
pub fn refresh_token_hash(jti: &str) -> String {
    sha256_hex(jti.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        let hash = sha256_hex(b"");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn refresh_hash_is_stable_and_hides_input() {
        let jti = "5f0c3a1e-8d4b-4f7a-9c2e-1b3d5e7f9a0b";
        let hash = refresh_token_hash(jti);
        assert_eq!(hash, refresh_token_hash(jti));
        assert_eq!(hash.len(), 64);
        assert!(!hash.contains(jti));
    }
}
