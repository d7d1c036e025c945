use sha2::{Digest, Sha256};

/// Length of the truncated hex digest emitted into logs.
const DIGEST_LEN: usize = 12;

/// Correlation digest for values that must never be logged in plaintext
/// (recipients, subjects, tokens).
///
/// The input is trimmed and lowercased before hashing so the same logical
/// value always produces the same digest, then reduced to a short hex prefix
/// of its SHA-256.
#[must_use]
pub fn log_digest(value: &str) -> String {
    let canonical = value.trim().to_lowercase();
    let hash = Sha256::digest(canonical.as_bytes());
    let mut hex = hex::encode(hash);
    hex.truncate(DIGEST_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_and_truncated() {
        let a = log_digest("User@Example.com");
        let b = log_digest("  user@example.com ");
        assert_eq!(a, b, "trim + lowercase must canonicalize");
        assert_eq!(a.len(), DIGEST_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn digest_never_contains_the_input() {
        let digest = log_digest("alice@example.com");
        assert!(!digest.contains("alice"));
        assert!(!digest.contains('@'));
    }

    #[test]
    fn distinct_inputs_diverge() {
        assert_ne!(log_digest("a@x"), log_digest("b@x"));
    }
}
