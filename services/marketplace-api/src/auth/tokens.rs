//! Personal access token helpers.
//!
//! # Purpose
//! Tokens are handed out as `{token_id}|{secret}`. Only the SHA-256 digest
//! of the secret is stored; lookups go by id and compare digests in
//! constant time.
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Random secret half of a plain-text token.
pub fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn plain_text_token(token_id: u64, secret: &str) -> String {
    format!("{token_id}|{secret}")
}

/// Split a plain-text token into its id and secret.
pub fn split_token(token: &str) -> Option<(u64, &str)> {
    let (id, secret) = token.split_once('|')?;
    let id = id.parse().ok()?;
    if secret.is_empty() {
        return None;
    }
    Some((id, secret))
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_long_and_distinct() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_stable_hex() {
        let digest = hash_secret("secret");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_secret("secret"));
        assert_ne!(digest, hash_secret("Secret"));
    }

    #[test]
    fn split_round_trips_plain_text() {
        let plain = plain_text_token(12, "abc");
        assert_eq!(plain, "12|abc");
        assert_eq!(split_token(&plain), Some((12, "abc")));
    }

    #[test]
    fn split_rejects_malformed_tokens() {
        assert_eq!(split_token("no-separator"), None);
        assert_eq!(split_token("x|abc"), None);
        assert_eq!(split_token("3|"), None);
    }

    #[test]
    fn constant_time_eq_compares_content_and_length() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
