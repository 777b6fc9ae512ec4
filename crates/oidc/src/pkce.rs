//! PKCE verifier generation and S256 challenge derivation (RFC 7636).

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::OidcError;
use crate::types::non_empty_string;

const CHALLENGE_LENGTH: usize = 64;

non_empty_string!(
    /// PKCE code verifier. The S256 digest of this value travels in the
    /// authorization request; the raw value is sent as `code_verifier` at
    /// token exchange.
    Challenge,
    "challenge"
);

impl Challenge {
    pub fn generate() -> Result<Self, OidcError> {
        Self::new(random_token(CHALLENGE_LENGTH)?)
    }

    /// S256 code challenge: base64url-encoded SHA-256 digest of the
    /// verifier, no padding. Always 43 characters.
    pub fn code_challenge(&self) -> String {
        let digest = Sha256::digest(self.as_str().as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }
}

/// Random `[A-Za-z0-9]` string of the requested length.
///
/// Bytes come from the operating system RNG; base64 maps them onto printable
/// characters and anything outside the alphanumeric range is discarded, so a
/// round may come up short and the loop draws again.
pub(crate) fn random_token(length: usize) -> Result<String, OidcError> {
    let mut token = String::with_capacity(length);

    while token.len() < length {
        let mut bytes = vec![0u8; length - token.len()];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|err| OidcError::RandomSource(err.to_string()))?;

        token.extend(
            STANDARD
                .encode(&bytes)
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .take(length - token.len()),
        );
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_random_token_length_and_alphabet() {
        for length in [1, 16, 64, 100] {
            let token = random_token(length).unwrap();
            assert_eq!(token.len(), length);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_random_token_uniqueness() {
        let mut seen = HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(random_token(16).unwrap()));
        }
    }

    #[test]
    fn test_generated_challenge_is_64_chars() {
        let challenge = Challenge::generate().unwrap();
        assert_eq!(challenge.as_str().len(), 64);
        assert!(challenge.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_code_challenge_is_43_chars_and_url_safe() {
        let challenge = Challenge::generate().unwrap();
        let digest = challenge.code_challenge();
        assert_eq!(digest.len(), 43);
        assert!(!digest.contains('+'));
        assert!(!digest.contains('/'));
        assert!(!digest.contains('='));
    }

    #[test]
    fn test_code_challenge_is_deterministic() {
        let challenge = Challenge::new("a".repeat(64)).unwrap();
        assert_eq!(challenge.code_challenge(), challenge.code_challenge());
        // Known digest for 64 'a' bytes, computed independently.
        assert_eq!(
            challenge.code_challenge(),
            URL_SAFE_NO_PAD.encode(Sha256::digest("a".repeat(64).as_bytes()))
        );
    }

    #[test]
    fn test_different_verifiers_produce_different_digests() {
        let first = Challenge::generate().unwrap();
        let second = Challenge::generate().unwrap();
        assert_ne!(first.as_str(), second.as_str());
        assert_ne!(first.code_challenge(), second.code_challenge());
    }
}
