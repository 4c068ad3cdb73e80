//! PKCE verifier/challenge generation (RFC 7636, S256 only).

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Number of random bytes behind a verifier. Encodes to 43 base64url chars.
const VERIFIER_BYTES: usize = 32;

pub const CHALLENGE_METHOD: &str = "S256";

/// PKCE code verifier and its derived challenge.
///
/// Only constructed through [`PkceChallenge::generate`]; there is no way to
/// build one from an existing verifier, so a challenge can never be carried
/// over from a previous attempt.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    verifier: String,
    challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh verifier and compute its challenge.
    pub fn generate() -> Self {
        let verifier = generate_verifier();
        let challenge = compute_challenge(&verifier);

        Self {
            verifier,
            challenge,
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    pub fn method(&self) -> &'static str {
        CHALLENGE_METHOD
    }
}

/// Random code verifier drawn from the operating system CSPRNG.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// `base64url(SHA-256(verifier))` without padding.
pub fn compute_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Opaque anti-replay `state` value for the authorize request.
pub fn generate_state() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_challenge_is_deterministic() {
        let verifier = generate_verifier();

        let first = compute_challenge(&verifier);
        let second = compute_challenge(&verifier);

        assert_eq!(first, second);
        assert_ne!(first, verifier);
        assert!(!first.contains('+'));
        assert!(!first.contains('/'));
        assert!(!first.contains('='));
    }

    #[test]
    fn test_known_challenge_vector() {
        // Appendix B of RFC 7636
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            compute_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_verifier_shape() {
        let pkce = PkceChallenge::generate();

        assert!(pkce.verifier().len() >= 43);
        assert!(pkce.verifier().len() <= 128);
        assert!(
            pkce.verifier()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_eq!(pkce.challenge(), compute_challenge(pkce.verifier()));
        assert_eq!(pkce.method(), "S256");
    }

    #[test]
    fn test_verifiers_never_collide() {
        let verifiers: HashSet<String> = (0..10_000).map(|_| generate_verifier()).collect();
        assert_eq!(verifiers.len(), 10_000);
    }

    #[test]
    fn test_state_is_unique() {
        assert_ne!(generate_state(), generate_state());
    }
}
