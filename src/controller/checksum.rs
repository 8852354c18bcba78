//! # Credential Checksum
//!
//! Admin credential generation and the fingerprint that ties the Deployment to the
//! Secret it reads its credentials from. Whenever the fingerprint on the Secret changes,
//! the Deployment's pod template annotation changes with it and Kubernetes rolls out
//! new pods.

use crate::constants::CREDENTIAL_LENGTH;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Alphabet of generated usernames and passwords: ASCII letters and digits
pub const CREDENTIAL_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generated admin username and password
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Generate a fresh random pair
    #[must_use]
    pub fn generate() -> Self {
        Self {
            username: random_string(CREDENTIAL_LENGTH),
            password: random_string(CREDENTIAL_LENGTH),
        }
    }

    /// Fingerprint of this pair
    #[must_use]
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.username, &self.password)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Hex-encoded SHA-256 of the length-prefixed `username` followed by `password`
///
/// The big-endian `u64` byte length of the username keeps ("ab", "c") and ("a", "bc")
/// apart.
#[must_use]
pub fn fingerprint(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((username.len() as u64).to_be_bytes());
    hasher.update(username.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Random string of `length` characters from [`CREDENTIAL_ALPHABET`]
#[must_use]
pub fn random_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CREDENTIAL_ALPHABET.len());
            char::from(CREDENTIAL_ALPHABET[idx])
        })
        .collect()
}
