//! Replay nonce (`jti`) generation.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of every generated nonce.
pub const NONCE_LENGTH: usize = 32;

/// Generates mixed-case alphanumeric nonces from the thread-local CSPRNG.
pub struct NonceGenerator;

impl NonceGenerator {
    /// A fresh 32-character nonce.
    #[must_use]
    pub fn generate() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LENGTH)
            .map(char::from)
            .collect()
    }
}
