//! Classification of token endpoint failures.
//!
//! The endpoint reports no structured reason for a 401, so the message text
//! is matched case-insensitively. All matching lives here so it can be
//! swapped for error codes without touching the client.

use crate::error::TokenError;
use crate::module::ModuleIdentity;

/// Map a non-2xx token endpoint response to a [`TokenError`].
#[must_use]
pub fn classify_failure(
    module: ModuleIdentity,
    key_id: &str,
    status: u16,
    message: &str,
) -> TokenError {
    if status == 401 {
        let lower = message.to_lowercase();
        if lower.contains("kid") || lower.contains("key") {
            return TokenError::KeyNotRegistered {
                module,
                key_id: key_id.to_string(),
                message: message.to_string(),
            };
        }
        if lower.contains("verify jwt token") {
            return TokenError::SignatureVerification {
                module,
                message: message.to_string(),
            };
        }
    }
    TokenError::exchange(Some(status), message)
}
