//! Compact JWS serialization.

use crate::error::TokenError;
use crate::jwt::claims::{AssertionClaims, AssertionHeader};
use crate::jwt::signer::RsaSigner;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes and decodes `header.payload.signature` strings.
pub struct JwtSerializer;

impl JwtSerializer {
    /// Base64url (no padding) of the JSON encoding of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encoding`] if `value` cannot be serialized.
    pub fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
        Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(value)?))
    }

    /// `base64url(header) + "." + base64url(claims)`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encoding`] on serialization failure.
    pub fn signing_input(
        header: &AssertionHeader,
        claims: &AssertionClaims,
    ) -> Result<String, TokenError> {
        Ok(format!(
            "{}.{}",
            Self::encode_segment(header)?,
            Self::encode_segment(claims)?
        ))
    }

    /// Sign header and claims into a compact token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encoding`] on serialization or signing failure.
    pub fn serialize(
        header: &AssertionHeader,
        claims: &AssertionClaims,
        signer: &RsaSigner,
    ) -> Result<String, TokenError> {
        let signing_input = Self::signing_input(header, claims)?;
        let signature = signer.sign(signing_input.as_bytes())?;
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Decode header and claims without checking the signature.
    ///
    /// Only for diagnostics; never trust the result.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encoding`] if the token is not three segments
    /// of base64url JSON.
    pub fn deserialize_unverified<H, C>(token: &str) -> Result<(H, C), TokenError>
    where
        H: DeserializeOwned,
        C: DeserializeOwned,
    {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(TokenError::encoding("Invalid token format"));
        }
        Ok((decode_segment(parts[0])?, decode_segment(parts[1])?))
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::encoding(e.to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}
