//! RS256 JWT-bearer assertions.

pub mod builder;
pub mod claims;
pub mod nonce;
pub mod serializer;
pub mod signer;

pub use builder::{AssertionBuilder, JwtAssertion, DEFAULT_ASSERTION_TTL_SECONDS};
pub use claims::{AssertionClaims, AssertionHeader};
pub use nonce::NonceGenerator;
pub use serializer::JwtSerializer;
pub use signer::RsaSigner;
