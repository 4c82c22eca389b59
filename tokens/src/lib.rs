//! Key model, credentials, crypto invocation layer, JWKS materialization
//! and replay cache for the sentinel token stack.
//!
//! This crate knows nothing about compact serialization or the
//! validation pipeline; it supplies the pieces the `sentinel_jwt` crate
//! binds together:
//! - [`SecurityKey`] and [`KeyMaterial`] — the credential/key model
//! - [`SigningCredentials`] / [`EncryptingCredentials`]
//! - [`crypto`] — key+algorithm dispatch over the platform primitives
//! - [`JsonWebKeySet`] — raw key descriptors with partial-failure
//!   materialization
//! - [`TokenReplayCache`] — single-use token tracking
//! - [`TokenError`] — the shared failure taxonomy

mod algorithms;
mod credentials;
mod error;
mod jwks;
mod keys;
mod replay;

pub mod crypto;

pub use algorithms::{EncryptionAlgorithm, SignatureAlgorithm, DIRECT_KEY_USE_ALG};
pub use credentials::{EncryptingCredentials, SigningCredentials};
pub use error::{FailureCategory, TokenError, TokenResult};
pub use jwks::{JsonWebKey, JsonWebKeySet, KeyConversionFailure, KeySetConversion};
pub use keys::{certificate_thumbprint, EcKey, KeyMaterial, SecurityKey};
pub use replay::{InMemoryReplayCache, TokenReplayCache};
