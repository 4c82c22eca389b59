//! Compact security tokens: creation, reading and validation.
//!
//! Builds on [`sentinel_tokens`] for keys, credentials and crypto. The
//! pieces here are the compact codec ([`codec`]), the parsed token
//! model ([`JwtToken`]), the ordered validation pipeline
//! ([`JwtTokenHandler::validate_token`]) and claims projection into a
//! [`ClaimsPrincipal`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use sentinel_jwt::{JwtTokenHandler, SecurityTokenDescriptor, TokenValidationParameters};
//! use sentinel_tokens::{SecurityKey, SignatureAlgorithm, SigningCredentials, TokenResult};
//!
//! fn issue_and_check() -> TokenResult<()> {
//!     let key = Arc::new(SecurityKey::symmetric([7u8; 32]).with_key_id("K1"));
//!     let handler = JwtTokenHandler::new();
//!
//!     let token = handler.create_token(&SecurityTokenDescriptor {
//!         issuer: Some("https://idp.example".into()),
//!         audience: Some("api".into()),
//!         signing_credentials: Some(SigningCredentials::new(
//!             Arc::clone(&key),
//!             SignatureAlgorithm::Hs256,
//!         )),
//!         ..SecurityTokenDescriptor::default()
//!     })?;
//!
//!     let params = TokenValidationParameters::new()
//!         .with_issuer("https://idp.example")
//!         .with_audience("api")
//!         .with_signing_key(key);
//!     let (principal, _token) = handler.validate_token(&token, &params)?;
//!     println!("{} claims", principal.primary().map_or(0, |i| i.claims().len()));
//!     Ok(())
//! }
//! ```

pub mod claims;
pub mod codec;
pub mod constants;
mod handler;
mod header;
mod payload;
mod token;
pub mod validation;

pub use claims::{Claim, ClaimTypeMaps, ClaimsIdentity, ClaimsPrincipal, SHORT_CLAIM_TYPE_PROPERTY};
pub use handler::{JwtTokenHandler, SecurityTokenDescriptor};
pub use header::JwtHeader;
pub use payload::JwtPayload;
pub use token::{JweToken, JwsToken, JwtToken};
pub use validation::{
    AudienceValidator, IssuerSigningKeyValidator, IssuerValidator, KeyResolver,
    LifetimeValidator, SignatureValidator, TokenValidationParameters,
};
