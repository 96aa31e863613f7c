//! Identity gateway for the Plaza API
//!
//! Validates bearer JWTs and exposes the caller's identity through an axum
//! extractor that works with any state implementing `FromRef<S>` for
//! `AuthBackend`. The identity carried by a valid token is trusted verbatim.

mod backend;
mod claims;
mod config;
mod context;
mod error;
mod extractors;
mod jwt;

pub use backend::AuthBackend;
pub use claims::IdentityClaims;
pub use config::AuthConfig;
pub use context::{AuthContext, AuthIdentity};
pub use error::AuthError;
pub use extractors::AuthUser;
