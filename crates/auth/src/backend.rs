//! Concrete authentication backend

use crate::config::AuthConfig;
use crate::context::{AuthContext, AuthIdentity};
use crate::error::AuthError;

/// Concrete authentication backend.
///
/// Domain states expose this via `FromRef`:
/// ```ignore
/// impl FromRef<MyDomainState> for AuthBackend {
///     fn from_ref(state: &MyDomainState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct AuthBackend {
    config: AuthConfig,
}

impl AuthBackend {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Turn a bearer token into the caller's context
    pub fn authenticate_jwt(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = crate::jwt::validate_jwt_token(token, &self.config)?;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidUserId);
        }

        let expires_at = chrono::DateTime::from_timestamp(claims.exp as i64, 0);
        Ok(AuthContext::new(AuthIdentity::from_claims(&claims), expires_at))
    }
}
