//! Authenticated caller context

use chrono::{DateTime, Utc};

use crate::claims::IdentityClaims;

/// Identity of the caller as asserted by the identity provider
#[derive(Debug, Clone, PartialEq)]
pub struct AuthIdentity {
    pub id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub email: Option<String>,
}

impl AuthIdentity {
    /// Build an identity from validated claims.
    ///
    /// The display name falls back to the email, then to the subject, so a
    /// caller always has something to show.
    pub fn from_claims(claims: &IdentityClaims) -> Self {
        let display_name = claims
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or(claims.email.as_deref())
            .unwrap_or(&claims.sub)
            .to_string();

        Self {
            id: claims.sub.clone(),
            display_name,
            avatar_ref: claims.picture.clone(),
            email: claims.email.clone(),
        }
    }
}

/// Represents an authenticated request context
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: AuthIdentity,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthContext {
    pub fn new(user: AuthIdentity, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { user, expires_at }
    }

    /// The stable id of the caller
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}
