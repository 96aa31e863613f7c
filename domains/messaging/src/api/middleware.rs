//! Messaging domain state and auth backend integration

use axum::extract::FromRef;
use plaza_auth::AuthBackend;

use crate::service::MessagingService;

/// Application state for the messaging routes
#[derive(Clone)]
pub struct MessagingState {
    pub service: MessagingService,
    pub auth: AuthBackend,
}

impl MessagingState {
    pub fn new(service: MessagingService, auth: AuthBackend) -> Self {
        Self { service, auth }
    }
}

impl FromRef<MessagingState> for AuthBackend {
    fn from_ref(state: &MessagingState) -> Self {
        state.auth.clone()
    }
}
