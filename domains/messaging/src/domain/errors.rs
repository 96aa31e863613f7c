//! Messaging error taxonomy

use plaza_common::{Error, RepositoryError};
use uuid::Uuid;

/// Errors surfaced by the messaging service.
///
/// Validation, authorization and not-found variants are always raised before
/// any store mutation. `Repository(AlreadyExists)` from a conversation create
/// is recovered inside the service and never reaches a caller.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("Message content must not be empty")]
    EmptyContent,

    #[error("Message content must be at most {max} characters")]
    ContentTooLong { max: usize },

    #[error("Cannot start a conversation with yourself")]
    SelfConversation,

    #[error("{0}")]
    InvalidTarget(String),

    #[error("Recipient {0} not found")]
    RecipientNotFound(String),

    #[error("Conversation {0} not found")]
    ConversationNotFound(Uuid),

    #[error("Sender is not a participant of this conversation")]
    NotParticipant,

    #[error("Caller is not a participant of this conversation")]
    Forbidden,

    #[error("Store call '{operation}' exceeded its deadline")]
    Timeout { operation: &'static str },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl MessagingError {
    /// Whether this error was raised by input validation
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MessagingError::EmptyContent
                | MessagingError::ContentTooLong { .. }
                | MessagingError::SelfConversation
                | MessagingError::InvalidTarget(_)
        )
    }
}

impl From<MessagingError> for Error {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::EmptyContent
            | MessagingError::ContentTooLong { .. }
            | MessagingError::SelfConversation
            | MessagingError::InvalidTarget(_) => Error::Validation(err.to_string()),
            MessagingError::RecipientNotFound(_) | MessagingError::ConversationNotFound(_) => {
                Error::NotFound(err.to_string())
            }
            MessagingError::NotParticipant | MessagingError::Forbidden => {
                Error::Authorization(err.to_string())
            }
            MessagingError::Timeout { .. } => Error::Timeout(err.to_string()),
            MessagingError::Repository(e) => e.into(),
        }
    }
}
