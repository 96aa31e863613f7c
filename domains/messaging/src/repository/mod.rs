//! Store traits and implementations for the messaging domain
//!
//! Each store is a trait object so the service runs unchanged against
//! Postgres or the in-memory stores. Implementations must not hold an
//! in-process lock across a call into another store.

pub mod conversations;
pub mod memory;
pub mod messages;
pub mod notifications;
pub mod participants;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plaza_common::RepositoryError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::clock::Clock;
use crate::domain::entities::{
    Conversation, Message, NewMessage, Notification, ParticipantProfile,
};

pub use conversations::PgConversationStore;
pub use memory::{
    InMemoryConversationStore, InMemoryMessageStore, InMemoryNotificationStore,
    InMemoryParticipantDirectory,
};
pub use messages::PgMessageStore;
pub use notifications::PgNotificationStore;
pub use participants::PgParticipantDirectory;

/// Store result type
pub type StoreResult<T> = std::result::Result<T, RepositoryError>;

/// Owns two-party conversations and the one-per-pair invariant
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Conversation>>;

    /// Single keyed lookup on the normalized participant pair
    async fn find_direct(&self, user_a: &str, user_b: &str) -> StoreResult<Option<Conversation>>;

    /// Insert a conversation for the pair.
    ///
    /// Fails with `RepositoryError::AlreadyExists` if the pair already has
    /// one; the check is atomic with the insert.
    async fn create_direct(
        &self,
        snapshot_a: &ParticipantProfile,
        snapshot_b: &ParticipantProfile,
        related_context_id: Option<&str>,
    ) -> StoreResult<Conversation>;

    /// Update the last-message summary unless `at` is not newer than the
    /// stored one. Returns whether the summary changed.
    async fn touch_last_message(&self, id: Uuid, text: &str, at: DateTime<Utc>)
        -> StoreResult<bool>;

    /// Conversations of `user_id`, most recent activity first, ties by id
    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<Conversation>>;
}

/// Owns ordered messages and read receipts
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append with a store-assigned, strictly increasing `sequence` and
    /// `created_at` within the conversation
    async fn append(&self, draft: &NewMessage) -> StoreResult<Message>;

    /// Messages of a conversation in thread order
    async fn list_for_conversation(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>>;

    /// Set `read_at = at` on every unread message not sent by `reader_id`.
    /// Returns how many messages changed. Applied as one batch.
    async fn mark_read_except(
        &self,
        conversation_id: Uuid,
        reader_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    /// Unread messages `reader_id` has received in the conversation
    async fn count_unread(&self, conversation_id: Uuid, reader_id: &str) -> StoreResult<u64>;
}

/// Persists fanout output for the delivery pipeline
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist all records or none
    async fn insert_batch(&self, notifications: &[Notification]) -> StoreResult<()>;

    /// Newest first
    async fn list_for_recipient(&self, recipient_id: &str) -> StoreResult<Vec<Notification>>;
}

/// Resolves user ids to display data
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    async fn lookup(&self, user_id: &str) -> StoreResult<Option<ParticipantProfile>>;
}

/// Combined store access for the messaging domain
#[derive(Clone)]
pub struct MessagingRepositories {
    pub conversations: Arc<dyn ConversationStore>,
    pub messages: Arc<dyn MessageStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub directory: Arc<dyn ParticipantDirectory>,
}

impl MessagingRepositories {
    /// Postgres-backed stores sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            conversations: Arc::new(PgConversationStore::new(pool.clone())),
            messages: Arc::new(PgMessageStore::new(pool.clone())),
            notifications: Arc::new(PgNotificationStore::new(pool.clone())),
            directory: Arc::new(PgParticipantDirectory::new(pool)),
        }
    }

    /// In-memory stores around the given directory
    pub fn in_memory(directory: Arc<InMemoryParticipantDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self {
            conversations: Arc::new(InMemoryConversationStore::new(clock.clone())),
            messages: Arc::new(InMemoryMessageStore::new(clock)),
            notifications: Arc::new(InMemoryNotificationStore::default()),
            directory,
        }
    }
}
