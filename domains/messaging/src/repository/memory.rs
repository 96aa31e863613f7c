//! In-memory stores
//!
//! Used for local runs without a database and by the test suites. Locks are
//! only held for the duration of a map operation.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use plaza_common::RepositoryError;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{
    ConversationStore, MessageStore, NotificationStore, ParticipantDirectory, StoreResult,
};
use crate::domain::clock::Clock;
use crate::domain::entities::{
    pair_key, Conversation, Message, NewMessage, Notification, ParticipantProfile,
};

/// Pair and per-user lookups. Conversations themselves live in their own
/// entries so summary writes on one never wait on another.
#[derive(Default)]
struct ConversationIndex {
    by_pair: HashMap<String, Uuid>,
    by_user: HashMap<String, BTreeSet<Uuid>>,
}

type ConversationEntry = Arc<Mutex<Conversation>>;

pub struct InMemoryConversationStore {
    index: RwLock<ConversationIndex>,
    entries: RwLock<HashMap<Uuid, ConversationEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryConversationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            index: RwLock::new(ConversationIndex::default()),
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored conversations
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    #[mutants::skip] // Delegates to len()
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn entry(&self, id: Uuid) -> Option<ConversationEntry> {
        self.entries.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        match self.entry(id).await {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn find_direct(&self, user_a: &str, user_b: &str) -> StoreResult<Option<Conversation>> {
        let id = self
            .index
            .read()
            .await
            .by_pair
            .get(&pair_key(user_a, user_b))
            .copied();
        match id {
            Some(id) => self.find(id).await,
            None => Ok(None),
        }
    }

    async fn create_direct(
        &self,
        snapshot_a: &ParticipantProfile,
        snapshot_b: &ParticipantProfile,
        related_context_id: Option<&str>,
    ) -> StoreResult<Conversation> {
        let conversation = Conversation::new_direct(
            snapshot_a.clone(),
            snapshot_b.clone(),
            related_context_id.map(str::to_string),
            self.clock.now(),
        )
        .map_err(|e| RepositoryError::InvalidData(e.to_string()))?;
        let key = conversation.pair_key();

        // Index lock first, then entries; the pair check and both inserts
        // happen under the index lock
        let mut index = self.index.write().await;
        if index.by_pair.contains_key(&key) {
            return Err(RepositoryError::AlreadyExists);
        }
        self.entries
            .write()
            .await
            .insert(conversation.id, Arc::new(Mutex::new(conversation.clone())));
        index.by_pair.insert(key, conversation.id);
        for user_id in conversation.participant_ids() {
            index
                .by_user
                .entry(user_id.to_string())
                .or_default()
                .insert(conversation.id);
        }

        Ok(conversation)
    }

    async fn touch_last_message(
        &self,
        id: Uuid,
        text: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let entry = self.entry(id).await.ok_or(RepositoryError::NotFound)?;
        let mut conversation = entry.lock().await;
        Ok(conversation.apply_last_message(text, at))
    }

    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<Conversation>> {
        let ids: Vec<Uuid> = self
            .index
            .read()
            .await
            .by_user
            .get(user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();

        let mut conversations = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(conversation) = self.find(id).await? {
                conversations.push(conversation);
            }
        }

        conversations.sort_by(|a, b| {
            b.activity_at()
                .cmp(&a.activity_at())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(conversations)
    }
}

#[derive(Default)]
struct Thread {
    messages: Vec<Message>,
}

pub struct InMemoryMessageStore {
    threads: RwLock<HashMap<Uuid, Arc<Mutex<Thread>>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryMessageStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
            clock,
        }
    }

    async fn thread(&self, conversation_id: Uuid) -> Option<Arc<Mutex<Thread>>> {
        self.threads.read().await.get(&conversation_id).cloned()
    }

    async fn thread_or_create(&self, conversation_id: Uuid) -> Arc<Mutex<Thread>> {
        if let Some(thread) = self.thread(conversation_id).await {
            return thread;
        }
        self.threads
            .write()
            .await
            .entry(conversation_id)
            .or_default()
            .clone()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, draft: &NewMessage) -> StoreResult<Message> {
        let thread = self.thread_or_create(draft.conversation_id()).await;
        let mut thread = thread.lock().await;

        let now = self.clock.now();
        let (sequence, created_at) = match thread.messages.last() {
            Some(prev) if now <= prev.created_at => {
                (prev.sequence + 1, prev.created_at + Duration::nanoseconds(1))
            }
            Some(prev) => (prev.sequence + 1, now),
            None => (1, now),
        };

        let message = Message {
            id: draft.id(),
            conversation_id: draft.conversation_id(),
            sender_id: draft.sender_id().to_string(),
            sender_name: draft.sender_name().to_string(),
            content: draft.content().to_string(),
            sequence,
            created_at,
            read_at: None,
        };
        thread.messages.push(message.clone());

        Ok(message)
    }

    async fn list_for_conversation(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>> {
        match self.thread(conversation_id).await {
            Some(thread) => Ok(thread.lock().await.messages.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn mark_read_except(
        &self,
        conversation_id: Uuid,
        reader_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let Some(thread) = self.thread(conversation_id).await else {
            return Ok(0);
        };
        let mut thread = thread.lock().await;

        let mut marked = 0u64;
        for message in thread.messages.iter_mut() {
            if message.sender_id != reader_id && message.mark_read(at) {
                marked += 1;
            }
        }

        Ok(marked)
    }

    async fn count_unread(&self, conversation_id: Uuid, reader_id: &str) -> StoreResult<u64> {
        let Some(thread) = self.thread(conversation_id).await else {
            return Ok(0);
        };
        let thread = thread.lock().await;
        Ok(thread
            .messages
            .iter()
            .filter(|m| m.is_unread_by(reader_id))
            .count() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryNotificationStore {
    records: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationStore {
    /// Every stored notification, in insertion order
    pub async fn all(&self) -> Vec<Notification> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert_batch(&self, notifications: &[Notification]) -> StoreResult<()> {
        self.records
            .write()
            .await
            .extend(notifications.iter().cloned());
        Ok(())
    }

    async fn list_for_recipient(&self, recipient_id: &str) -> StoreResult<Vec<Notification>> {
        let mut rows: Vec<Notification> = self
            .records
            .read()
            .await
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryParticipantDirectory {
    profiles: RwLock<HashMap<String, ParticipantProfile>>,
}

impl InMemoryParticipantDirectory {
    pub fn from_profiles(profiles: impl IntoIterator<Item = ParticipantProfile>) -> Self {
        Self {
            profiles: RwLock::new(
                profiles
                    .into_iter()
                    .map(|p| (p.user_id.clone(), p))
                    .collect(),
            ),
        }
    }

    /// Add or replace a profile
    pub async fn insert(&self, profile: ParticipantProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl ParticipantDirectory for InMemoryParticipantDirectory {
    async fn lookup(&self, user_id: &str) -> StoreResult<Option<ParticipantProfile>> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }
}
