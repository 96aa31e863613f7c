//! Domain entities for the messaging domain
//!
//! Conversations are strictly two-party. Participant display data is a
//! snapshot taken when the conversation is created and is never re-synced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::MessagingError;

/// Maximum message length in characters, after trimming
pub const MAX_CONTENT_LENGTH: usize = 5000;

/// Deterministic key for an unordered pair of user ids.
///
/// `pair_key(a, b) == pair_key(b, a)` for all `a`, `b`. The lower id is
/// length-prefixed, so any two distinct pairs map to distinct keys whatever
/// characters the ids contain.
pub fn pair_key(user_a: &str, user_b: &str) -> String {
    let (low, high) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("{}:{low}{high}", low.len())
}

/// Display snapshot of a platform user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ParticipantProfile {
    pub user_id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

impl ParticipantProfile {
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        avatar_ref: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            avatar_ref,
        }
    }
}

/// Two-party conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    /// Exactly two distinct participants, ordered by `user_id`
    pub participants: [ParticipantProfile; 2],
    pub last_message_text: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    /// Provenance, e.g. the job listing the first message was sent from
    pub related_context_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new direct conversation between two distinct users
    pub fn new_direct(
        snapshot_a: ParticipantProfile,
        snapshot_b: ParticipantProfile,
        related_context_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, MessagingError> {
        if snapshot_a.user_id.is_empty() || snapshot_b.user_id.is_empty() {
            return Err(MessagingError::InvalidTarget(
                "Participant ids must not be empty".to_string(),
            ));
        }
        if snapshot_a.user_id == snapshot_b.user_id {
            return Err(MessagingError::SelfConversation);
        }

        let participants = if snapshot_a.user_id < snapshot_b.user_id {
            [snapshot_a, snapshot_b]
        } else {
            [snapshot_b, snapshot_a]
        };

        Ok(Self {
            id: Uuid::new_v4(),
            participants,
            last_message_text: None,
            last_message_at: None,
            related_context_id,
            created_at,
        })
    }

    /// Normalized key of the participant pair
    pub fn pair_key(&self) -> String {
        pair_key(&self.participants[0].user_id, &self.participants[1].user_id)
    }

    pub fn participant_ids(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.user_id.as_str())
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant_ids().any(|id| id == user_id)
    }

    /// Whether this conversation is between exactly `user_a` and `user_b`
    pub fn is_between(&self, user_a: &str, user_b: &str) -> bool {
        user_a != user_b && self.has_participant(user_a) && self.has_participant(user_b)
    }

    /// Snapshot of the given participant
    pub fn participant(&self, user_id: &str) -> Option<&ParticipantProfile> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Snapshot of the participant that is not `user_id`.
    ///
    /// `None` when `user_id` is not in the conversation.
    pub fn other_participant(&self, user_id: &str) -> Option<&ParticipantProfile> {
        if !self.has_participant(user_id) {
            return None;
        }
        self.participants.iter().find(|p| p.user_id != user_id)
    }

    /// Timestamp used to order a user's conversation list
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.created_at)
    }

    /// Apply a last-message summary if it is newer than the stored one.
    ///
    /// Returns whether the summary changed.
    pub fn apply_last_message(&mut self, text: &str, at: DateTime<Utc>) -> bool {
        match self.last_message_at {
            Some(current) if at <= current => false,
            _ => {
                self.last_message_text = Some(text.to_string());
                self.last_message_at = Some(at);
                true
            }
        }
    }
}

/// Validated message waiting to be appended.
///
/// Fields are private so a draft can only exist with non-empty content.
/// The message id is assigned here, before the store sees the draft, so a
/// message can be traced even when its append outlives the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: String,
    sender_name: String,
    content: String,
}

impl NewMessage {
    pub fn new(
        conversation_id: Uuid,
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        content: &str,
    ) -> Result<Self, MessagingError> {
        Ok(Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            content: Self::normalize_content(content)?,
        })
    }

    /// Trim and check message content
    pub fn normalize_content(content: &str) -> Result<String, MessagingError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(MessagingError::EmptyContent);
        }
        if trimmed.chars().count() > MAX_CONTENT_LENGTH {
            return Err(MessagingError::ContentTooLong {
                max: MAX_CONTENT_LENGTH,
            });
        }
        Ok(trimmed.to_string())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn sender_name(&self) -> &str {
        &self.sender_name
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    /// Store-assigned ordinal, strictly increasing within a conversation
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }

    /// Whether `reader_id` still has this message to read
    pub fn is_unread_by(&self, reader_id: &str) -> bool {
        self.sender_id != reader_id && self.is_unread()
    }

    /// Set `read_at` once. Later calls leave the first timestamp in place.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.read_at.is_some() {
            return false;
        }
        self.read_at = Some(at);
        true
    }
}

/// Notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Message,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Message => write!(f, "message"),
        }
    }
}

/// Notification record for the external delivery pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Conversation the notification points at (weak reference)
    pub link_ref: Uuid,
    pub source_user_id: String,
    pub source_name: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A conversation as seen by one of its participants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: Uuid,
    pub other_participant: ParticipantProfile,
    pub last_message_text: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub related_context_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub unread_count: u64,
}

impl ConversationSummary {
    /// Project `conversation` for `viewer_id`; `None` if the viewer is not a participant
    pub fn for_viewer(
        conversation: &Conversation,
        viewer_id: &str,
        unread_count: u64,
    ) -> Option<Self> {
        let other = conversation.other_participant(viewer_id)?;
        Some(Self {
            conversation_id: conversation.id,
            other_participant: other.clone(),
            last_message_text: conversation.last_message_text.clone(),
            last_message_at: conversation.last_message_at,
            related_context_id: conversation.related_context_id.clone(),
            created_at: conversation.created_at,
            unread_count,
        })
    }
}
