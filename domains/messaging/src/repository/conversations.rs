//! Postgres conversation store
//!
//! Uniqueness of a participant pair is enforced by the UNIQUE constraint on
//! `conversations.pair_key`, not by a read before the insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plaza_common::RepositoryError;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ConversationStore, StoreResult};
use crate::domain::entities::{pair_key, Conversation, ParticipantProfile};

const CONVERSATION_COLUMNS: &str = r#"
    id, participant_a_id, participant_a_name, participant_a_avatar,
    participant_b_id, participant_b_name, participant_b_avatar,
    last_message_text, last_message_at, related_context_id, created_at
"#;

/// Flat row shape of `conversations`
#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    participant_a_id: String,
    participant_a_name: String,
    participant_a_avatar: Option<String>,
    participant_b_id: String,
    participant_b_name: String,
    participant_b_avatar: Option<String>,
    last_message_text: Option<String>,
    last_message_at: Option<DateTime<Utc>>,
    related_context_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            id: row.id,
            participants: [
                ParticipantProfile {
                    user_id: row.participant_a_id,
                    display_name: row.participant_a_name,
                    avatar_ref: row.participant_a_avatar,
                },
                ParticipantProfile {
                    user_id: row.participant_b_id,
                    display_name: row.participant_b_name,
                    avatar_ref: row.participant_b_avatar,
                },
            ],
            last_message_text: row.last_message_text,
            last_message_at: row.last_message_at,
            related_context_id: row.related_context_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn find(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_direct(&self, user_a: &str, user_b: &str) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE pair_key = $1"
        ))
        .bind(pair_key(user_a, user_b))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
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
            Utc::now(),
        )
        .map_err(|e| RepositoryError::InvalidData(e.to_string()))?;
        let [a, b] = &conversation.participants;

        // No row back means the pair key already exists
        let created = sqlx::query_as::<_, ConversationRow>(&format!(
            r#"
            INSERT INTO conversations (
                id, pair_key,
                participant_a_id, participant_a_name, participant_a_avatar,
                participant_b_id, participant_b_name, participant_b_avatar,
                last_message_text, last_message_at, related_context_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL, NULL, $9, $10)
            ON CONFLICT (pair_key) DO NOTHING
            RETURNING {CONVERSATION_COLUMNS}
            "#
        ))
        .bind(conversation.id)
        .bind(conversation.pair_key())
        .bind(&a.user_id)
        .bind(&a.display_name)
        .bind(&a.avatar_ref)
        .bind(&b.user_id)
        .bind(&b.display_name)
        .bind(&b.avatar_ref)
        .bind(&conversation.related_context_id)
        .bind(conversation.created_at)
        .fetch_optional(&self.pool)
        .await?;

        created
            .map(Into::into)
            .ok_or(RepositoryError::AlreadyExists)
    }

    async fn touch_last_message(
        &self,
        id: Uuid,
        text: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE conversations SET
                last_message_text = $2,
                last_message_at = $3
            WHERE id = $1
              AND (last_message_at IS NULL OR last_message_at < $3)
            "#,
        )
        .bind(id)
        .bind(text)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Distinguish a stale update from an unknown conversation
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM conversations WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            Ok(false)
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, ConversationRow>(&format!(
            r#"
            SELECT {CONVERSATION_COLUMNS}
            FROM conversations
            WHERE participant_a_id = $1 OR participant_b_id = $1
            ORDER BY COALESCE(last_message_at, created_at) DESC, id ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
