//! Postgres message store
//!
//! Appends serialize per conversation on its `message_counters` row, which
//! hands out the next sequence and a `created_at` that never goes backwards.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{MessageStore, StoreResult};
use crate::domain::entities::{Message, NewMessage};

#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn append(&self, draft: &NewMessage) -> StoreResult<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            WITH next AS (
                INSERT INTO message_counters (conversation_id, last_sequence, last_created_at)
                VALUES ($2, 1, clock_timestamp())
                ON CONFLICT (conversation_id) DO UPDATE SET
                    last_sequence = message_counters.last_sequence + 1,
                    last_created_at = GREATEST(
                        clock_timestamp(),
                        message_counters.last_created_at + INTERVAL '1 microsecond'
                    )
                RETURNING last_sequence, last_created_at
            )
            INSERT INTO messages (
                id, conversation_id, sender_id, sender_name, content,
                sequence, created_at, read_at
            )
            SELECT $1, $2, $3, $4, $5, next.last_sequence, next.last_created_at, NULL
            FROM next
            RETURNING id, conversation_id, sender_id, sender_name, content,
                      sequence, created_at, read_at
            "#,
        )
        .bind(draft.id())
        .bind(draft.conversation_id())
        .bind(draft.sender_id())
        .bind(draft.sender_name())
        .bind(draft.content())
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    async fn list_for_conversation(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, conversation_id, sender_id, sender_name, content,
                   sequence, created_at, read_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn mark_read_except(
        &self,
        conversation_id: Uuid,
        reader_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET read_at = $3
            WHERE conversation_id = $1
              AND sender_id <> $2
              AND read_at IS NULL
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_unread(&self, conversation_id: Uuid, reader_id: &str) -> StoreResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE conversation_id = $1
              AND sender_id <> $2
              AND read_at IS NULL
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}
