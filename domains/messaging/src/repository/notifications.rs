//! Postgres notification store

use async_trait::async_trait;
use sqlx::PgPool;

use super::{NotificationStore, StoreResult};
use crate::domain::entities::{Notification, NotificationKind};

#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert_batch(&self, notifications: &[Notification]) -> StoreResult<()> {
        if notifications.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for n in notifications {
            sqlx::query(
                r#"
                INSERT INTO notifications (
                    id, recipient_id, kind, title, body, link_ref,
                    source_user_id, source_name, read, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(n.id)
            .bind(&n.recipient_id)
            .bind(n.kind)
            .bind(&n.title)
            .bind(&n.body)
            .bind(n.link_ref)
            .bind(&n.source_user_id)
            .bind(&n.source_name)
            .bind(n.read)
            .bind(n.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn list_for_recipient(&self, recipient_id: &str) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, recipient_id, kind, title, body, link_ref,
                   source_user_id, source_name, read, created_at
            FROM notifications
            WHERE recipient_id = $1 AND kind = $2
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(recipient_id)
        .bind(NotificationKind::Message)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
