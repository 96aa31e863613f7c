//! Postgres participant directory
//!
//! Read-only view over `user_profiles`, which the profile service owns.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{ParticipantDirectory, StoreResult};
use crate::domain::entities::ParticipantProfile;

#[derive(Clone)]
pub struct PgParticipantDirectory {
    pool: PgPool,
}

impl PgParticipantDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantDirectory for PgParticipantDirectory {
    async fn lookup(&self, user_id: &str) -> StoreResult<Option<ParticipantProfile>> {
        let profile = sqlx::query_as::<_, ParticipantProfile>(
            r#"
            SELECT id AS user_id, display_name, avatar_ref
            FROM user_profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}
