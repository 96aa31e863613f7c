//! Message API handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use plaza_auth::AuthUser;
use plaza_common::{Result, ValidatedJson};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::caller_profile;
use crate::api::middleware::MessagingState;
use crate::domain::entities::Message;
use crate::service::MessageTarget;

/// Request for sending a message.
///
/// Exactly one of `conversation_id` and `recipient_id` must be set.
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub conversation_id: Option<Uuid>,

    #[validate(length(min = 1, max = 128))]
    pub recipient_id: Option<String>,

    /// Only recorded when this message creates the conversation
    #[validate(length(min = 1, max = 128))]
    pub context_id: Option<String>,

    /// Message content; trimmed and length-checked by the domain
    pub content: String,
}

/// Message response DTO
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            sender_id: m.sender_id,
            sender_name: m.sender_name,
            content: m.content,
            sequence: m.sequence,
            created_at: m.created_at,
            read_at: m.read_at,
        }
    }
}

/// Send a message. Deferred fanout is not visible to the caller.
pub async fn send_message(
    AuthUser(ctx): AuthUser,
    State(state): State<MessagingState>,
    ValidatedJson(req): ValidatedJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let target = MessageTarget::from_parts(req.conversation_id, req.recipient_id, req.context_id)?;

    let outcome = state
        .service
        .send_message(&caller_profile(&ctx), target, &req.content)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome.message.into())))
}
