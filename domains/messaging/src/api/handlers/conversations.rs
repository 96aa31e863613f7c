//! Conversation API handlers

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use plaza_auth::AuthUser;
use plaza_common::{Result, ValidatedJson};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::caller_profile;
use super::messages::MessageResponse;
use crate::api::middleware::MessagingState;
use crate::domain::entities::{Conversation, ConversationSummary, ParticipantProfile};

/// Request for starting (or resuming) a conversation
#[derive(Debug, Deserialize, Validate)]
pub struct StartConversationRequest {
    #[validate(length(min = 1, max = 128))]
    pub recipient_id: String,

    /// Where the conversation was started from, e.g. a job listing id
    #[validate(length(min = 1, max = 128))]
    pub context_id: Option<String>,
}

/// Conversation response DTO
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub participants: Vec<ParticipantProfile>,
    pub last_message_text: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub related_context_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            participants: c.participants.into(),
            last_message_text: c.last_message_text,
            last_message_at: c.last_message_at,
            related_context_id: c.related_context_id,
            created_at: c.created_at,
        }
    }
}

/// Conversation list entry, seen from the caller
#[derive(Debug, Serialize)]
pub struct ConversationSummaryResponse {
    pub id: Uuid,
    pub other_participant: ParticipantProfile,
    pub last_message_text: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub related_context_id: Option<String>,
    pub unread_count: u64,
    pub created_at: DateTime<Utc>,
}

impl From<ConversationSummary> for ConversationSummaryResponse {
    fn from(s: ConversationSummary) -> Self {
        Self {
            id: s.conversation_id,
            other_participant: s.other_participant,
            last_message_text: s.last_message_text,
            last_message_at: s.last_message_at,
            related_context_id: s.related_context_id,
            unread_count: s.unread_count,
            created_at: s.created_at,
        }
    }
}

/// Conversation with its thread
#[derive(Debug, Serialize)]
pub struct ConversationDetailResponse {
    pub conversation: ConversationResponse,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub marked: u64,
}

/// Start a conversation with a recipient, or return the existing one
pub async fn start_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<MessagingState>,
    ValidatedJson(req): ValidatedJson<StartConversationRequest>,
) -> Result<Json<ConversationResponse>> {
    let conversation = state
        .service
        .start_or_get_conversation(
            &caller_profile(&ctx),
            &req.recipient_id,
            req.context_id.as_deref(),
        )
        .await?;

    Ok(Json(conversation.into()))
}

/// List the caller's conversations, most recent first
pub async fn list_conversations(
    AuthUser(ctx): AuthUser,
    State(state): State<MessagingState>,
) -> Result<Json<Vec<ConversationSummaryResponse>>> {
    let summaries = state.service.list_conversations(ctx.user_id()).await?;

    let responses: Vec<ConversationSummaryResponse> =
        summaries.into_iter().map(Into::into).collect();
    Ok(Json(responses))
}

/// Open a conversation: returns the thread and marks received messages read
pub async fn open_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<MessagingState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationDetailResponse>> {
    let opened = state.service.open_conversation(ctx.user_id(), id).await?;

    Ok(Json(ConversationDetailResponse {
        conversation: opened.conversation.into(),
        messages: opened.messages.into_iter().map(Into::into).collect(),
    }))
}

/// Mark received messages read without loading the thread
pub async fn mark_conversation_read(
    AuthUser(ctx): AuthUser,
    State(state): State<MessagingState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MarkReadResponse>> {
    let marked = state
        .service
        .mark_conversation_read(ctx.user_id(), id)
        .await?;

    Ok(Json(MarkReadResponse { marked }))
}
