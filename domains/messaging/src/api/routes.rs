//! Route definitions for the messaging API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{conversations, messages};
use super::middleware::MessagingState;

/// Conversation routes
fn conversation_routes() -> Router<MessagingState> {
    Router::new()
        .route(
            "/v1/conversations",
            get(conversations::list_conversations).post(conversations::start_conversation),
        )
        .route("/v1/conversations/{id}", get(conversations::open_conversation))
        .route(
            "/v1/conversations/{id}/read",
            post(conversations::mark_conversation_read),
        )
}

/// Message routes
fn message_routes() -> Router<MessagingState> {
    Router::new().route("/v1/messages", post(messages::send_message))
}

/// All messaging routes
pub fn routes() -> Router<MessagingState> {
    Router::new()
        .merge(conversation_routes())
        .merge(message_routes())
}
