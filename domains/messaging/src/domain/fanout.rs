//! Notification fanout
//!
//! Pure: builds one notification per participant other than the sender.
//! Persisting the records is the caller's job.

use uuid::Uuid;

use crate::domain::entities::{Conversation, Message, Notification, NotificationKind};

/// Maximum characters of message content copied into a notification body
pub const PREVIEW_MAX_CHARS: usize = 100;

const ELLIPSIS: char = '…';

/// First `PREVIEW_MAX_CHARS` characters of `content`, plus an ellipsis if cut
pub fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let mut out: String = chars.by_ref().take(PREVIEW_MAX_CHARS).collect();
    if chars.next().is_some() {
        out.push(ELLIPSIS);
    }
    out
}

/// Notification title for a new message
pub fn message_title(sender_name: &str) -> String {
    format!("New message from {}", sender_name)
}

/// Synthesize notifications for every participant except the sender
pub fn fan_out_message(conversation: &Conversation, message: &Message) -> Vec<Notification> {
    let body = preview(&message.content);
    let title = message_title(&message.sender_name);

    conversation
        .participant_ids()
        .filter(|id| *id != message.sender_id)
        .map(|recipient_id| Notification {
            id: Uuid::new_v4(),
            recipient_id: recipient_id.to_string(),
            kind: NotificationKind::Message,
            title: title.clone(),
            body: body.clone(),
            link_ref: conversation.id,
            source_user_id: message.sender_id.clone(),
            source_name: message.sender_name.clone(),
            read: false,
            created_at: message.created_at,
        })
        .collect()
}
