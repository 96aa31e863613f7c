//! Messaging service
//!
//! Orchestrates the stores for the four public messaging operations. Every
//! operation takes the caller's identity explicitly. Each store call is
//! bounded by `store_timeout`.
//!
//! Sending is split in two phases. Appending the message is authoritative:
//! if it fails the caller gets an error. Updating the conversation summary
//! and persisting notifications are derived state: a failure there is logged
//! and reported as `FanoutStatus::Deferred`, and the message stays sent.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use plaza_common::RepositoryError;
use uuid::Uuid;

use crate::domain::clock::{Clock, SystemClock};
use crate::domain::entities::{
    Conversation, ConversationSummary, Message, NewMessage, Notification, ParticipantProfile,
};
use crate::domain::errors::MessagingError;
use crate::domain::fanout::fan_out_message;
use crate::repository::{MessagingRepositories, StoreResult};

/// Default deadline applied to each store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a message is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTarget {
    /// Reply in an existing conversation
    Conversation(Uuid),
    /// First message to a user, creating the conversation if needed
    Recipient {
        recipient_id: String,
        context_id: Option<String>,
    },
}

impl MessageTarget {
    /// Build a target from request fields. Exactly one of `conversation_id`
    /// and `recipient_id` must be present.
    pub fn from_parts(
        conversation_id: Option<Uuid>,
        recipient_id: Option<String>,
        context_id: Option<String>,
    ) -> Result<Self, MessagingError> {
        match (conversation_id, recipient_id) {
            (Some(id), None) => Ok(MessageTarget::Conversation(id)),
            (None, Some(recipient_id)) => {
                if recipient_id.trim().is_empty() {
                    return Err(MessagingError::InvalidTarget(
                        "recipient_id must not be empty".to_string(),
                    ));
                }
                Ok(MessageTarget::Recipient {
                    recipient_id,
                    context_id,
                })
            }
            (Some(_), Some(_)) => Err(MessagingError::InvalidTarget(
                "Provide either conversation_id or recipient_id, not both".to_string(),
            )),
            (None, None) => Err(MessagingError::InvalidTarget(
                "Either conversation_id or recipient_id is required".to_string(),
            )),
        }
    }
}

/// Completion state of the derived writes that follow a message append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutStatus {
    Complete,
    /// Message stored, but the summary and/or notifications were not
    Deferred {
        summary_pending: bool,
        notifications_pending: bool,
    },
}

impl FanoutStatus {
    fn from_pending(summary_pending: bool, notifications_pending: bool) -> Self {
        if summary_pending || notifications_pending {
            FanoutStatus::Deferred {
                summary_pending,
                notifications_pending,
            }
        } else {
            FanoutStatus::Complete
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, FanoutStatus::Complete)
    }
}

/// Result of a successful send
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub message: Message,
    /// The conversation as known after the send
    pub conversation: Conversation,
    /// Notifications synthesized for the other participant
    pub notifications: Vec<Notification>,
    /// Whether this message became the conversation's last message
    pub summary_updated: bool,
    pub fanout: FanoutStatus,
}

/// A conversation opened by one of its participants
#[derive(Debug, Clone)]
pub struct OpenedConversation {
    pub conversation: Conversation,
    /// Thread order, with read receipts already applied
    pub messages: Vec<Message>,
    /// Messages transitioned to read by this open
    pub marked_read: u64,
}

/// Messaging operations over a set of stores
#[derive(Clone)]
pub struct MessagingService {
    repos: MessagingRepositories,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl MessagingService {
    pub fn new(repos: MessagingRepositories) -> Self {
        Self {
            repos,
            clock: Arc::new(SystemClock),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Set the deadline applied to each store call
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Clock used for read receipts
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn repositories(&self) -> &MessagingRepositories {
        &self.repos
    }

    /// Run one store call under the deadline
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, MessagingError>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "Store call timed out"
                );
                Err(MessagingError::Timeout { operation })
            }
        }
    }

    /// Return the conversation between `requester` and `recipient_id`,
    /// creating it if the pair has none.
    ///
    /// `requester` is the caller as vouched for by the identity gateway; it
    /// becomes the caller's snapshot when the directory has no profile.
    /// Concurrent calls for the same pair, from either side, all return the
    /// same conversation. `context_id` is recorded only when this call
    /// creates the conversation.
    pub async fn start_or_get_conversation(
        &self,
        requester: &ParticipantProfile,
        recipient_id: &str,
        context_id: Option<&str>,
    ) -> Result<Conversation, MessagingError> {
        let requester_id = requester.user_id.as_str();
        if recipient_id.trim().is_empty() {
            return Err(MessagingError::InvalidTarget(
                "recipient_id must not be empty".to_string(),
            ));
        }
        if requester_id == recipient_id {
            return Err(MessagingError::SelfConversation);
        }

        let recipient = self
            .bounded("lookup_participant", self.repos.directory.lookup(recipient_id))
            .await?
            .ok_or_else(|| MessagingError::RecipientNotFound(recipient_id.to_string()))?;

        if let Some(existing) = self.find_direct(requester_id, recipient_id).await? {
            return Ok(existing);
        }

        let requester = self.requester_snapshot(requester).await?;

        let created = self
            .bounded(
                "create_direct_conversation",
                self.repos
                    .conversations
                    .create_direct(&requester, &recipient, context_id),
            )
            .await;

        match created {
            Ok(conversation) => {
                tracing::info!(
                    conversation_id = %conversation.id,
                    requester_id,
                    recipient_id,
                    "Created direct conversation"
                );
                Ok(conversation)
            }
            Err(MessagingError::Repository(RepositoryError::AlreadyExists)) => {
                // Lost the race for this pair; the winner's row is authoritative
                let winner = self
                    .find_direct(requester_id, recipient_id)
                    .await?
                    .ok_or(MessagingError::Repository(RepositoryError::NotFound))?;
                tracing::info!(
                    conversation_id = %winner.id,
                    requester_id,
                    recipient_id,
                    "Conversation create conflicted, using existing conversation"
                );
                Ok(winner)
            }
            Err(e) => Err(e),
        }
    }

    /// Pair lookup that only ever yields a conversation between both users
    async fn find_direct(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<Conversation>, MessagingError> {
        let found = self
            .bounded(
                "find_direct_conversation",
                self.repos.conversations.find_direct(user_a, user_b),
            )
            .await?;

        match found {
            Some(conversation) if !conversation.is_between(user_a, user_b) => {
                tracing::error!(
                    conversation_id = %conversation.id,
                    user_a,
                    user_b,
                    "Pair lookup returned a conversation of another pair"
                );
                Err(MessagingError::Repository(RepositoryError::InvalidData(
                    "pair lookup returned a foreign conversation".to_string(),
                )))
            }
            found => Ok(found),
        }
    }

    /// Directory snapshot of the caller, or the gateway identity when the
    /// directory has no profile.
    async fn requester_snapshot(
        &self,
        requester: &ParticipantProfile,
    ) -> Result<ParticipantProfile, MessagingError> {
        let profile = self
            .bounded(
                "lookup_participant",
                self.repos.directory.lookup(&requester.user_id),
            )
            .await?;

        Ok(profile.unwrap_or_else(|| {
            tracing::debug!(
                user_id = %requester.user_id,
                "Requester has no directory profile, using gateway identity"
            );
            requester.clone()
        }))
    }

    /// Send a message into an existing conversation or to a recipient.
    ///
    /// If the append outlives the store deadline the caller gets
    /// `MessagingError::Timeout`, but the append keeps running and the
    /// summary and notifications are written once it lands.
    pub async fn send_message(
        &self,
        sender: &ParticipantProfile,
        target: MessageTarget,
        content: &str,
    ) -> Result<SendOutcome, MessagingError> {
        let sender_id = sender.user_id.as_str();
        // Validate before anything can be created
        let content = NewMessage::normalize_content(content)?;

        let conversation = match target {
            MessageTarget::Conversation(conversation_id) => {
                let conversation = self.load_conversation(conversation_id).await?;
                if !conversation.has_participant(sender_id) {
                    return Err(MessagingError::NotParticipant);
                }
                conversation
            }
            MessageTarget::Recipient {
                recipient_id,
                context_id,
            } => {
                self.start_or_get_conversation(sender, &recipient_id, context_id.as_deref())
                    .await?
            }
        };

        let sender_name = conversation
            .participant(sender_id)
            .map(|p| p.display_name.clone())
            .ok_or(MessagingError::NotParticipant)?;
        let draft = NewMessage::new(conversation.id, sender_id, sender_name, &content)?;
        let message_id = draft.id();

        // Spawned so a deadline on the caller never cancels a write in flight
        let messages = self.repos.messages.clone();
        let mut append = tokio::spawn(async move { messages.append(&draft).await });

        let message = match tokio::time::timeout(self.store_timeout, &mut append).await {
            Ok(joined) => flatten_append(joined).inspect_err(|e| {
                tracing::error!(
                    error = %e,
                    conversation_id = %conversation.id,
                    sender_id,
                    "Failed to append message"
                );
            })?,
            Err(_) => {
                tracing::warn!(
                    operation = "append_message",
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    conversation_id = %conversation.id,
                    message_id = %message_id,
                    "Store call timed out, fanout follows when the append lands"
                );
                let service = self.clone();
                tokio::spawn(async move {
                    match flatten_append(append.await) {
                        Ok(message) => {
                            let outcome = service.complete_send(conversation, message).await;
                            tracing::info!(
                                conversation_id = %outcome.conversation.id,
                                message_id = %outcome.message.id,
                                fanout_complete = outcome.fanout.is_complete(),
                                "Late append landed, fanout finished"
                            );
                        }
                        Err(e) => {
                            tracing::error!(
                                error = %e,
                                conversation_id = %conversation.id,
                                message_id = %message_id,
                                "Late append failed"
                            );
                        }
                    }
                });
                return Err(MessagingError::Timeout {
                    operation: "append_message",
                });
            }
        };

        Ok(self.complete_send(conversation, message).await)
    }

    /// Derived writes for an appended message: the conversation summary and
    /// the notifications. Failures only defer them.
    async fn complete_send(&self, mut conversation: Conversation, message: Message) -> SendOutcome {
        let (summary_updated, summary_pending) =
            match self.update_summary(&mut conversation, &message).await {
                Ok(changed) => (changed, false),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        conversation_id = %conversation.id,
                        message_id = %message.id,
                        "Failed to update conversation summary"
                    );
                    (false, true)
                }
            };

        let notifications = fan_out_message(&conversation, &message);
        let notifications_pending = match self
            .bounded(
                "insert_notifications",
                self.repos.notifications.insert_batch(&notifications),
            )
            .await
        {
            Ok(()) => false,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    conversation_id = %conversation.id,
                    message_id = %message.id,
                    count = notifications.len(),
                    "Failed to persist message notifications"
                );
                true
            }
        };

        let fanout = FanoutStatus::from_pending(summary_pending, notifications_pending);
        if !fanout.is_complete() {
            tracing::warn!(
                conversation_id = %conversation.id,
                message_id = %message.id,
                summary_pending,
                notifications_pending,
                "Message sent with deferred fanout"
            );
        }

        SendOutcome {
            message,
            conversation,
            notifications,
            summary_updated,
            fanout,
        }
    }

    async fn update_summary(
        &self,
        conversation: &mut Conversation,
        message: &Message,
    ) -> Result<bool, MessagingError> {
        let changed = self
            .bounded(
                "touch_last_message",
                self.repos.conversations.touch_last_message(
                    conversation.id,
                    &message.content,
                    message.created_at,
                ),
            )
            .await?;
        if changed {
            conversation.apply_last_message(&message.content, message.created_at);
        }
        Ok(changed)
    }

    /// Conversations of `user_id`, most recent activity first
    pub async fn list_conversations(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationSummary>, MessagingError> {
        let conversations = self
            .bounded(
                "list_conversations",
                self.repos.conversations.list_for_user(user_id),
            )
            .await?;

        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in &conversations {
            let unread = self
                .bounded(
                    "count_unread",
                    self.repos.messages.count_unread(conversation.id, user_id),
                )
                .await?;
            if let Some(summary) = ConversationSummary::for_viewer(conversation, user_id, unread) {
                summaries.push(summary);
            }
        }

        Ok(summaries)
    }

    /// Load a conversation and its messages for one of its participants.
    ///
    /// Opening marks the other participant's messages read.
    pub async fn open_conversation(
        &self,
        user_id: &str,
        conversation_id: Uuid,
    ) -> Result<OpenedConversation, MessagingError> {
        let conversation = self.authorize_reader(user_id, conversation_id).await?;
        let marked_read = self.mark_read(&conversation, user_id).await?;

        let messages = self
            .bounded(
                "list_messages",
                self.repos.messages.list_for_conversation(conversation.id),
            )
            .await?;

        Ok(OpenedConversation {
            conversation,
            messages,
            marked_read,
        })
    }

    /// Mark every message `user_id` received in the conversation as read.
    ///
    /// Returns how many messages changed; a repeat call returns 0.
    pub async fn mark_conversation_read(
        &self,
        user_id: &str,
        conversation_id: Uuid,
    ) -> Result<u64, MessagingError> {
        let conversation = self.authorize_reader(user_id, conversation_id).await?;
        self.mark_read(&conversation, user_id).await
    }

    async fn authorize_reader(
        &self,
        user_id: &str,
        conversation_id: Uuid,
    ) -> Result<Conversation, MessagingError> {
        let conversation = self.load_conversation(conversation_id).await?;
        if !conversation.has_participant(user_id) {
            return Err(MessagingError::Forbidden);
        }
        Ok(conversation)
    }

    async fn mark_read(
        &self,
        conversation: &Conversation,
        reader_id: &str,
    ) -> Result<u64, MessagingError> {
        let marked = self
            .bounded(
                "mark_read",
                self.repos
                    .messages
                    .mark_read_except(conversation.id, reader_id, self.clock.now()),
            )
            .await?;

        if marked > 0 {
            tracing::debug!(
                conversation_id = %conversation.id,
                reader_id,
                marked,
                "Marked messages read"
            );
        }
        Ok(marked)
    }

    async fn load_conversation(&self, conversation_id: Uuid) -> Result<Conversation, MessagingError> {
        self.bounded(
            "find_conversation",
            self.repos.conversations.find(conversation_id),
        )
        .await?
        .ok_or(MessagingError::ConversationNotFound(conversation_id))
    }
}

fn flatten_append(
    joined: Result<StoreResult<Message>, tokio::task::JoinError>,
) -> Result<Message, MessagingError> {
    match joined {
        Ok(result) => Ok(result?),
        Err(e) => Err(MessagingError::Repository(RepositoryError::Unavailable(
            format!("append task failed: {e}"),
        ))),
    }
}
