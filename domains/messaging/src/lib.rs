//! Messaging domain: direct conversations, messages, read receipts,
//! notification fanout

pub mod api;
pub mod domain;
pub mod repository;
pub mod service;

// Re-export domain types at the crate root for convenience
pub use domain::clock::{Clock, ManualClock, SystemClock};
pub use domain::entities::{
    Conversation, ConversationSummary, Message, NewMessage, Notification, NotificationKind,
    ParticipantProfile,
};
pub use domain::errors::MessagingError;
pub use domain::fanout::fan_out_message;

// Re-export repository types
pub use repository::{
    ConversationStore, InMemoryParticipantDirectory, MessageStore, MessagingRepositories,
    NotificationStore, ParticipantDirectory,
};

pub use service::{FanoutStatus, MessageTarget, MessagingService, OpenedConversation, SendOutcome};

// Re-export API types
pub use api::routes::routes;
pub use api::MessagingState;
