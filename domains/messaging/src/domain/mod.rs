//! Messaging domain layer: entities, errors, clock, notification fanout

pub mod clock;
pub mod entities;
pub mod errors;
pub mod fanout;
