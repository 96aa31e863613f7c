//! HTTP surface of the messaging domain

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::MessagingState;
