//! Shared utilities, configuration, and error handling for Plaza
//!
//! This crate provides common functionality used across the Plaza services:
//! - Configuration management following 12-factor principles
//! - Error types and their HTTP mapping
//! - Repository error classification
//! - Request extractors

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;

pub use config::Config;
pub use db::RepositoryError;
pub use error::{Error, Result};
pub use extractors::ValidatedJson;
