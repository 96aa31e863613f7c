//! HTTP API integration tests
//!
//! Drives the full router against the in-memory stores.

#![allow(dead_code)]

mod common;
mod conversations;
mod messages;
