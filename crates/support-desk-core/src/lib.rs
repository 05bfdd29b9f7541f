#![deny(missing_docs)]
//! Support desk core library.
//!
//! FAQ catalog, request lifecycle, manager registry, routing and the
//! per-user conversation flow, all backed by `SQLite`.

/// Configuration management.
pub mod config;
/// Conversation state machine and reply views.
pub mod conversation;
/// Domain errors.
pub mod error;
/// FAQ catalog and seeding.
pub mod faq;
/// Manager registry.
pub mod managers;
/// Support request lifecycle.
pub mod requests;
/// Question routing.
pub mod router;
/// Per-user session state.
pub mod session;
/// Storage layer (`SQLite`).
pub mod storage;
/// Utility functions.
pub mod utils;

#[cfg(test)]
pub mod testing;
