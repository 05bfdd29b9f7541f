//! Per-user conversation handling.
//!
//! [`ConversationController`] turns inbound messages into [`Reply`] values.
//! Rendering and delivery belong to the transport.

mod controller;
mod menu;
pub mod views;

pub use controller::{ConversationController, Inbound};
pub use menu::{parse_request_label, MenuAction};
pub use views::{Keyboard, Reply};
