//! BeeBot core: conversation history, local persistence and the webhook
//! protocol for an n8n-style automation chat backend.
//!
//! Frontends (the bundled CLI, or anything else) drive a
//! [`ChatController`]; the controller owns the [`ConversationManager`] and
//! the [`WebhookClient`] and is the only place send orchestration lives.

pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod store;
pub mod utils;
pub mod webhook;

pub use config::Config;
pub use controller::{ChatController, ChatMode, SendRejected};
pub use error::WebhookError;
pub use history::{Conversation, ConversationManager, Message, Role};
pub use store::ConversationStore;
pub use webhook::{ChatResponse, WebhookClient, DEFAULT_WEBHOOK_URL};
