//! Durable storage for conversation histories.
//!
//! One JSON document holds the full conversation list; every save rewrites
//! it. Both directions fail soft: a load that cannot read or parse yields an
//! empty list, a save that cannot write leaves the prior file untouched. The
//! store logs these failures and never propagates them, so history problems
//! can never break the chat loop.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::history::Conversation;

const STORE_FILE: &str = "conversations.json";

/// File-backed store for the conversation list.
///
/// The sole component that touches durable storage; everything else goes
/// through [`crate::history::ConversationManager`].
#[derive(Debug)]
pub struct ConversationStore {
    path: PathBuf,
}

impl ConversationStore {
    /// Opens the default store at `~/.beebot/conversations.json`, creating
    /// the directory if needed.
    pub fn open_default() -> Result<Self> {
        let dir = dirs::home_dir()
            .context("Could not find home directory")?
            .join(".beebot");

        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage directory: {:?}", dir))?;

        Ok(Self {
            path: dir.join(STORE_FILE),
        })
    }

    /// Opens a store at an explicit path. The parent directory must exist.
    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the persisted conversation list.
    ///
    /// A missing file is an empty history. Read or parse failures are logged
    /// and also yield an empty history.
    pub fn load(&self) -> Vec<Conversation> {
        if !self.path.exists() {
            return Vec::new();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "failed to read conversation store");
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(conversations) => conversations,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "failed to parse conversation store");
                Vec::new()
            }
        }
    }

    /// Persists the full conversation list, overwriting prior content.
    ///
    /// Write failures are logged and swallowed; the previous file content
    /// stays in place.
    pub fn save(&self, conversations: &[Conversation]) {
        let json = match serde_json::to_string_pretty(conversations) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(%err, "failed to serialize conversations");
                return;
            }
        };

        if let Err(err) = fs::write(&self.path, json) {
            tracing::warn!(path = %self.path.display(), %err, "failed to write conversation store");
        }
    }
}
