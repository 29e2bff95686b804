//! Conversation history: the message/conversation data model and the
//! manager that owns all mutation of it.
//!
//! The manager is the single source of truth the UI renders from. Every
//! mutating operation persists the full conversation list through the
//! injected [`ConversationStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::ConversationStore;

/// Maximum length of an auto-derived conversation title, in characters.
const TITLE_MAX_CHARS: usize = 50;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A titled, ordered collection of messages.
///
/// `messages` is append-only; insertion order is chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: "New Conversation".to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Derive a conversation title from its first message.
fn derive_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        let truncated: String = content.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", truncated)
    } else {
        content.to_string()
    }
}

/// In-memory conversation state with write-through persistence.
///
/// Conversations are kept newest-first: new conversations prepend. At most
/// one conversation is current; the current id may point at nothing (never
/// selected, or deleted since).
#[derive(Debug)]
pub struct ConversationManager {
    conversations: Vec<Conversation>,
    current_id: Option<String>,
    store: ConversationStore,
}

impl ConversationManager {
    /// Creates a manager backed by the given store, loading whatever the
    /// store currently holds.
    pub fn new(store: ConversationStore) -> Self {
        let conversations = store.load();
        Self {
            conversations,
            current_id: None,
            store,
        }
    }

    /// All conversations, newest-first.
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Id of the current selection, if any.
    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    /// Creates an empty conversation, makes it current and returns its id.
    pub fn create_conversation(&mut self) -> String {
        let conversation = Conversation::new();
        let id = conversation.id.clone();
        self.conversations.insert(0, conversation);
        self.current_id = Some(id.clone());
        self.store.save(&self.conversations);
        id
    }

    /// Appends a message to the named conversation.
    ///
    /// The first message ever appended also derives the title. Unknown ids
    /// are a no-op.
    pub fn add_message(&mut self, conversation_id: &str, message: Message) {
        let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        else {
            tracing::debug!(conversation_id, "add_message: no such conversation");
            return;
        };

        if conversation.messages.is_empty() {
            conversation.title = derive_title(&message.content);
        }
        conversation.messages.push(message);
        conversation.updated_at = Utc::now();
        self.store.save(&self.conversations);
    }

    /// Removes a conversation. Clears the current selection if it pointed at
    /// the deleted conversation. Unknown ids are a no-op.
    pub fn delete_conversation(&mut self, conversation_id: &str) {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != conversation_id);
        if self.conversations.len() == before {
            return;
        }
        if self.current_id.as_deref() == Some(conversation_id) {
            self.current_id = None;
        }
        self.store.save(&self.conversations);
    }

    /// Sets the current selection. Existence is not validated; selecting an
    /// unknown id simply yields no current conversation on lookup.
    pub fn select_conversation(&mut self, conversation_id: &str) {
        self.current_id = Some(conversation_id.to_string());
    }

    /// The currently selected conversation, if the selection is set and
    /// still present.
    pub fn current_conversation(&self) -> Option<&Conversation> {
        let id = self.current_id.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }
}
