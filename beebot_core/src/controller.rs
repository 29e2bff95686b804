//! Chat orchestration: turns one submitted line of text into a persisted
//! user message, a webhook round trip and a persisted assistant reply.
//!
//! The controller owns the pending mode tag (set by the UI's action buttons,
//! consumed exactly once per send) and the loading flag the UI reads to
//! disable re-submission. A send in flight for a conversation blocks further
//! sends until it resolves; the flags reset even when the future driving a
//! send is dropped mid-flight.

use thiserror::Error;

use crate::history::{ConversationManager, Message, Role};
use crate::webhook::WebhookClient;

/// Shown instead of a reply that merely restates the user's input. Points
/// the operator at the usual cause: the workflow's final node returning the
/// input field instead of a reply field.
const ECHO_DIAGNOSTIC: &str = "The workflow echoed your message back instead of answering. \
Check that the n8n workflow's last node returns the reply under an 'output', 'response', \
'message' or 'text' field.";

const FALLBACK_REASONING: &str =
    "I couldn't reach the reasoning workflow. Please check the webhook server and try again.";
const FALLBACK_IMAGE: &str =
    "I couldn't reach the image workflow. Please check the webhook server and try again.";
const FALLBACK_RESEARCH: &str =
    "I couldn't reach the research workflow. Please check the webhook server and try again.";
const FALLBACK_DEFAULT: &str =
    "Sorry, I'm having trouble reaching the AI service right now. Please try again in a moment.";

/// How far apart in length an echoing reply may be from the input while
/// still counting as an echo.
const ECHO_SLACK_CHARS: usize = 10;

/// Tag attached to the next outgoing message, consumed once per send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    #[default]
    None,
    Reasoning,
    Image,
    Research,
}

impl ChatMode {
    /// Canned assistant reply substituted when the webhook call fails.
    fn fallback_reply(self) -> &'static str {
        match self {
            ChatMode::Reasoning => FALLBACK_REASONING,
            ChatMode::Image => FALLBACK_IMAGE,
            ChatMode::Research => FALLBACK_RESEARCH,
            ChatMode::None => FALLBACK_DEFAULT,
        }
    }
}

/// A send that was refused before any state changed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendRejected {
    #[error("a message is already in flight for this conversation")]
    Busy,
}

/// Per-send flags, grouped so a [`SendGuard`] can borrow them while the
/// webhook call borrows the rest of the controller.
#[derive(Debug, Default)]
struct SendState {
    pending_mode: ChatMode,
    loading: bool,
    in_flight: Option<String>,
}

/// Resets the send flags when the round trip ends.
///
/// The reset lives in `Drop` so it also runs when the future driving the
/// send is dropped mid-flight (a frontend timeout, a cancelled task);
/// otherwise a stale `in_flight` would reject every later send to that
/// conversation.
struct SendGuard<'a> {
    state: &'a mut SendState,
}

impl<'a> SendGuard<'a> {
    fn arm(state: &'a mut SendState, conversation_id: String) -> Self {
        state.loading = true;
        state.in_flight = Some(conversation_id);
        Self { state }
    }

    /// Consumes the pending mode and disarms. Flag clearing is left to the
    /// `Drop` impl so completion and cancellation share one exit path.
    fn finish(mut self) -> ChatMode {
        std::mem::take(&mut self.state.pending_mode)
    }
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.state.loading = false;
        self.state.in_flight = None;
        self.state.pending_mode = ChatMode::None;
    }
}

/// Glue between the UI, the conversation manager and the webhook client.
#[derive(Debug)]
pub struct ChatController {
    manager: ConversationManager,
    client: WebhookClient,
    state: SendState,
}

impl ChatController {
    pub fn new(manager: ConversationManager, client: WebhookClient) -> Self {
        Self {
            manager,
            client,
            state: SendState::default(),
        }
    }

    pub fn manager(&self) -> &ConversationManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ConversationManager {
        &mut self.manager
    }

    /// Tags the next send. Replaces any previously pending mode.
    pub fn set_mode(&mut self, mode: ChatMode) {
        self.state.pending_mode = mode;
    }

    pub fn pending_mode(&self) -> ChatMode {
        self.state.pending_mode
    }

    /// True while a webhook round trip is in progress. The UI uses this to
    /// disable re-submission.
    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    /// Sends one user message through the webhook and records both sides of
    /// the exchange. Creates a conversation first if none is current.
    ///
    /// The pending mode and loading flag are reset on every exit path,
    /// cancellation included.
    pub async fn handle_send_message(&mut self, text: &str) -> Result<(), SendRejected> {
        let conversation_id = match self.manager.current_conversation() {
            Some(conversation) => conversation.id.clone(),
            None => self.manager.create_conversation(),
        };

        if self.state.loading && self.state.in_flight.as_deref() == Some(conversation_id.as_str())
        {
            return Err(SendRejected::Busy);
        }

        self.manager
            .add_message(&conversation_id, Message::new(Role::User, text));

        let guard = SendGuard::arm(&mut self.state, conversation_id.clone());
        let response = self.client.send(text).await;
        let mode = guard.finish();

        let reply = match response.error {
            Some(err) => {
                tracing::warn!(error = %err, "webhook send failed, substituting fallback reply");
                mode.fallback_reply().to_string()
            }
            None if is_echo(text, &response.output) => {
                tracing::warn!("webhook reply echoed the input, substituting diagnostic");
                ECHO_DIAGNOSTIC.to_string()
            }
            None => response.output,
        };

        self.manager
            .add_message(&conversation_id, Message::new(Role::Assistant, reply));

        Ok(())
    }
}

/// Heuristic for degenerate replies that merely restate the input.
///
/// Both sides are trimmed and lowercased; a reply is an echo when it equals
/// the input exactly, or contains it with at most [`ECHO_SLACK_CHARS`]
/// characters of difference in length.
fn is_echo(user_text: &str, reply: &str) -> bool {
    let user = user_text.trim().to_lowercase();
    let reply = reply.trim().to_lowercase();

    if user.is_empty() {
        return reply.is_empty();
    }
    if user == reply {
        return true;
    }

    reply.contains(&user)
        && reply.chars().count().abs_diff(user.chars().count()) <= ECHO_SLACK_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ConversationStore;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn controller_for(url: String) -> (ChatController, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::at_path(dir.path().join("conversations.json"));
        let manager = ConversationManager::new(store);
        (ChatController::new(manager, WebhookClient::new(url)), dir)
    }

    async fn mock_reply(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "output": body })),
            )
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_identical_reply_is_echo() {
        assert!(is_echo("hello", "hello"));
    }

    #[test]
    fn test_trim_and_case_are_normalized() {
        assert!(is_echo("  Hello ", "HELLO"));
    }

    #[test]
    fn test_containing_reply_within_slack_is_echo() {
        assert!(is_echo("hi", "hi there"));
    }

    #[test]
    fn test_containing_reply_beyond_slack_is_not_echo() {
        assert!(!is_echo("cats", "I love cats very much today"));
    }

    #[test]
    fn test_unrelated_reply_is_not_echo() {
        assert!(!is_echo("hello", "goodbye"));
    }

    #[tokio::test]
    async fn test_first_send_creates_titled_conversation() {
        let server = mock_reply("A fever is an elevated body temperature.").await;
        let (mut controller, _dir) =
            controller_for(format!("{}/webhook/chat", server.uri()));

        controller.handle_send_message("What is fever?").await.unwrap();

        let conversation = controller.manager().current_conversation().unwrap();
        assert_eq!(conversation.title, "What is fever?");
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].role, Role::User);
        assert_eq!(conversation.messages[0].content, "What is fever?");
        assert_eq!(conversation.messages[1].role, Role::Assistant);
        assert_eq!(
            conversation.messages[1].content,
            "A fever is an elevated body temperature."
        );
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn test_echoed_reply_is_substituted_with_diagnostic() {
        let server = mock_reply("hello").await;
        let (mut controller, _dir) =
            controller_for(format!("{}/webhook/chat", server.uri()));

        controller.handle_send_message("hello").await.unwrap();

        let conversation = controller.manager().current_conversation().unwrap();
        assert_eq!(conversation.messages[1].content, ECHO_DIAGNOSTIC);
    }

    #[tokio::test]
    async fn test_long_reply_containing_input_is_kept_verbatim() {
        let server = mock_reply("I love cats very much today").await;
        let (mut controller, _dir) =
            controller_for(format!("{}/webhook/chat", server.uri()));

        controller.handle_send_message("cats").await.unwrap();

        let conversation = controller.manager().current_conversation().unwrap();
        assert_eq!(
            conversation.messages[1].content,
            "I love cats very much today"
        );
    }

    #[tokio::test]
    async fn test_network_failure_substitutes_mode_fallback_and_resets_mode() {
        // Nothing listens on the discard port.
        let (mut controller, _dir) =
            controller_for("http://127.0.0.1:9/webhook/chat".to_string());

        controller.set_mode(ChatMode::Reasoning);
        controller.handle_send_message("think about this").await.unwrap();

        let conversation = controller.manager().current_conversation().unwrap();
        assert_eq!(conversation.messages[1].content, FALLBACK_REASONING);
        assert_eq!(controller.pending_mode(), ChatMode::None);
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn test_network_failure_without_mode_uses_default_fallback() {
        let (mut controller, _dir) =
            controller_for("http://127.0.0.1:9/webhook/chat".to_string());

        controller.handle_send_message("anyone there?").await.unwrap();

        let conversation = controller.manager().current_conversation().unwrap();
        assert_eq!(conversation.messages[1].content, FALLBACK_DEFAULT);
    }

    #[tokio::test]
    async fn test_mode_is_consumed_by_successful_send_too() {
        let server = mock_reply("a long and thoughtful reasoned answer").await;
        let (mut controller, _dir) =
            controller_for(format!("{}/webhook/chat", server.uri()));

        controller.set_mode(ChatMode::Research);
        controller.handle_send_message("dig into this").await.unwrap();

        assert_eq!(controller.pending_mode(), ChatMode::None);
    }

    #[tokio::test]
    async fn test_second_send_reuses_current_conversation() {
        let server = mock_reply("and here is another considered answer").await;
        let (mut controller, _dir) =
            controller_for(format!("{}/webhook/chat", server.uri()));

        controller.handle_send_message("first question").await.unwrap();
        controller.handle_send_message("second question").await.unwrap();

        assert_eq!(controller.manager().conversations().len(), 1);
        let conversation = controller.manager().current_conversation().unwrap();
        assert_eq!(conversation.messages.len(), 4);
        assert_eq!(conversation.title, "first question");
    }

    #[tokio::test]
    async fn test_send_rejected_while_conversation_in_flight() {
        let (mut controller, _dir) =
            controller_for("http://127.0.0.1:9/webhook/chat".to_string());
        let id = controller.manager_mut().create_conversation();
        controller.state.loading = true;
        controller.state.in_flight = Some(id);

        let result = controller.handle_send_message("hi").await;
        assert_eq!(result, Err(SendRejected::Busy));
    }

    #[tokio::test]
    async fn test_cancelled_send_resets_flags_and_allows_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "output": "a slow but real answer" }))
                    .set_delay(Duration::from_secs(1)),
            )
            .mount(&server)
            .await;
        let (mut controller, _dir) =
            controller_for(format!("{}/webhook/chat", server.uri()));

        controller.set_mode(ChatMode::Reasoning);
        let cancelled = tokio::time::timeout(
            Duration::from_millis(50),
            controller.handle_send_message("hello?"),
        )
        .await;
        assert!(cancelled.is_err());

        assert!(!controller.is_loading());
        assert_eq!(controller.pending_mode(), ChatMode::None);
        assert_eq!(controller.handle_send_message("still there?").await, Ok(()));
    }
}
