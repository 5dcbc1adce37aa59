//! Support chat conversation.

use lumina_core::{ChatRole, Email};
use tracing::{error, instrument};

use crate::backend::{BackendClient, ChatMessage, ChatRequest};

/// First assistant message of every conversation.
pub const GREETING: &str = "Hello! How can I help you today?";

/// Reply appended when the backend cannot answer.
pub const FALLBACK_REPLY: &str = "Sorry, I'm having trouble connecting to my brain right now.";

/// A chat conversation with the support assistant.
#[derive(Debug, Clone)]
pub struct ChatConversation {
    backend: BackendClient,
    model: String,
    email: Option<Email>,
    messages: Vec<ChatMessage>,
}

impl ChatConversation {
    /// Start a conversation with the greeting already shown.
    #[must_use]
    pub fn new(backend: BackendClient, model: impl Into<String>, email: Option<Email>) -> Self {
        Self {
            backend,
            model: model.into(),
            email,
            messages: vec![ChatMessage {
                role: ChatRole::Assistant,
                content: GREETING.to_string(),
            }],
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send `input` and return the assistant's reply.
    ///
    /// Blank input is ignored and returns `None`. Backend failures are logged
    /// and answered with [`FALLBACK_REPLY`].
    #[instrument(skip(self, input), fields(model = %self.model, turns = self.messages.len()))]
    pub async fn send(&mut self, input: &str) -> Option<&str> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        self.messages.push(ChatMessage {
            role: ChatRole::User,
            content: input.to_string(),
        });

        let request = ChatRequest {
            messages: &self.messages,
            model: &self.model,
            email: self.email.as_ref(),
        };
        let reply = match self.backend.chat(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Chat request failed");
                FALLBACK_REPLY.to_string()
            }
        };

        self.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content: reply,
        });
        self.messages.last().map(|m| m.content.as_str())
    }
}
