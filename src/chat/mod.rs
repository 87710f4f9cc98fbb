//! Chat endpoint abstraction.
//!
//! The pipeline talks to users through a [`ChatEndpoint`]: plain text
//! messages (sent or edited in place) and audio attachments.

mod console;
mod telegram;

pub use console::ConsoleChat;
pub use telegram::{IncomingMessage, TelegramClient, Update};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Identifier of a chat (conversation) on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message within a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

/// Errors raised by a chat endpoint.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The platform answered but refused the request.
    #[error("API error {code}: {description}")]
    Api { code: i64, description: String },

    /// The request did not complete (connection, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ChatError {
    /// Whether resending the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChatError::Api { .. } | ChatError::Transport(_))
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ChatError::Decode(e.to_string())
        } else {
            ChatError::Transport(e.to_string())
        }
    }
}

/// A destination for progress, audio and error messages.
#[async_trait]
pub trait ChatEndpoint: Send + Sync {
    /// Send a new text message.
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId, ChatError>;

    /// Replace the text of an existing message.
    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<(), ChatError>;

    /// Upload an audio file, giving up after `timeout`.
    async fn send_audio(&self, chat: ChatId, path: &Path, timeout: Duration) -> Result<MessageId, ChatError>;
}
