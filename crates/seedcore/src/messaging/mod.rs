//! Outgoing bot messages for the memo relay

pub mod telegram;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use url::Url;

pub use telegram::TelegramMessenger;

#[derive(Debug, Error)]
pub enum MessagingError {
    /// Bot API rejected the call or could not be reached
    #[error("Telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP client for the Bot API could not be built
    #[error("failed to build Bot API client: {0}")]
    Client(String),

    /// The document payload cannot be sent
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Plain text message to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    pub disable_web_page_preview: bool,
}

/// Where a document's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Telegram downloads the file itself
    Url(Url),
    /// Uploaded from memory
    Bytes { file_name: String, data: Bytes },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingDocument {
    pub chat_id: i64,
    pub source: DocumentSource,
    pub caption: Option<String>,
}

/// Identifiers of a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SentMessage {
    pub message_id: i32,
    pub chat_id: i64,
}

/// Sends messages on behalf of the bot.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<SentMessage, MessagingError>;

    async fn send_document(&self, document: &OutgoingDocument) -> Result<SentMessage, MessagingError>;
}
