use async_trait::async_trait;
use reqwest::ClientBuilder;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{InputFile, LinkPreviewOptions, Message};
use url::Url;

use super::{DocumentSource, MessagingError, Messenger, OutgoingDocument, OutgoingMessage, SentMessage};

/// [`Messenger`] backed by a teloxide [`Bot`].
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    /// Creates a messenger, pointing it at a local Bot API server when `api_url` is set.
    pub fn new(token: &SecretString, api_url: Option<&Url>, timeout: Duration) -> Result<Self, MessagingError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| MessagingError::Client(e.to_string()))?;

        let bot = Bot::with_client(token.expose_secret(), client);
        let bot = match api_url {
            Some(url) => {
                log::info!("Using custom Bot API URL: {}", url);
                bot.set_api_url(url.clone())
            }
            None => bot,
        };

        Ok(Self { bot })
    }

    /// Wraps an already configured bot.
    pub fn from_bot(bot: Bot) -> Self {
        Self { bot }
    }
}

fn sent(msg: &Message) -> SentMessage {
    SentMessage {
        message_id: msg.id.0,
        chat_id: msg.chat.id.0,
    }
}

fn disabled_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<SentMessage, MessagingError> {
        let mut request = self.bot.send_message(ChatId(message.chat_id), message.text.clone());
        if message.disable_web_page_preview {
            request = request.link_preview_options(disabled_preview());
        }

        let msg = request.await?;
        log::info!("📨 Message {} sent to chat {}", msg.id.0, message.chat_id);
        Ok(sent(&msg))
    }

    async fn send_document(&self, document: &OutgoingDocument) -> Result<SentMessage, MessagingError> {
        let file = match &document.source {
            DocumentSource::Url(url) => InputFile::url(url.clone()),
            DocumentSource::Bytes { file_name, data } => {
                if data.is_empty() {
                    return Err(MessagingError::InvalidDocument(format!("{} is empty", file_name)));
                }
                InputFile::memory(data.to_vec()).file_name(file_name.clone())
            }
        };

        let mut request = self.bot.send_document(ChatId(document.chat_id), file);
        if let Some(caption) = &document.caption {
            request = request.caption(caption.clone());
        }

        let msg = request.await?;
        log::info!("📎 Document {} sent to chat {}", msg.id.0, document.chat_id);
        Ok(sent(&msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_string_contains, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn messenger_for(server: &MockServer) -> TelegramMessenger {
        let bot = Bot::new("test_token_12345:ABCDEF").set_api_url(server.uri().parse().unwrap());
        TelegramMessenger::from_bot(bot)
    }

    fn message_response(message_id: i32, chat_id: i64) -> serde_json::Value {
        serde_json::json!({
            "ok": true,
            "result": {
                "message_id": message_id,
                "from": {
                    "id": 987654321,
                    "is_bot": true,
                    "first_name": "SeedNoteBot"
                },
                "chat": {
                    "id": chat_id,
                    "type": "private"
                },
                "date": 1735992000,
                "text": "memo"
            }
        })
    }

    #[tokio::test]
    async fn test_send_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex("(?i)/bot[^/]+/sendMessage"))
            .and(body_string_contains("\"is_disabled\":true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_response(42, 7)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let sent = messenger_for(&mock_server)
            .send_message(&OutgoingMessage {
                chat_id: 7,
                text: "memo".to_string(),
                disable_web_page_preview: true,
            })
            .await
            .unwrap();

        assert_eq!(sent, SentMessage { message_id: 42, chat_id: 7 });
    }

    #[tokio::test]
    async fn test_send_message_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex("(?i)/bot[^/]+/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .mount(&mock_server)
            .await;

        let err = messenger_for(&mock_server)
            .send_message(&OutgoingMessage {
                chat_id: 7,
                text: "memo".to_string(),
                disable_web_page_preview: false,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, MessagingError::Telegram(_)));
    }

    #[tokio::test]
    async fn test_send_document_by_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex("(?i)/bot[^/]+/sendDocument"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_response(43, 7)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let sent = messenger_for(&mock_server)
            .send_document(&OutgoingDocument {
                chat_id: 7,
                source: DocumentSource::Url(Url::parse("https://example.com/report.pdf").unwrap()),
                caption: Some("report".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(sent.message_id, 43);
    }

    #[tokio::test]
    async fn test_empty_upload_rejected_without_request() {
        let mock_server = MockServer::start().await;

        let err = messenger_for(&mock_server)
            .send_document(&OutgoingDocument {
                chat_id: 7,
                source: DocumentSource::Bytes {
                    file_name: "empty.txt".to_string(),
                    data: bytes::Bytes::new(),
                },
                caption: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, MessagingError::InvalidDocument(_)));
        assert!(mock_server.received_requests().await.unwrap_or_default().is_empty());
    }
}
