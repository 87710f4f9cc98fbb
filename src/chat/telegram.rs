//! Telegram Bot API client.

use super::{ChatEndpoint, ChatError, ChatId, MessageId};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default timeout for ordinary API calls.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// One entry from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

/// A message received by the bot.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub chat: IncomingChat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingChat {
    pub id: i64,
}

impl IncomingMessage {
    pub fn chat_id(&self) -> ChatId {
        ChatId(self.chat.id)
    }
}

/// Minimal Telegram Bot API client over reqwest.
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("splitcast/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T, ChatError> {
        let response = self
            .http
            .post(self.method_url(method))
            .timeout(timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        parse_response(status.as_u16(), &text)
    }

    /// Long-poll for new updates after `offset`.
    pub async fn get_updates(&self, offset: i64, poll_timeout: Duration) -> Result<Vec<Update>, ChatError> {
        self.call_json(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": poll_timeout.as_secs(),
                "allowed_updates": ["message"],
            }),
            poll_timeout + CALL_TIMEOUT,
        )
        .await
    }

    /// Reply with text to a chat, ignoring the returned message.
    pub async fn reply(&self, chat: ChatId, text: &str) -> Result<(), ChatError> {
        self.send_text(chat, text).await.map(|_| ())
    }
}

/// Decode a Bot API response body.
fn parse_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ChatError> {
    let parsed: ApiResponse<T> = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(_) if !(200..300).contains(&status) => {
            return Err(ChatError::Api {
                code: status as i64,
                description: body.chars().take(200).collect(),
            })
        }
        Err(e) => return Err(ChatError::Decode(e.to_string())),
    };

    if !parsed.ok {
        return Err(ChatError::Api {
            code: parsed.error_code.unwrap_or(status as i64),
            description: parsed.description.unwrap_or_else(|| "unknown error".to_string()),
        });
    }

    parsed
        .result
        .ok_or_else(|| ChatError::Decode("response without result".to_string()))
}

#[async_trait]
impl ChatEndpoint for TelegramClient {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId, ChatError> {
        let sent: SentMessage = self
            .call_json("sendMessage", json!({ "chat_id": chat.0, "text": text }), CALL_TIMEOUT)
            .await?;
        Ok(MessageId(sent.message_id))
    }

    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<(), ChatError> {
        // The result is either the edited message or `true`.
        let _: serde_json::Value = self
            .call_json(
                "editMessageText",
                json!({ "chat_id": chat.0, "message_id": message.0, "text": text }),
                CALL_TIMEOUT,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(chat = %chat, path = %path.display()))]
    async fn send_audio(&self, chat: ChatId, path: &Path, timeout: Duration) -> Result<MessageId, ChatError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();
        debug!("Uploading {} bytes", bytes.len());

        let part = Part::bytes(bytes).file_name(file_name).mime_str("audio/mpeg")?;
        let form = Form::new().text("chat_id", chat.0.to_string()).part("audio", part);

        let response = self
            .http
            .post(self.method_url("sendAudio"))
            .timeout(timeout)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let sent: SentMessage = parse_response(status.as_u16(), &text)?;
        Ok(MessageId(sent.message_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok_response() {
        let body = r#"{"ok":true,"result":{"message_id":42,"chat":{"id":7}}}"#;
        let sent: SentMessage = parse_response(200, body).unwrap();
        assert_eq!(sent.message_id, 42);
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"ok":false,"error_code":413,"description":"Request Entity Too Large"}"#;
        let err = parse_response::<SentMessage>(413, body).unwrap_err();
        match err {
            ChatError::Api { code, description } => {
                assert_eq!(code, 413);
                assert_eq!(description, "Request Entity Too Large");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_non_json_error_page() {
        let err = parse_response::<SentMessage>(502, "<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, ChatError::Api { code: 502, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_parse_updates() {
        let body = r#"{"ok":true,"result":[
            {"update_id":10,"message":{"message_id":1,"chat":{"id":99},"text":"/start"}},
            {"update_id":11,"edited_message":{}}
        ]}"#;
        let updates: Vec<Update> = parse_response(200, body).unwrap();
        assert_eq!(updates.len(), 2);
        let msg = updates[0].message.as_ref().unwrap();
        assert_eq!(msg.chat_id(), ChatId(99));
        assert_eq!(msg.text.as_deref(), Some("/start"));
        assert!(updates[1].message.is_none());
    }

    #[test]
    fn test_method_url() {
        let client = TelegramClient::new("https://api.telegram.org/", "123:abc").unwrap();
        assert_eq!(client.method_url("sendAudio"), "https://api.telegram.org/bot123:abc/sendAudio");
    }
}
