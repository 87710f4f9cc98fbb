//! Bot command: long-poll Telegram and run one session per URL message.

use crate::chat::{ChatId, TelegramClient, Update};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::SessionPipeline;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const WELCOME_TEXT: &str =
    "Welcome to the Audio Downloader Bot. Send me a video URL to download the audio.";

/// Pause after a failed poll before trying again.
const POLL_BACKOFF: Duration = Duration::from_secs(5);

/// What to do with one incoming message.
#[derive(Debug, PartialEq, Eq)]
enum Dispatch {
    Welcome(ChatId),
    Session(ChatId, String),
    Ignore,
}

fn dispatch(update: &Update) -> Dispatch {
    let Some(message) = &update.message else {
        return Dispatch::Ignore;
    };
    let Some(text) = message.text.as_deref().map(str::trim) else {
        return Dispatch::Ignore;
    };

    // Commands may carry a bot suffix, as in "/start@splitcast_bot".
    let command = text.split(['@', ' ']).next().unwrap_or_default();
    match command {
        "/start" | "/help" => Dispatch::Welcome(message.chat_id()),
        _ if text.is_empty() => Dispatch::Ignore,
        _ => Dispatch::Session(message.chat_id(), text.to_string()),
    }
}

/// Run the bot command.
pub async fn run_bot(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Bot, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'splitcast doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    let token = preflight::check_bot_token(&settings)?;

    let client = Arc::new(TelegramClient::new(&settings.telegram.api_base, &token)?);
    let pipeline = Arc::new(SessionPipeline::new(&settings, client.clone())?);
    let poll_timeout = Duration::from_secs(settings.telegram.poll_timeout_seconds);

    Output::success("Bot is running. Press Ctrl+C to stop.");

    let mut offset = 0;
    loop {
        let updates = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                Output::info("Shutting down.");
                return Ok(());
            }
            updates = client.get_updates(offset, poll_timeout) => updates,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                warn!("Polling for updates failed: {}", e);
                tokio::time::sleep(POLL_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            match dispatch(&update) {
                Dispatch::Welcome(chat) => {
                    if let Err(e) = client.reply(chat, WELCOME_TEXT).await {
                        warn!(chat = %chat, "Failed to send welcome text: {}", e);
                    }
                }
                Dispatch::Session(chat, url) => {
                    info!(chat = %chat, "Starting session for {}", url);
                    let pipeline = pipeline.clone();
                    tokio::spawn(async move {
                        let report = pipeline.run(chat, &url).await;
                        info!(
                            chat = %chat,
                            session = %report.session_id,
                            "Session ended in state {}",
                            report.state
                        );
                    });
                }
                Dispatch::Ignore => debug!("Ignoring update {}", update.update_id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(text: Option<&str>) -> Update {
        let json = serde_json::json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "chat": { "id": 42 },
                "text": text,
            }
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_start_and_help_get_welcome() {
        assert_eq!(dispatch(&update(Some("/start"))), Dispatch::Welcome(ChatId(42)));
        assert_eq!(dispatch(&update(Some("/help"))), Dispatch::Welcome(ChatId(42)));
        assert_eq!(
            dispatch(&update(Some("/start@splitcast_bot"))),
            Dispatch::Welcome(ChatId(42))
        );
    }

    #[test]
    fn test_other_text_starts_session() {
        assert_eq!(
            dispatch(&update(Some(" https://youtu.be/abc "))),
            Dispatch::Session(ChatId(42), "https://youtu.be/abc".to_string())
        );
    }

    #[test]
    fn test_non_text_is_ignored() {
        assert_eq!(dispatch(&update(None)), Dispatch::Ignore);
        assert_eq!(dispatch(&update(Some("   "))), Dispatch::Ignore);
        let empty: Update = serde_json::from_value(serde_json::json!({ "update_id": 3 })).unwrap();
        assert_eq!(dispatch(&empty), Dispatch::Ignore);
    }
}
