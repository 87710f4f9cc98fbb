//! Terminal chat endpoint for the stand-alone entry point.
//!
//! Text messages become terminal lines that can be redrawn in place, and
//! "sent" audio files are copied into an output directory.

use super::{ChatEndpoint, ChatError, ChatId, MessageId};
use async_trait::async_trait;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Chat endpoint that writes to the terminal and a local directory.
pub struct ConsoleChat {
    output_dir: PathBuf,
    lines: Mutex<HashMap<MessageId, ProgressBar>>,
    next_id: AtomicI64,
}

impl ConsoleChat {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            lines: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn next_message_id(&self) -> MessageId {
        MessageId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Stop redrawing all lines, leaving their last text on screen.
    pub async fn finish(&self) {
        let mut lines = self.lines.lock().await;
        for (_, line) in lines.drain() {
            line.finish();
        }
    }
}

#[async_trait]
impl ChatEndpoint for ConsoleChat {
    async fn send_text(&self, _chat: ChatId, text: &str) -> Result<MessageId, ChatError> {
        let line = ProgressBar::new_spinner();
        if let Ok(line_style) = ProgressStyle::default_spinner().template("  {msg}") {
            line.set_style(line_style);
        }
        line.set_message(text.to_string());
        line.tick();

        let id = self.next_message_id();
        self.lines.lock().await.insert(id, line);
        Ok(id)
    }

    async fn edit_text(&self, _chat: ChatId, message: MessageId, text: &str) -> Result<(), ChatError> {
        let lines = self.lines.lock().await;
        let line = lines
            .get(&message)
            .ok_or_else(|| ChatError::Api {
                code: 400,
                description: format!("message {} not found", message.0),
            })?;
        line.set_message(text.to_string());
        line.tick();
        Ok(())
    }

    async fn send_audio(&self, _chat: ChatId, path: &Path, _timeout: Duration) -> Result<MessageId, ChatError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| ChatError::Decode(format!("{} has no file name", path.display())))?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let dest = self.output_dir.join(file_name);
        tokio::fs::copy(path, &dest).await?;

        let note = format!("{} {}", style(">>").green().bold(), dest.display());
        let lines = self.lines.lock().await;
        match lines.values().next() {
            Some(line) => line.println(note),
            None => println!("{note}"),
        }

        Ok(self.next_message_id())
    }
}
