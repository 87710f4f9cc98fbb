//! Single-message progress indicator per session.

use crate::chat::{ChatEndpoint, ChatError, MessageId};
use crate::session::{Session, SessionId};
use std::sync::Arc;
use tracing::debug;

/// Number of cells in the progress bar.
pub const BAR_CELLS: usize = 10;

const FILLED: &str = "🟩";
const EMPTY: &str = "⬜";

/// Progress of one session and the chat message showing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    pub session_id: SessionId,
    pub fraction: f64,
    pub message: Option<MessageId>,
}

impl ProgressState {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            fraction: 0.0,
            message: None,
        }
    }

    /// Forget the current message so the next report creates a new one.
    pub fn reset(&mut self) {
        self.fraction = 0.0;
        self.message = None;
    }
}

/// Render `fraction` as a bar of [`BAR_CELLS`] cells.
pub fn render_bar(fraction: f64) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * BAR_CELLS as f64).floor() as usize).min(BAR_CELLS);
    format!("{}{}", FILLED.repeat(filled), EMPTY.repeat(BAR_CELLS - filled))
}

/// Creates and then edits a session's progress message.
pub struct ProgressReporter {
    chat: Arc<dyn ChatEndpoint>,
}

impl ProgressReporter {
    pub fn new(chat: Arc<dyn ChatEndpoint>) -> Self {
        Self { chat }
    }

    /// Show `fraction` for `session`.
    ///
    /// The first call after a reset sends a new message; later calls edit it.
    /// Callers keep `fraction` non-decreasing within a session.
    pub async fn report(&self, session: &mut Session, fraction: f64) -> Result<(), ChatError> {
        let text = render_bar(fraction);
        let chat_id = session.chat;
        let progress = &mut session.progress;

        match progress.message {
            Some(message) => self.chat.edit_text(chat_id, message, &text).await?,
            None => {
                let message = self.chat.send_text(chat_id, &text).await?;
                progress.message = Some(message);
            }
        }

        progress.fraction = fraction;
        debug!(session = %progress.session_id, "Progress {:.0}%", fraction * 100.0);
        Ok(())
    }
}
