//! Delivery of encoded segments to the chat endpoint.
//!
//! Segments are sent one by one in index order. A segment that cannot be sent
//! within the retry budget stops the batch, so the recipient never receives a
//! later part without the earlier ones.

use crate::audio::AudioSegment;
use crate::chat::{ChatEndpoint, ChatError, ChatId};
use crate::error::{Result, SplitcastError};
use crate::retry::RetryPolicy;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Per-segment delivery record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryEntry {
    pub index: usize,
    pub delivered: bool,
    /// Send attempts made; zero when the batch stopped before this segment.
    pub attempts: u32,
}

/// The segment that stopped the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub index: usize,
    pub attempts: u32,
    pub message: String,
}

/// Outcome of delivering one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub entries: Vec<DeliveryEntry>,
    pub failure: Option<DeliveryFailure>,
}

impl DeliveryReport {
    pub fn delivered_count(&self) -> usize {
        self.entries.iter().filter(|e| e.delivered).count()
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    pub fn entry(&self, index: usize) -> Option<&DeliveryEntry> {
        self.entries.iter().find(|e| e.index == index)
    }

    /// Turn a stopped batch into a [`SplitcastError::Delivery`].
    pub fn ensure_complete(&self) -> Result<()> {
        match &self.failure {
            None => Ok(()),
            Some(f) => Err(SplitcastError::Delivery {
                part: f.index + 1,
                attempts: f.attempts,
                message: f.message.clone(),
            }),
        }
    }
}

/// Sends encoded segments with bounded retry.
pub struct DeliveryOrchestrator {
    chat: Arc<dyn ChatEndpoint>,
    policy: RetryPolicy,
    send_timeout: Duration,
}

impl DeliveryOrchestrator {
    pub fn new(chat: Arc<dyn ChatEndpoint>, policy: RetryPolicy, send_timeout: Duration) -> Self {
        Self {
            chat,
            policy,
            send_timeout,
        }
    }

    /// Send every encoded segment to `chat_id`.
    ///
    /// Failed encodes are skipped. A delivered segment's file is removed.
    #[instrument(skip(self, segments), fields(chat = %chat_id))]
    pub async fn deliver(&self, chat_id: ChatId, segments: &[AudioSegment]) -> DeliveryReport {
        let mut pending: Vec<&AudioSegment> = segments.iter().filter(|s| s.is_encoded()).collect();
        pending.sort_by_key(|s| s.index);

        let mut report = DeliveryReport {
            entries: pending
                .iter()
                .map(|s| DeliveryEntry {
                    index: s.index,
                    delivered: false,
                    attempts: 0,
                })
                .collect(),
            failure: None,
        };

        for (slot, segment) in pending.iter().enumerate() {
            let path = segment.file_path.as_path();
            let chat = self.chat.as_ref();
            let timeout = self.send_timeout;

            let label = format!("send part {}", segment.index + 1);
            let outcome = self
                .policy
                .run(
                    &label,
                    |_| async move { chat.send_audio(chat_id, path, timeout).await },
                    ChatError::is_transient,
                )
                .await;

            let entry = &mut report.entries[slot];
            entry.attempts = outcome.attempts;

            match outcome.result {
                Ok(_) => {
                    entry.delivered = true;
                    info!("Delivered part {} ({} attempts)", segment.index + 1, outcome.attempts);
                    if let Err(e) = tokio::fs::remove_file(path).await {
                        warn!("Failed to remove delivered file {:?}: {}", path, e);
                    }
                }
                Err(e) => {
                    warn!(
                        "Giving up on part {} after {} attempts: {}",
                        segment.index + 1,
                        outcome.attempts,
                        e
                    );
                    report.failure = Some(DeliveryFailure {
                        index: segment.index,
                        attempts: outcome.attempts,
                        message: e.to_string(),
                    });
                    break;
                }
            }
        }

        report
    }
}
