//! Session pipeline for Splitcast.
//!
//! Runs one job end to end: acquire, plan, encode, deliver. Stages run
//! strictly one after another. When acquisition reports missing streaming
//! data the whole pipeline starts over, up to the configured attempt budget;
//! every other error ends the session and is reported to the chat once.

use crate::audio::{AudioSegment, FfmpegEncoder, SegmentEncoder, Transcoder};
use crate::chat::{ChatEndpoint, ChatId};
use crate::config::Settings;
use crate::delivery::{DeliveryOrchestrator, DeliveryReport};
use crate::error::{Result, SplitcastError};
use crate::identifier::{sanitize, Identifier};
use crate::planner;
use crate::progress::ProgressReporter;
use crate::retry::RetryPolicy;
use crate::session::{Session, SessionId, SessionState};
use crate::source::{AcquisitionGateway, Acquirer, SourceReference};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Progress shown after each stage.
pub mod milestones {
    pub const STARTED: f64 = 0.0;
    pub const ACQUIRED: f64 = 0.2;
    pub const PLANNED: f64 = 0.4;
    pub const ENCODED: f64 = 0.8;
    pub const DELIVERED: f64 = 0.9;
    pub const DONE: f64 = 1.0;
}

/// Summary of a finished session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub identifier: Option<Identifier>,
    pub state: SessionState,
    /// Pipeline runs made, including retries.
    pub pipeline_attempts: u32,
    pub segments: Vec<AudioSegment>,
    pub delivery: Option<DeliveryReport>,
    /// User-facing failure text, when the session failed.
    pub failure: Option<String>,
}

impl SessionReport {
    pub fn succeeded(&self) -> bool {
        self.state == SessionState::Done
    }
}

/// Stage results collected across pipeline runs.
#[derive(Default)]
struct StageOutputs {
    segments: Vec<AudioSegment>,
    delivery: Option<DeliveryReport>,
}

/// Drives sessions through acquisition, planning, encoding and delivery.
pub struct SessionPipeline {
    acquirer: Arc<dyn Acquirer>,
    transcoder: Transcoder,
    delivery: DeliveryOrchestrator,
    progress: ProgressReporter,
    chat: Arc<dyn ChatEndpoint>,
    retry: RetryPolicy,
    max_segment_seconds: u32,
    work_root: PathBuf,
}

impl SessionPipeline {
    /// Create a pipeline with the external tools named in `settings`.
    pub fn new(settings: &Settings, chat: Arc<dyn ChatEndpoint>) -> Result<Self> {
        let acquirer = Arc::new(AcquisitionGateway::from_settings(settings)?);
        let encoder = Arc::new(FfmpegEncoder::with_program(&settings.tools.ffmpeg));
        Ok(Self::with_components(settings, acquirer, encoder, chat))
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        settings: &Settings,
        acquirer: Arc<dyn Acquirer>,
        encoder: Arc<dyn SegmentEncoder>,
        chat: Arc<dyn ChatEndpoint>,
    ) -> Self {
        Self {
            acquirer,
            transcoder: Transcoder::new(encoder, settings.encoding_profile()),
            delivery: DeliveryOrchestrator::new(
                chat.clone(),
                settings.delivery_policy(),
                settings.send_timeout(),
            ),
            progress: ProgressReporter::new(chat.clone()),
            chat,
            retry: settings.pipeline_policy(),
            max_segment_seconds: settings.segmenting.max_segment_seconds,
            work_root: settings.work_dir(),
        }
    }

    /// Run one job for `chat_id` from `url` to delivery.
    #[instrument(skip(self), fields(chat = %chat_id))]
    pub async fn run(&self, chat_id: ChatId, url: &str) -> SessionReport {
        let mut session = Session::start(chat_id, &self.work_root);
        info!(session = %session.id, "Starting session for {}", url);

        session.progress.reset();
        self.advance(&mut session, milestones::STARTED).await;

        let mut outputs = StageOutputs::default();
        let mut attempts = 0;

        let result = loop {
            attempts += 1;

            match self.run_once(&mut session, url, &mut outputs).await {
                Ok(()) => break Ok(()),
                Err(e) => {
                    if let Err(transition) = session.enter(SessionState::Failed) {
                        warn!(session = %session.id, "{}", transition);
                    }

                    if e.is_pipeline_retryable() && self.retry.allows_retry(attempts) {
                        warn!(
                            session = %session.id,
                            attempt = attempts,
                            max_attempts = self.retry.max_attempts,
                            "Transient source error, restarting pipeline: {}",
                            e
                        );
                        self.retry.pause().await;
                        if let Err(transition) = session.enter(SessionState::Idle) {
                            break Err(transition);
                        }
                        continue;
                    }

                    break Err(e);
                }
            }
        };

        let failure = match result {
            Ok(()) => {
                info!(session = %session.id, "Session finished after {} run(s)", attempts);
                None
            }
            Err(e) => {
                error!(session = %session.id, "Session failed: {}", e);
                let text = format!("An error occurred: {e}");
                if let Err(send) = self.chat.send_text(chat_id, &text).await {
                    warn!(session = %session.id, "Could not report failure to chat: {}", send);
                }
                Some(e.to_string())
            }
        };

        session.remove_empty_workspace();

        SessionReport {
            session_id: session.id.clone(),
            started_at: session.started_at,
            identifier: session.identifier().cloned(),
            state: session.state(),
            pipeline_attempts: attempts,
            segments: outputs.segments,
            delivery: outputs.delivery,
            failure,
        }
    }

    /// One pass through all stages.
    async fn run_once(&self, session: &mut Session, url: &str, outputs: &mut StageOutputs) -> Result<()> {
        session.enter(SessionState::Acquiring)?;
        let source = SourceReference::parse(url)?;
        let info = self.acquirer.resolve(&source).await?;
        let identifier = session.pin_identifier(&sanitize(&info.title));
        let asset = self
            .acquirer
            .fetch(&source, &info, &identifier, &session.workspace)
            .await?;
        info!(
            session = %session.id,
            "Acquired {} ({:.0}s, {})",
            identifier, asset.duration_seconds, asset.container
        );
        self.advance(session, milestones::ACQUIRED).await;

        session.enter(SessionState::Planning)?;
        let plan = match planner::plan(asset.duration_seconds, self.max_segment_seconds) {
            Ok(plan) => plan,
            Err(e) => {
                asset.discard();
                return Err(e);
            }
        };
        info!(session = %session.id, "Planned {} segment(s)", plan.len());
        self.advance(session, milestones::PLANNED).await;

        session.enter(SessionState::Encoding)?;
        outputs.segments = self
            .transcoder
            .encode(asset, &identifier, &plan, &session.workspace)
            .await?;
        if !outputs.segments.iter().any(AudioSegment::is_encoded) {
            return Err(SplitcastError::NothingEncoded(outputs.segments.len()));
        }
        self.advance(session, milestones::ENCODED).await;

        session.enter(SessionState::Delivering)?;
        let report = self.delivery.deliver(session.chat, &outputs.segments).await;
        let delivered = report.ensure_complete();
        outputs.delivery = Some(report);
        delivered?;
        self.advance(session, milestones::DELIVERED).await;

        session.enter(SessionState::Done)?;
        self.advance(session, milestones::DONE).await;
        Ok(())
    }

    /// Report progress, skipping milestones already shown.
    ///
    /// A restarted pipeline passes its earlier milestones again; those are
    /// not re-sent so the message never moves backwards.
    async fn advance(&self, session: &mut Session, fraction: f64) {
        if session.progress.message.is_some() && fraction <= session.progress.fraction {
            return;
        }
        if let Err(e) = self.progress.report(session, fraction).await {
            warn!(session = %session.id, "Progress update failed: {}", e);
        }
    }
}
