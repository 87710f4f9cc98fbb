//! Test doubles for the pipeline's trait seams.

use crate::audio::{EncodingProfile, SegmentEncoder};
use crate::chat::{ChatEndpoint, ChatError, ChatId, MessageId};
use crate::error::{AcquisitionKind, Result, SplitcastError};
use crate::identifier::Identifier;
use crate::planner::SegmentSpec;
use crate::source::{Acquirer, MediaInfo, RawMediaAsset, SourceReference};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Something the recording chat endpoint saw.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Text { chat: ChatId, id: MessageId, text: String },
    Edit { chat: ChatId, id: MessageId, text: String },
    Audio { chat: ChatId, file_name: String, delivered: bool },
}

/// Chat endpoint that records every call and fails audio uploads on demand.
#[derive(Default)]
pub struct RecordingChat {
    events: Mutex<Vec<ChatEvent>>,
    audio_failures: Mutex<HashMap<String, u32>>,
    next_id: Mutex<i64>,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` uploads of `file_name` fail with an API error.
    pub fn fail_audio(self, file_name: &str, count: u32) -> Self {
        self.audio_failures
            .lock()
            .unwrap()
            .insert(file_name.to_string(), count);
        self
    }

    pub fn events(&self) -> Vec<ChatEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ChatEvent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ChatEvent::Edit { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// File names of every upload attempt, in order.
    pub fn audio_attempts(&self) -> Vec<(String, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ChatEvent::Audio { file_name, delivered, .. } => Some((file_name, delivered)),
                _ => None,
            })
            .collect()
    }

    fn next_message_id(&self) -> MessageId {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        MessageId(*next)
    }
}

#[async_trait]
impl ChatEndpoint for RecordingChat {
    async fn send_text(&self, chat: ChatId, text: &str) -> std::result::Result<MessageId, ChatError> {
        let id = self.next_message_id();
        self.events.lock().unwrap().push(ChatEvent::Text {
            chat,
            id,
            text: text.to_string(),
        });
        Ok(id)
    }

    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> std::result::Result<(), ChatError> {
        self.events.lock().unwrap().push(ChatEvent::Edit {
            chat,
            id: message,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_audio(
        &self,
        chat: ChatId,
        path: &Path,
        _timeout: Duration,
    ) -> std::result::Result<MessageId, ChatError> {
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();

        let fail = {
            let mut failures = self.audio_failures.lock().unwrap();
            match failures.get_mut(&file_name) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };

        self.events.lock().unwrap().push(ChatEvent::Audio {
            chat,
            file_name: file_name.clone(),
            delivered: !fail,
        });

        if fail {
            return Err(ChatError::Api {
                code: 502,
                description: "Bad Gateway".to_string(),
            });
        }
        if !path.exists() {
            return Err(ChatError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)));
        }
        Ok(self.next_message_id())
    }
}

/// Encoder that writes a stub file per segment and fails chosen indices.
pub struct ScriptedEncoder {
    failing: Vec<usize>,
    calls: Mutex<Vec<(usize, EncodingProfile)>>,
}

impl ScriptedEncoder {
    pub fn failing_on(indices: &[usize]) -> Self {
        Self {
            failing: indices.to_vec(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn profiles(&self) -> Vec<EncodingProfile> {
        self.calls.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }
}

#[async_trait]
impl SegmentEncoder for ScriptedEncoder {
    async fn encode_segment(
        &self,
        source: &Path,
        spec: &SegmentSpec,
        profile: &EncodingProfile,
        dest: &Path,
    ) -> Result<()> {
        self.calls.lock().unwrap().push((spec.index, profile.clone()));
        assert!(source.exists(), "raw asset must exist while encoding");

        if self.failing.contains(&spec.index) {
            return Err(SplitcastError::Encode {
                part: spec.index + 1,
                message: "scripted failure".to_string(),
            });
        }
        std::fs::write(dest, format!("segment {}", spec.index))?;
        Ok(())
    }
}

/// What a scripted acquisition attempt should do.
#[derive(Debug, Clone)]
pub enum AcquireStep {
    /// Produce an asset with this title and duration.
    Asset { title: String, duration_seconds: f64 },
    /// Fail while resolving the title.
    Fail(AcquisitionKind),
    /// Resolve `title`, then fail the download.
    FailFetch { title: String, kind: AcquisitionKind },
}

/// Acquirer that replays a script, one step per attempt.
///
/// The last step repeats once the script runs out.
pub struct ScriptedAcquirer {
    steps: Mutex<Vec<AcquireStep>>,
    current: Mutex<Option<AcquireStep>>,
    resolves: Mutex<u32>,
    fetches: Mutex<Vec<(PathBuf, Identifier)>>,
}

impl ScriptedAcquirer {
    pub fn new(steps: Vec<AcquireStep>) -> Self {
        Self {
            steps: Mutex::new(steps),
            current: Mutex::new(None),
            resolves: Mutex::new(0),
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn asset(title: &str, duration_seconds: f64) -> AcquireStep {
        AcquireStep::Asset {
            title: title.to_string(),
            duration_seconds,
        }
    }

    /// Acquisition attempts started.
    pub fn calls(&self) -> u32 {
        *self.resolves.lock().unwrap()
    }

    /// Workspace of every download attempt.
    pub fn workspaces(&self) -> Vec<PathBuf> {
        self.fetches.lock().unwrap().iter().map(|(w, _)| w.clone()).collect()
    }

    /// Identifier of every download attempt.
    pub fn fetched_identifiers(&self) -> Vec<Identifier> {
        self.fetches.lock().unwrap().iter().map(|(_, id)| id.clone()).collect()
    }

    fn next_step(&self) -> AcquireStep {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.remove(0)
        } else {
            steps[0].clone()
        }
    }
}

#[async_trait]
impl Acquirer for ScriptedAcquirer {
    async fn resolve(&self, _source: &SourceReference) -> Result<MediaInfo> {
        *self.resolves.lock().unwrap() += 1;
        let step = self.next_step();
        *self.current.lock().unwrap() = Some(step.clone());

        match step {
            AcquireStep::Fail(kind) => Err(SplitcastError::acquisition(kind, "scripted failure")),
            AcquireStep::Asset { title, duration_seconds } => Ok(MediaInfo {
                title,
                duration_seconds: Some(duration_seconds),
            }),
            AcquireStep::FailFetch { title, .. } => Ok(MediaInfo {
                title,
                duration_seconds: None,
            }),
        }
    }

    async fn fetch(
        &self,
        _source: &SourceReference,
        info: &MediaInfo,
        identifier: &Identifier,
        workspace: &Path,
    ) -> Result<RawMediaAsset> {
        self.fetches
            .lock()
            .unwrap()
            .push((workspace.to_path_buf(), identifier.clone()));

        let step = self.current.lock().unwrap().clone();
        if let Some(AcquireStep::FailFetch { kind, .. }) = step {
            return Err(SplitcastError::acquisition(kind, "scripted download failure"));
        }

        std::fs::create_dir_all(workspace)?;
        let local_path = workspace.join(format!("{identifier}.m4a"));
        std::fs::write(&local_path, b"raw")?;
        Ok(RawMediaAsset {
            local_path,
            duration_seconds: info.duration_seconds.unwrap_or_default(),
            container: "m4a".to_string(),
        })
    }
}
