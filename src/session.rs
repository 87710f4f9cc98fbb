//! Per-job session state.
//!
//! A session owns everything one job touches: its working directory, the
//! pinned identifier and the progress message. Sessions share nothing
//! mutable, and each gets a fresh working directory under the configured
//! root, so two jobs whose titles sanitize to the same identifier never write
//! to the same files.

use crate::chat::ChatId;
use crate::error::{Result, SplitcastError};
use crate::identifier::Identifier;
use crate::progress::ProgressState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Unique id of a session, also its working directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline stage a session is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Acquiring,
    Planning,
    Encoding,
    Delivering,
    Done,
    Failed,
}

impl SessionState {
    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_enter(self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Idle, Acquiring)
                | (Acquiring, Planning)
                | (Planning, Encoding)
                | (Encoding, Delivering)
                | (Delivering, Done)
                | (Acquiring | Planning | Encoding | Delivering, Failed)
                | (Failed, Idle)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Acquiring => "acquiring",
            SessionState::Planning => "planning",
            SessionState::Encoding => "encoding",
            SessionState::Delivering => "delivering",
            SessionState::Done => "done",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One end-to-end job for one chat.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub chat: ChatId,
    pub workspace: PathBuf,
    pub started_at: DateTime<Utc>,
    pub progress: ProgressState,
    identifier: Option<Identifier>,
    state: SessionState,
}

impl Session {
    /// Start a session for `chat` with a fresh working directory under `work_root`.
    pub fn start(chat: ChatId, work_root: &Path) -> Self {
        let id = SessionId::generate();
        Self {
            workspace: work_root.join(id.as_str()),
            chat,
            started_at: Utc::now(),
            progress: ProgressState::new(id.clone()),
            identifier: None,
            state: SessionState::Idle,
            id,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    /// Move to `next`, rejecting transitions the state machine forbids.
    pub fn enter(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_enter(next) {
            return Err(SplitcastError::InvalidTransition(format!(
                "{} -> {}",
                self.state, next
            )));
        }
        debug!(session = %self.id, "{} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Record the job's identifier. The first one wins for the session's lifetime.
    pub fn pin_identifier(&mut self, identifier: &Identifier) -> Identifier {
        match &self.identifier {
            None => {
                self.identifier = Some(identifier.clone());
                identifier.clone()
            }
            Some(existing) => {
                if existing != identifier {
                    warn!(
                        session = %self.id,
                        "Ignoring identifier {} for pinned {}", identifier, existing
                    );
                }
                existing.clone()
            }
        }
    }

    /// Remove the working directory if nothing is left in it.
    pub fn remove_empty_workspace(&self) {
        if let Some(id) = &self.identifier {
            let _ = std::fs::remove_dir(self.workspace.join(id.as_str()));
        }
        match std::fs::remove_dir(&self.workspace) {
            Ok(()) => debug!(session = %self.id, "Removed workspace"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(_) => debug!(session = %self.id, "Workspace not empty, kept {:?}", self.workspace),
        }
    }
}
