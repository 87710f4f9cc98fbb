//! Media acquisition for Splitcast.
//!
//! Resolves a user-supplied URL to a local raw media file plus the identifier
//! used for every file derived from it. Two platform classes are supported:
//! on-demand video hosts (fetched with yt-dlp) and live-stream hosts
//! (recorded with streamlink).

mod live_stream;
mod video_host;

pub use live_stream::{extract_og_title, LiveStreamSource};
pub use video_host::VideoHostSource;

use crate::config::Settings;
use crate::error::{Result, SplitcastError};
use crate::identifier::Identifier;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// Class of media platform a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// On-demand video host (YouTube).
    VideoHost,
    /// Live-stream host (Twitch).
    LiveStreamHost,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::VideoHost => write!(f, "video host"),
            Platform::LiveStreamHost => write!(f, "live-stream host"),
        }
    }
}

const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be"];
const LIVE_STREAM_HOSTS: &[&str] = &["twitch.tv"];

/// A validated source URL together with its platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    pub url: String,
    pub platform: Platform,
}

impl SourceReference {
    /// Classify `input` by its host name.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let parsed = Url::parse(trimmed)
            .or_else(|_| Url::parse(&format!("https://{trimmed}")))
            .map_err(|_| SplitcastError::UnsupportedPlatform(trimmed.to_string()))?;

        let host = parsed
            .host_str()
            .map(|h| h.to_ascii_lowercase())
            .ok_or_else(|| SplitcastError::UnsupportedPlatform(trimmed.to_string()))?;

        let platform = if VIDEO_HOSTS.iter().any(|h| host.contains(h)) {
            Platform::VideoHost
        } else if LIVE_STREAM_HOSTS.iter().any(|h| host.contains(h)) {
            Platform::LiveStreamHost
        } else {
            return Err(SplitcastError::UnsupportedPlatform(host));
        };

        Ok(Self {
            url: parsed.to_string(),
            platform,
        })
    }
}

/// A downloaded, not yet segmented media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMediaAsset {
    pub local_path: PathBuf,
    pub duration_seconds: f64,
    /// Container format tag (file extension).
    pub container: String,
}

impl RawMediaAsset {
    /// Remove the local file. Failures are logged, not returned.
    pub fn discard(self) {
        match std::fs::remove_file(&self.local_path) {
            Ok(()) => debug!("Removed raw asset {:?}", self.local_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove raw asset {:?}: {}", self.local_path, e),
        }
    }
}

/// What is known about a source before anything is downloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Human-readable title the identifier is derived from.
    pub title: String,
    /// Duration reported by the platform, when it reports one.
    pub duration_seconds: Option<f64>,
}

/// Resolves a source into a title, then fetches it into a local raw asset.
///
/// The two steps are separate so the caller can fix the job's identifier as
/// soon as the title is known, before the download can fail.
#[async_trait]
pub trait Acquirer: Send + Sync {
    /// Look up the title (and duration, if cheap) of `source`.
    async fn resolve(&self, source: &SourceReference) -> Result<MediaInfo>;

    /// Download or record `source` to `{workspace}/{identifier}.<container>`.
    async fn fetch(
        &self,
        source: &SourceReference,
        info: &MediaInfo,
        identifier: &Identifier,
        workspace: &Path,
    ) -> Result<RawMediaAsset>;
}

/// Dispatches acquisition to the adapter for the source's platform.
pub struct AcquisitionGateway {
    video: VideoHostSource,
    live: LiveStreamSource,
}

impl AcquisitionGateway {
    pub fn new(video: VideoHostSource, live: LiveStreamSource) -> Self {
        Self { video, live }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            VideoHostSource::new(&settings.tools),
            LiveStreamSource::new(&settings.tools, &settings.live_stream)?,
        ))
    }
}

#[async_trait]
impl Acquirer for AcquisitionGateway {
    async fn resolve(&self, source: &SourceReference) -> Result<MediaInfo> {
        match source.platform {
            Platform::VideoHost => self.video.resolve(&source.url).await,
            Platform::LiveStreamHost => Ok(self.live.resolve(&source.url).await),
        }
    }

    async fn fetch(
        &self,
        source: &SourceReference,
        info: &MediaInfo,
        identifier: &Identifier,
        workspace: &Path,
    ) -> Result<RawMediaAsset> {
        tokio::fs::create_dir_all(workspace).await?;

        match source.platform {
            Platform::VideoHost => self.video.fetch(&source.url, info, identifier, workspace).await,
            Platform::LiveStreamHost => self.live.fetch(&source.url, identifier, workspace).await,
        }
    }
}

/// Locates a downloaded media file whose stem is exactly `stem`.
fn find_media_file(dir: &Path, stem: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;

    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .find(|path| {
            let same_stem = path.file_stem().and_then(|s| s.to_str()) == Some(stem);
            let partial = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("part") | Some("ytdl") | None
            );
            same_stem && !partial
        })
}

/// Container tag for a file, from its extension.
fn container_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin")
        .to_ascii_lowercase()
}
