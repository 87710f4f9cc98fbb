//! Video-host acquisition via yt-dlp.

use super::{container_of, find_media_file, MediaInfo, RawMediaAsset};
use crate::audio::{probe_duration, run_tool, stderr_tail};
use crate::config::ToolSettings;
use crate::error::{AcquisitionKind, Result, SplitcastError};
use crate::identifier::Identifier;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Upstream messages meaning the video's streaming data was not returned.
const MISSING_STREAMING_DATA: &[&str] = &[
    "streamingdata",
    "no video formats found",
    "requested format is not available",
];

/// Fetches the best audio-only stream of a hosted video.
pub struct VideoHostSource {
    ytdlp: String,
    ffprobe: String,
}

impl VideoHostSource {
    pub fn new(tools: &ToolSettings) -> Self {
        Self {
            ytdlp: tools.ytdlp.clone(),
            ffprobe: tools.ffprobe.clone(),
        }
    }

    /// Resolve title and duration without downloading.
    #[instrument(skip(self))]
    pub async fn resolve(&self, url: &str) -> Result<MediaInfo> {
        let info = self.fetch_metadata(url).await?;
        info!("Resolved '{}'", info.title);
        Ok(info)
    }

    /// Download the audio as `identifier` and settle its duration.
    #[instrument(skip_all, fields(url = %url, identifier = %identifier))]
    pub async fn fetch(
        &self,
        url: &str,
        info: &MediaInfo,
        identifier: &Identifier,
        workspace: &Path,
    ) -> Result<RawMediaAsset> {
        let local_path = self.download(url, identifier, workspace).await?;

        let duration_seconds = match info.duration_seconds {
            Some(d) if d > 0.0 => d,
            _ => probe_duration(&self.ffprobe, &local_path).await?,
        };

        Ok(RawMediaAsset {
            container: container_of(&local_path),
            local_path,
            duration_seconds,
        })
    }

    async fn fetch_metadata(&self, url: &str) -> Result<MediaInfo> {
        let output = run_tool(
            &self.ytdlp,
            Command::new(&self.ytdlp).args([
                "--dump-json",
                "--no-download",
                "--no-playlist",
                "--no-warnings",
                url,
            ]),
        )
        .await?;

        if !output.status.success() {
            return Err(classify_failure(
                &String::from_utf8_lossy(&output.stderr),
                AcquisitionKind::Manifest,
            ));
        }

        parse_metadata(&String::from_utf8_lossy(&output.stdout))
    }

    /// Download the best audio-only stream to `{workspace}/{identifier}.<ext>`.
    async fn download(
        &self,
        url: &str,
        identifier: &Identifier,
        workspace: &Path,
    ) -> Result<std::path::PathBuf> {
        if let Some(existing) = find_media_file(workspace, identifier.as_str()) {
            info!("Using existing download {:?}", existing);
            return Ok(existing);
        }

        let template = workspace.join(format!("{}.%(ext)s", identifier));
        debug!("Downloading audio to {:?}", template);

        let output = run_tool(
            &self.ytdlp,
            Command::new(&self.ytdlp)
                .arg("--format").arg("bestaudio/best")
                .arg("--output").arg(&template)
                .arg("--no-playlist")
                .arg("--quiet")
                .arg("--no-warnings")
                .arg(url)
                .stdout(Stdio::null())
                .stderr(Stdio::piped()),
        )
        .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr, AcquisitionKind::Download));
        }

        find_media_file(workspace, identifier.as_str()).ok_or_else(|| {
            SplitcastError::acquisition(
                AcquisitionKind::Download,
                format!("yt-dlp finished but no file named {identifier} was found ({})", stderr_tail(&output)),
            )
        })
    }
}

/// Map yt-dlp's stderr to an acquisition error of the right kind.
fn classify_failure(stderr: &str, fallback: AcquisitionKind) -> SplitcastError {
    let lowered = stderr.to_lowercase();
    let kind = if MISSING_STREAMING_DATA.iter().any(|m| lowered.contains(m)) {
        AcquisitionKind::MissingStreamingData
    } else {
        fallback
    };

    let message = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("yt-dlp failed without output")
        .trim()
        .to_string();

    SplitcastError::acquisition(kind, message)
}

fn parse_metadata(json: &str) -> Result<MediaInfo> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| {
        SplitcastError::acquisition(
            AcquisitionKind::Manifest,
            format!("Failed to parse yt-dlp output: {e}"),
        )
    })?;

    let title = value["title"]
        .as_str()
        .or_else(|| value["fulltitle"].as_str())
        .unwrap_or("Unknown Title")
        .to_string();

    Ok(MediaInfo {
        title,
        duration_seconds: value["duration"].as_f64(),
    })
}
