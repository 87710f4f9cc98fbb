//! Live-stream acquisition via streamlink.
//!
//! The page title is scraped from the `og:title` meta tag; when that fails a
//! placeholder title is used and acquisition continues.

use super::{MediaInfo, RawMediaAsset};
use crate::audio::{probe_duration, run_tool, stderr_tail};
use crate::config::{LiveStreamSettings, ToolSettings};
use crate::error::{AcquisitionKind, Result, SplitcastError};
use crate::identifier::Identifier;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, instrument, warn};

/// Container written by the recorder.
const CONTAINER: &str = "ts";

static OG_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<meta\s[^>]*?(?:property\s*=\s*["']og:title["'][^>]*?content\s*=\s*["']([^"']*)["']|content\s*=\s*["']([^"']*)["'][^>]*?property\s*=\s*["']og:title["'])"#,
    )
    .expect("Invalid regex")
});

static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:([0-9]{1,7})|[xX]([0-9a-fA-F]{1,6}));").expect("Invalid regex"));

/// Records a live stream (or its VOD) to a local file.
pub struct LiveStreamSource {
    http: reqwest::Client,
    streamlink: String,
    ffprobe: String,
    settings: LiveStreamSettings,
}

impl LiveStreamSource {
    pub fn new(tools: &ToolSettings, settings: &LiveStreamSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(concat!("splitcast/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            streamlink: tools.streamlink.clone(),
            ffprobe: tools.ffprobe.clone(),
            settings: settings.clone(),
        })
    }

    /// Resolve the page title. A failed lookup yields the placeholder title.
    #[instrument(skip(self))]
    pub async fn resolve(&self, url: &str) -> MediaInfo {
        let title = match self.fetch_title(url).await {
            Ok(Some(title)) => title,
            Ok(None) => {
                warn!("No og:title on {}, using placeholder title", url);
                self.settings.placeholder_title.clone()
            }
            Err(e) => {
                warn!("Title lookup for {} failed: {}", url, e);
                self.settings.placeholder_title.clone()
            }
        };

        MediaInfo {
            title,
            duration_seconds: None,
        }
    }

    /// Record the stream to `{workspace}/{identifier}.ts` unless already present.
    #[instrument(skip_all, fields(url = %url, identifier = %identifier))]
    pub async fn fetch(&self, url: &str, identifier: &Identifier, workspace: &Path) -> Result<RawMediaAsset> {
        let local_path = workspace.join(format!("{}.{}", identifier, CONTAINER));

        if local_path.exists() {
            info!("Recording already present at {:?}, skipping download", local_path);
        } else {
            self.record(url, &local_path).await?;
        }

        let duration_seconds = probe_duration(&self.ffprobe, &local_path).await?;

        Ok(RawMediaAsset {
            local_path,
            duration_seconds,
            container: CONTAINER.to_string(),
        })
    }

    async fn fetch_title(&self, url: &str) -> Result<Option<String>> {
        let html = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(extract_og_title(&html))
    }

    async fn record(&self, url: &str, dest: &Path) -> Result<()> {
        info!("Recording {} to {:?}", url, dest);

        let output = run_tool(
            &self.streamlink,
            Command::new(&self.streamlink)
                .arg(url)
                .arg(&self.settings.quality)
                .arg("--output").arg(dest)
                .arg(format!("--stream-segment-threads={}", self.settings.segment_threads))
                .arg(format!("--hls-live-edge={}", self.settings.live_edge))
                .arg(format!(
                    "--stream-segment-timeout={}",
                    self.settings.segment_timeout_seconds
                ))
                .stdout(Stdio::null())
                .stderr(Stdio::piped()),
        )
        .await?;

        if !output.status.success() {
            return Err(SplitcastError::acquisition(
                AcquisitionKind::Download,
                format!("streamlink exited with {}: {}", output.status, stderr_tail(&output)),
            ));
        }

        if !dest.exists() {
            return Err(SplitcastError::acquisition(
                AcquisitionKind::Download,
                "streamlink finished without writing a file",
            ));
        }

        Ok(())
    }
}

/// Extract the display title from a page's `og:title` meta tag.
///
/// Titles of the form `"Name - Site"` keep only the part before the last
/// `" - "`.
pub fn extract_og_title(html: &str) -> Option<String> {
    let caps = OG_TITLE.captures(html)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let decoded = decode_entities(raw);

    let title = match decoded.rsplit_once(" - ") {
        Some((name, _site)) => name,
        None => decoded.as_str(),
    }
    .trim();

    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

fn decode_entities(s: &str) -> String {
    let named = s
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");

    let numeric = NUMERIC_ENTITY.replace_all(&named, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(dec), _) => dec.as_str().parse::<u32>().ok(),
            (_, Some(hex)) => u32::from_str_radix(hex.as_str(), 16).ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    numeric.replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::sanitize;

    #[test]
    fn test_extract_og_title() {
        let html = r#"<html><head>
            <meta property="og:site_name" content="Twitch">
            <meta property="og:title" content="Speedrun Marathon Day 3 - Twitch">
            </head></html>"#;
        assert_eq!(extract_og_title(html).as_deref(), Some("Speedrun Marathon Day 3"));
    }

    #[test]
    fn test_extract_og_title_content_first() {
        let html = r#"<meta content='Late Night Chess' property='og:title' />"#;
        assert_eq!(extract_og_title(html).as_deref(), Some("Late Night Chess"));
    }

    #[test]
    fn test_extract_og_title_keeps_inner_dashes() {
        let html = r#"<meta property="og:title" content="A - B &amp; C - Twitch">"#;
        assert_eq!(extract_og_title(html).as_deref(), Some("A - B & C"));
    }

    #[test]
    fn test_extract_og_title_missing() {
        assert_eq!(extract_og_title("<html><title>x</title></html>"), None);
        assert_eq!(extract_og_title(r#"<meta property="og:title" content=" - Twitch">"#), None);
    }

    #[test]
    fn test_extract_og_title_numeric_entities() {
        let html = r#"<meta property="og:title" content="Caf&#233; &#x26; Chess &#8211; Finals - Twitch">"#;
        assert_eq!(extract_og_title(html).as_deref(), Some("Café & Chess – Finals"));
        assert_eq!(sanitize("Café & Chess – Finals").as_str(), "Cafe_Chess_Finals");
    }

    #[test]
    fn test_decode_entities_leaves_invalid_codes() {
        assert_eq!(decode_entities("a &#xD800; b"), "a &#xD800; b");
        assert_eq!(decode_entities("&amp;#39;"), "&#39;");
    }

    #[tokio::test]
    async fn test_unreachable_page_falls_back_to_placeholder() {
        let source = LiveStreamSource::new(&ToolSettings::default(), &LiveStreamSettings::default()).unwrap();
        let info = source.resolve("http://127.0.0.1:9/nothing").await;
        assert_eq!(info.title, "Title not found");
        assert_eq!(info.duration_seconds, None);
        assert_eq!(sanitize(&info.title).as_str(), "Title_not_found");
    }

    #[tokio::test]
    async fn test_existing_recording_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ToolSettings {
            streamlink: "splitcast-no-such-streamlink".into(),
            ffprobe: "splitcast-no-such-ffprobe".into(),
            ..ToolSettings::default()
        };
        let source = LiveStreamSource::new(&tools, &LiveStreamSettings::default()).unwrap();
        let identifier = sanitize("Stream Title");
        std::fs::write(dir.path().join("Stream_Title.ts"), b"x").unwrap();

        // The recorder is skipped, so the first missing tool hit is ffprobe.
        let err = source
            .fetch("https://www.twitch.tv/videos/1", &identifier, dir.path())
            .await
            .unwrap_err();
        match err {
            SplitcastError::ToolNotFound(tool) => assert_eq!(tool, "splitcast-no-such-ffprobe"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ToolSettings {
            streamlink: "splitcast-no-such-streamlink".into(),
            ..ToolSettings::default()
        };
        let source = LiveStreamSource::new(&tools, &LiveStreamSettings::default()).unwrap();
        let err = source
            .fetch("https://www.twitch.tv/videos/1", &sanitize("x"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, SplitcastError::ToolNotFound(_)));
    }
}
