//! Configuration settings for Splitcast.

use crate::audio::EncodingProfile;
use crate::planner::DEFAULT_MAX_SEGMENT_SECONDS;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the chat bot token.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub segmenting: SegmentingSettings,
    pub encoding: EncodingSettings,
    pub delivery: DeliverySettings,
    pub pipeline: PipelineSettings,
    pub tools: ToolSettings,
    pub live_stream: LiveStreamSettings,
    pub telegram: TelegramSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Root for per-session working directories.
    pub work_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/splitcast".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Segment planning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentingSettings {
    /// Nominal maximum length of one part.
    pub max_segment_seconds: u32,
}

impl Default for SegmentingSettings {
    fn default() -> Self {
        Self {
            max_segment_seconds: DEFAULT_MAX_SEGMENT_SECONDS,
        }
    }
}

/// Output audio format for every part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingSettings {
    pub sample_rate: u32,
    pub channels: u8,
    /// Bitrate in ffmpeg notation (e.g. "192k").
    pub bitrate: String,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        let profile = EncodingProfile::default();
        Self {
            sample_rate: profile.sample_rate,
            channels: profile.channels,
            bitrate: profile.bitrate,
        }
    }
}

/// Per-part delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    /// Total send attempts per part.
    pub max_attempts: u32,
    /// Pause between send attempts.
    pub retry_delay_seconds: u64,
    /// Timeout for a single audio upload.
    pub send_timeout_seconds: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_seconds: 5,
            send_timeout_seconds: 600,
        }
    }
}

/// Whole-session restart settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Total pipeline runs when the source reports missing streaming data.
    pub max_attempts: u32,
    /// Pause between pipeline runs.
    pub retry_delay_seconds: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_seconds: 5,
        }
    }
}

/// External executables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub ytdlp: String,
    pub streamlink: String,
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ytdlp: "yt-dlp".to_string(),
            streamlink: "streamlink".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

/// Live-stream recorder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveStreamSettings {
    /// Stream quality selector passed to the recorder.
    pub quality: String,
    pub segment_threads: u32,
    pub live_edge: u32,
    pub segment_timeout_seconds: u32,
    /// Title used when the page title cannot be resolved.
    pub placeholder_title: String,
}

impl Default for LiveStreamSettings {
    fn default() -> Self {
        Self {
            quality: "audio_only,audio,worst".to_string(),
            segment_threads: 8,
            live_edge: 6,
            segment_timeout_seconds: 5,
            placeholder_title: "Title not found".to_string(),
        }
    }
}

/// Chat platform settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub api_base: String,
    /// Bot token. The `TELEGRAM_BOT_TOKEN` environment variable takes precedence.
    pub bot_token: Option<String>,
    /// Long-poll timeout for update fetching.
    pub poll_timeout_seconds: u64,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: None,
            poll_timeout_seconds: 30,
        }
    }
}

impl TelegramSettings {
    /// Resolve the bot token from the environment or the config file.
    pub fn token(&self) -> Option<String> {
        std::env::var(BOT_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.bot_token.clone().filter(|t| !t.is_empty()))
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::SplitcastError;

        if self.segmenting.max_segment_seconds == 0 {
            return Err(SplitcastError::Config(
                "segmenting.max_segment_seconds must be positive".to_string(),
            ));
        }
        if self.encoding.sample_rate == 0 || self.encoding.channels == 0 {
            return Err(SplitcastError::Config(
                "encoding.sample_rate and encoding.channels must be positive".to_string(),
            ));
        }
        if self.delivery.max_attempts == 0 || self.pipeline.max_attempts == 0 {
            return Err(SplitcastError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Log level for the crate: `-v` flags win over `general.log_level`.
    pub fn log_level(&self, verbose: u8) -> &str {
        match verbose {
            0 => self.general.log_level.as_str(),
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("splitcast")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded working directory path.
    pub fn work_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.work_dir)
    }

    pub fn encoding_profile(&self) -> EncodingProfile {
        EncodingProfile {
            sample_rate: self.encoding.sample_rate,
            channels: self.encoding.channels,
            bitrate: self.encoding.bitrate.clone(),
        }
    }

    pub fn delivery_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.delivery.max_attempts,
            Duration::from_secs(self.delivery.retry_delay_seconds),
        )
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery.send_timeout_seconds)
    }

    pub fn pipeline_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.pipeline.max_attempts,
            Duration::from_secs(self.pipeline.retry_delay_seconds),
        )
    }
}
