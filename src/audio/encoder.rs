//! Single-segment encoding via ffmpeg.

use super::{run_tool, stderr_tail};
use crate::error::{Result, SplitcastError};
use crate::planner::SegmentSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Fixed output format shared by every part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingProfile {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    pub channels: u8,
    /// Bitrate in ffmpeg notation.
    pub bitrate: String,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            bitrate: "192k".to_string(),
        }
    }
}

/// Encodes one time window of a source file into an MP3.
#[async_trait]
pub trait SegmentEncoder: Send + Sync {
    async fn encode_segment(
        &self,
        source: &Path,
        spec: &SegmentSpec,
        profile: &EncodingProfile,
        dest: &Path,
    ) -> Result<()>;
}

/// ffmpeg-backed segment encoder.
pub struct FfmpegEncoder {
    program: String,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    /// Arguments for one segment, output path last.
    fn arguments(source: &Path, spec: &SegmentSpec, profile: &EncodingProfile, dest: &Path) -> Vec<String> {
        vec![
            "-ss".into(),
            format!("{:.3}", spec.start_seconds),
            "-i".into(),
            source.to_string_lossy().into_owned(),
            "-t".into(),
            format!("{:.3}", spec.duration()),
            "-vn".into(),
            "-codec:a".into(),
            "libmp3lame".into(),
            "-ar".into(),
            profile.sample_rate.to_string(),
            "-ac".into(),
            profile.channels.to_string(),
            "-b:a".into(),
            profile.bitrate.clone(),
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            dest.to_string_lossy().into_owned(),
        ]
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SegmentEncoder for FfmpegEncoder {
    async fn encode_segment(
        &self,
        source: &Path,
        spec: &SegmentSpec,
        profile: &EncodingProfile,
        dest: &Path,
    ) -> Result<()> {
        debug!(
            "Encoding {:.1}s..{:.1}s of {:?}",
            spec.start_seconds, spec.end_seconds, source
        );

        let output = run_tool(
            &self.program,
            Command::new(&self.program)
                .args(Self::arguments(source, spec, profile, dest))
                .stdout(Stdio::null())
                .stderr(Stdio::piped()),
        )
        .await?;

        if !output.status.success() {
            return Err(SplitcastError::Encode {
                part: spec.index + 1,
                message: stderr_tail(&output),
            });
        }

        if !dest.exists() {
            return Err(SplitcastError::Encode {
                part: spec.index + 1,
                message: "ffmpeg produced no output file".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_carry_profile_and_window() {
        let spec = SegmentSpec {
            index: 1,
            start_seconds: 1200.0,
            end_seconds: 2400.0,
        };
        let args = FfmpegEncoder::arguments(
            Path::new("in.m4a"),
            &spec,
            &EncodingProfile::default(),
            Path::new("out/out_2.mp3"),
        );

        let pair = |flag: &str| {
            let pos = args.iter().position(|a| a == flag).unwrap();
            args[pos + 1].clone()
        };
        assert_eq!(pair("-ss"), "1200.000");
        assert_eq!(pair("-t"), "1200.000");
        assert_eq!(pair("-ar"), "44100");
        assert_eq!(pair("-ac"), "2");
        assert_eq!(pair("-b:a"), "192k");
        assert_eq!(args.last().unwrap(), "out/out_2.mp3");
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_reported() {
        let encoder = FfmpegEncoder::with_program("splitcast-no-such-ffmpeg");
        let spec = SegmentSpec {
            index: 0,
            start_seconds: 0.0,
            end_seconds: 1.0,
        };
        let err = encoder
            .encode_segment(Path::new("a"), &spec, &EncodingProfile::default(), Path::new("b.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, SplitcastError::ToolNotFound(_)));
    }
}
