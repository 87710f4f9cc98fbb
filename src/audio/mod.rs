//! Audio processing: duration probing, per-segment encoding and the
//! transcoding stage that turns a raw asset into deliverable parts.
//!
//! All work is delegated to ffmpeg/ffprobe.

mod encoder;
mod probe;
mod transcoder;

pub use encoder::{EncodingProfile, FfmpegEncoder, SegmentEncoder};
pub use probe::probe_duration;
pub use transcoder::{AudioSegment, SegmentOutcome, Transcoder};

use crate::error::{Result, SplitcastError};
use std::process::Output;
use tokio::process::Command;

/// Run an external tool to completion and capture its output.
///
/// A missing executable maps to [`SplitcastError::ToolNotFound`]; a non-zero
/// exit status is left for the caller to interpret.
pub(crate) async fn run_tool(tool: &str, command: &mut Command) -> Result<Output> {
    match command.output().await {
        Ok(output) => Ok(output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SplitcastError::ToolNotFound(tool.to_string()))
        }
        Err(e) => Err(SplitcastError::ToolFailed(format!("{tool} execution failed: {e}"))),
    }
}

/// Last non-empty line of a tool's stderr, for error messages.
pub(crate) fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no error output")
        .trim()
        .to_string()
}
