//! Media duration probing.

use super::run_tool;
use crate::error::{Result, SplitcastError};
use std::path::Path;
use tokio::process::Command;

/// Queries the duration of a media file using ffprobe with JSON output.
pub async fn probe_duration(ffprobe: &str, path: &Path) -> Result<f64> {
    let output = run_tool(
        ffprobe,
        Command::new(ffprobe)
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg(path),
    )
    .await?;

    if !output.status.success() {
        return Err(SplitcastError::ToolFailed(format!(
            "ffprobe could not read {}",
            path.display()
        )));
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_duration(json: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|_| SplitcastError::ToolFailed("Invalid ffprobe output".into()))?;

    let duration = parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| SplitcastError::ToolFailed("Could not determine media duration".into()))?;

    if duration.is_finite() && duration > 0.0 {
        Ok(duration)
    } else {
        Err(SplitcastError::InvalidDuration(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let json = r#"{"format": {"filename": "a.m4a", "duration": "3600.046000"}}"#;
        assert!((parse_duration(json).unwrap() - 3600.046).abs() < 1e-9);
    }

    #[test]
    fn test_parse_duration_missing_field() {
        assert!(matches!(
            parse_duration(r#"{"format": {}}"#),
            Err(SplitcastError::ToolFailed(_))
        ));
        assert!(parse_duration("not json").is_err());
    }

    #[test]
    fn test_zero_duration_is_invalid() {
        assert!(matches!(
            parse_duration(r#"{"format": {"duration": "0.000000"}}"#),
            Err(SplitcastError::InvalidDuration(_))
        ));
    }
}
