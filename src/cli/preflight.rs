//! Pre-flight checks before starting sessions.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{Settings, BOT_TOKEN_ENV};
use crate::error::{Result, SplitcastError};
use crate::source::Platform;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// A local run requires the fetcher for its platform and the media tools.
    Run(Platform),
    /// The bot can be sent any platform, so it requires every tool and a bot token.
    Bot,
}

/// External programs `operation` needs, fetchers first.
pub fn required_tools(operation: Operation, settings: &Settings) -> Vec<&str> {
    let tools = &settings.tools;
    let mut required = match operation {
        Operation::Run(Platform::VideoHost) => vec![tools.ytdlp.as_str()],
        Operation::Run(Platform::LiveStreamHost) => vec![tools.streamlink.as_str()],
        Operation::Bot => vec![tools.ytdlp.as_str(), tools.streamlink.as_str()],
    };
    required.push(tools.ffmpeg.as_str());
    required.push(tools.ffprobe.as_str());
    required
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    for tool in required_tools(operation, settings) {
        check_tool(tool)?;
    }

    if let Operation::Bot = operation {
        check_bot_token(settings)?;
    }
    Ok(())
}

/// Check that a bot token is configured.
pub fn check_bot_token(settings: &Settings) -> Result<String> {
    settings.telegram.token().ok_or_else(|| {
        SplitcastError::Config(format!(
            "No bot token configured. Set {} or telegram.bot_token in the config file",
            BOT_TOKEN_ENV
        ))
    })
}

/// Arguments that make `name` print its version.
pub(crate) fn version_arg(name: &str) -> &'static str {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let base = std::path::Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match base.as_str() {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg(version_arg(name)).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(SplitcastError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SplitcastError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(SplitcastError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_arg() {
        assert_eq!(version_arg("ffmpeg"), "-version");
        assert_eq!(version_arg("/usr/local/bin/ffprobe"), "-version");
        assert_eq!(version_arg("yt-dlp"), "--version");
        assert_eq!(version_arg("streamlink"), "--version");
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let mut settings = Settings::default();
        settings.tools.ytdlp = "splitcast-no-such-tool".to_string();
        let err = check(Operation::Run(Platform::VideoHost), &settings).unwrap_err();
        assert!(matches!(err, SplitcastError::ToolNotFound(name) if name == "splitcast-no-such-tool"));
    }

    #[test]
    fn test_run_requires_only_its_platform_fetcher() {
        let mut settings = Settings::default();
        settings.tools.streamlink = "splitcast-no-such-streamlink".to_string();

        let video = required_tools(Operation::Run(Platform::VideoHost), &settings);
        assert_eq!(video, vec!["yt-dlp", "ffmpeg", "ffprobe"]);

        let live = required_tools(Operation::Run(Platform::LiveStreamHost), &settings);
        assert_eq!(live, vec!["splitcast-no-such-streamlink", "ffmpeg", "ffprobe"]);
        let err = check(Operation::Run(Platform::LiveStreamHost), &settings).unwrap_err();
        assert!(matches!(err, SplitcastError::ToolNotFound(name) if name == "splitcast-no-such-streamlink"));

        let bot = required_tools(Operation::Bot, &settings);
        assert!(bot.contains(&"yt-dlp") && bot.contains(&"splitcast-no-such-streamlink"));
    }
}
