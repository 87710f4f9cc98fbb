//! CLI module for Splitcast.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Splitcast - split long videos and streams into chat-sized audio parts
///
/// Fetches the audio of a YouTube video or Twitch stream, cuts it into parts
/// and delivers them as MP3 files, either to a local directory or through a
/// Telegram bot.
#[derive(Parser, Debug)]
#[command(name = "splitcast")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split one URL and write the parts to a local directory
    Run {
        /// YouTube or Twitch URL (prompted for when omitted)
        url: Option<String>,

        /// Directory the finished parts are copied into
        #[arg(short, long, default_value = ".")]
        output: String,
    },

    /// Run the Telegram bot
    Bot,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
