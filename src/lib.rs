//! Splitcast - split long videos and streams into chat-sized audio parts
//!
//! Splitcast takes a video or live-stream URL, fetches the audio, cuts it into
//! segments no longer than a configured maximum, encodes each segment as an
//! MP3 and delivers the parts to a chat in order, with a single progress
//! message that is edited as the job advances.
//!
//! # Architecture
//!
//! - `source` - URL classification and acquisition (yt-dlp, streamlink)
//! - `identifier` - filesystem-safe names derived from media titles
//! - `planner` - splitting a duration into segment windows
//! - `audio` - probing and per-segment encoding with ffmpeg
//! - `delivery` - ordered, retried upload of encoded parts
//! - `progress` - the per-session progress message
//! - `session` - per-job state machine and working directory
//! - `pipeline` - drives a session through every stage
//! - `chat` - chat endpoints (Telegram, terminal)
//!
//! # Example
//!
//! ```rust,no_run
//! use splitcast::chat::{ChatId, ConsoleChat};
//! use splitcast::config::Settings;
//! use splitcast::pipeline::SessionPipeline;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let chat = Arc::new(ConsoleChat::new("."));
//!     let pipeline = SessionPipeline::new(&settings, chat)?;
//!
//!     let report = pipeline.run(ChatId(0), "https://youtu.be/dQw4w9WgXcQ").await;
//!     println!("Finished in state {}", report.state);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod chat;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod error;
pub mod identifier;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod retry;
pub mod session;
pub mod source;

#[cfg(test)]
mod testing;

pub use error::{Result, SplitcastError};
