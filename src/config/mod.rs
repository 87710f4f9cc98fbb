//! Configuration module for Splitcast.
//!
//! Handles loading application settings. Settings are read once at startup
//! and shared read-only between sessions.

mod settings;

pub use settings::{
    DeliverySettings, EncodingSettings, GeneralSettings, LiveStreamSettings, PipelineSettings,
    SegmentingSettings, Settings, TelegramSettings, ToolSettings, BOT_TOKEN_ENV,
};
