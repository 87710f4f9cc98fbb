//! CLI command implementations.

mod bot;
mod config;
mod doctor;
mod run;

pub use bot::run_bot;
pub use config::run_config;
pub use doctor::run_doctor;
pub use run::run_once;
