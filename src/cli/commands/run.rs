//! Run command: one session against the terminal.

use crate::chat::{ChatId, ConsoleChat};
use crate::cli::output::format_duration;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::{SessionPipeline, SessionReport};
use crate::source::SourceReference;
use anyhow::Result;
use chrono::Utc;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Chat id used for the terminal "conversation".
const CONSOLE_CHAT: ChatId = ChatId(0);

/// Run the run command.
pub async fn run_once(url: Option<String>, output: &str, settings: Settings) -> Result<()> {
    let url = match url {
        Some(url) => url,
        None => prompt_url()?,
    };
    if url.is_empty() {
        return Err(anyhow::anyhow!("No URL given"));
    }

    let source = match SourceReference::parse(&url) {
        Ok(source) => source,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };
    if let Err(e) = preflight::check(Operation::Run(source.platform), &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'splitcast doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let output_dir = Settings::expand_path(output);
    std::fs::create_dir_all(&output_dir)?;

    let chat = Arc::new(ConsoleChat::new(&output_dir));
    let pipeline = SessionPipeline::new(&settings, chat.clone())?;

    Output::info(&format!("Processing: {}", url));
    let report = pipeline.run(CONSOLE_CHAT, &url).await;
    chat.finish().await;

    print_report(&report, chat.output_dir());

    match report.failure {
        None => Ok(()),
        Some(failure) => Err(anyhow::anyhow!(failure)),
    }
}

/// Read a URL from stdin.
fn prompt_url() -> Result<String> {
    print!("Enter a URL: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_report(report: &SessionReport, output_dir: &std::path::Path) {
    Output::header("Session");
    Output::kv("Id", report.session_id.as_str());
    if let Some(identifier) = &report.identifier {
        Output::kv("Name", identifier.as_str());
    }
    Output::kv("State", &report.state.to_string());
    Output::kv("Runs", &report.pipeline_attempts.to_string());
    let elapsed = (Utc::now() - report.started_at).num_milliseconds() as f64 / 1000.0;
    Output::kv("Elapsed", &format_duration(elapsed));

    if !report.segments.is_empty() {
        Output::header("Parts");
        for segment in &report.segments {
            Output::segment(segment);
        }
    }

    match &report.failure {
        None => Output::success(&format!(
            "Delivered {} part(s) to {}",
            report.delivery.as_ref().map(|d| d.delivered_count()).unwrap_or(0),
            output_dir.display()
        )),
        Some(failure) => Output::error(failure),
    }
}
