use crate::core::window::{parse_naive_instant, trailing_window};
use crate::domain::model::TimeWindow;
use crate::utils::error::{BotError, Result};
use chrono::{NaiveDateTime, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "regear-bot")]
#[command(about = "Records guild equipment losses into a shared workbook")]
pub struct Cli {
    /// Path to a TOML settings file
    #[arg(short, long, env = "REGEAR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bot: HTTP server, keep-alive and forum thread watcher (default)
    Serve,
    /// Record losses for one time window right now
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Worksheet label; sheets `<label>_Raw` and `<label>_Statistics` are written
    #[arg(long)]
    pub label: String,

    /// Window start (ISO-8601, timezone is ignored)
    #[arg(long)]
    pub start: Option<String>,

    /// Window end (ISO-8601, timezone is ignored); defaults to now (UTC)
    #[arg(long)]
    pub end: Option<String>,

    /// Window length when --start is omitted; defaults to the configured window
    #[arg(long)]
    pub hours: Option<i64>,

    /// Workbook directory
    #[arg(long, env = "REGEAR_WORKBOOK_DIR")]
    pub workbook: String,
}

fn parse_bound(field: &str, value: &str) -> Result<NaiveDateTime> {
    parse_naive_instant(value).ok_or_else(|| BotError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: "expected an ISO-8601 date and time".to_string(),
    })
}

impl RunArgs {
    pub fn window(&self, default_hours: i64) -> Result<TimeWindow> {
        self.window_at(Utc::now().naive_utc(), default_hours)
    }

    pub fn window_at(&self, now: NaiveDateTime, default_hours: i64) -> Result<TimeWindow> {
        let end = match &self.end {
            Some(end) => parse_bound("--end", end)?,
            None => now,
        };
        let window = match &self.start {
            Some(start) => TimeWindow::new(parse_bound("--start", start)?, end),
            None => {
                let hours = self.hours.unwrap_or(default_hours);
                if hours <= 0 {
                    return Err(BotError::InvalidConfigValueError {
                        field: "--hours".to_string(),
                        value: hours.to_string(),
                        reason: "must be positive".to_string(),
                    });
                }
                trailing_window(end, hours).ok_or_else(|| BotError::InvalidConfigValueError {
                    field: "--hours".to_string(),
                    value: hours.to_string(),
                    reason: "window reaches outside the supported date range".to_string(),
                })?
            }
        };

        if window.start > window.end {
            return Err(BotError::InvalidConfigValueError {
                field: "--start".to_string(),
                value: window.start.to_string(),
                reason: "window start is after its end".to_string(),
            });
        }
        if window.end - window.start > TimeDelta::days(31) {
            tracing::warn!("⚠️ Window spans more than a month; the API only keeps recent deaths");
        }
        Ok(window)
    }
}
