use backscroll_common::observability::LogFormat;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "backscroll")]
#[command(about = "Fetch time-bounded history from paginated feeds")]
#[command(version)]
pub struct Cli {
    /// YAML config; a missing file falls back to defaults plus env overrides
    #[arg(long, global = true, default_value = "backscroll.yaml", env = "BACKSCROLL_CONFIG")]
    pub config: PathBuf,

    /// Cancel every in-flight scrape after this many seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Log encoding: text or json
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Debug-level logs, mirrored to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Everything one entity posted between --start and --end (inclusive)
    Window {
        #[arg(long)]
        source: String,
        #[arg(long)]
        entity: String,
        /// YYYY-MM-DD (midnight UTC) or RFC 3339
        #[arg(long, value_parser = parse_instant)]
        start: DateTime<Utc>,
        #[arg(long, value_parser = parse_instant)]
        end: DateTime<Utc>,
    },

    /// Everything newer than a checkpoint, for many entities at once
    Since {
        #[arg(long)]
        source: String,
        /// Repeatable; defaults to the source's configured entities
        #[arg(long = "entity")]
        entities: Vec<String>,
        #[arg(long, value_parser = parse_instant, conflicts_with = "lookback_days")]
        since: Option<DateTime<Utc>>,
        /// Used when --since is absent; defaults to engine.lookback_days
        #[arg(long)]
        lookback_days: Option<i64>,
    },

    /// Parse the source tag and coin list out of one post
    Extract {
        #[arg(long)]
        timestamp: String,
        #[arg(long)]
        text: String,
        #[arg(long, default_value = backscroll_social::extract::DEFAULT_SOURCE_TAG)]
        tag: String,
    },
}

pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .ok_or_else(|| format!("expected YYYY-MM-DD or RFC 3339, got {raw:?}"))
}
