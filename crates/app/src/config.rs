//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use event_store::DEFAULT_DISPATCH_CAPACITY;

/// Default location of the event log.
pub const DEFAULT_LOG_PATH: &str = "data/event_log.jsonl";

/// How reads relate to the commands that preceded them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Consistency {
    /// Each command waits for the projection to apply its events, so reads
    /// observe the caller's own writes.
    #[default]
    Strong,

    /// The projection is updated in the background only.
    Eventual,
}

impl FromStr for Consistency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strong" => Ok(Consistency::Strong),
            "eventual" => Ok(Consistency::Eventual),
            other => Err(format!("unknown consistency mode: {other}")),
        }
    }
}

/// Application configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `ORDERS_LOG_PATH`: event log file (default: `"data/event_log.jsonl"`)
/// - `ORDERS_DISPATCH_CAPACITY`: subscriber queue size (default: `1024`)
/// - `ORDERS_CONSISTENCY`: `strong` or `eventual` (default: `strong`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub log_path: PathBuf,
    pub dispatch_capacity: usize,
    pub consistency: Consistency,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            log_path: std::env::var("ORDERS_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_PATH)),
            dispatch_capacity: std::env::var("ORDERS_DISPATCH_CAPACITY")
                .ok()
                .and_then(|c| c.parse().ok())
                .filter(|&c: &usize| c > 0)
                .unwrap_or(DEFAULT_DISPATCH_CAPACITY),
            consistency: std::env::var("ORDERS_CONSISTENCY")
                .ok()
                .and_then(|c| c.parse().ok())
                .unwrap_or_default(),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Overrides the event log location.
    pub fn with_log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = log_path.into();
        self
    }

    /// Overrides the consistency mode.
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            dispatch_capacity: DEFAULT_DISPATCH_CAPACITY,
            consistency: Consistency::Strong,
            log_level: "info".to_string(),
        }
    }
}
