//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

use crate::config::ClientConfig;

/// courtwatch - Get told when a court frees up
#[derive(Debug, Parser)]
#[command(name = "courtwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "COURTWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log output format (pretty, compact, json)
    #[arg(long, env = "COURTWATCH_LOG_FORMAT")]
    pub log_format: Option<String>,

    /// Detect changes without delivering anything
    #[arg(long, visible_alias = "no-discord", alias = "no_discord")]
    pub dry_run: bool,

    /// Seconds between polls
    #[arg(long)]
    pub interval: Option<u64>,

    /// Days ahead to watch
    #[arg(long)]
    pub window_days: Option<u32>,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration.
    pub fn apply(&self, config: &mut ClientConfig) {
        if self.dry_run {
            config.notifications.dry_run = true;
        }
        if let Some(interval) = self.interval {
            config.monitor.interval_secs = interval;
        }
        if let Some(days) = self.window_days {
            config.monitor.window_days = days;
        }
    }
}
