//! Command-line argument parsing for the geosphere demo.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Geosphere demo command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "geosphere", about = "Headless level-of-detail planet flight")]
pub struct CliArgs {
    /// Detail level 0-4.
    #[arg(long)]
    pub detail: Option<u8>,

    /// Body radius in meters.
    #[arg(long)]
    pub radius: Option<f64>,

    /// Number of flight ticks.
    #[arg(long)]
    pub ticks: Option<u32>,

    /// Worker thread count (0 = automatic).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(detail) = args.detail {
            self.geosphere.detail = detail;
        }
        if let Some(radius) = args.radius {
            self.body.radius_m = radius;
        }
        if let Some(ticks) = args.ticks {
            self.flight.ticks = ticks;
        }
        if let Some(threads) = args.threads {
            self.jobs.worker_threads = threads;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
