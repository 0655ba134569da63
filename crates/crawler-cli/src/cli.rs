//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Fetch the boostable bosses list from tibia.com.
///
/// # Examples
///
/// ```bash
/// # Full list as JSON
/// tibia-crawler bosses --pretty
///
/// # Just today's boosted boss
/// tibia-crawler boosted --format text
///
/// # Against a local mirror
/// tibia-crawler --base-url http://localhost:8080/ bosses
/// ```
#[derive(Parser, Clone, Debug)]
#[command(name = "tibia-crawler")]
#[command(version)]
#[command(about = "tibia-crawler - tibia.com boostable bosses scraper", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress warnings (only show errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file (overrides the default location)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the origin. Also via `TIBIA_CRAWLER_BASE_URL`.
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Print every boostable boss and today's boosted boss
    Bosses(FetchArgs),

    /// Print only today's boosted boss
    Boosted(FetchArgs),
}

impl Commands {
    pub const fn args(&self) -> &FetchArgs {
        match self {
            Self::Bosses(args) | Self::Boosted(args) => args,
        }
    }
}

/// Options shared by every fetching command.
#[derive(Args, Clone, Debug)]
pub struct FetchArgs {
    /// Attempts per request (overrides the configured value)
    #[arg(long, value_name = "N")]
    pub retries: Option<u8>,

    /// Do not pace requests
    #[arg(long)]
    pub no_rate_limit: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// The public JSON shape
    Json,
    /// One line per boss
    Text,
}
