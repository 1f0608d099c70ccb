//! Command-line interface definitions for asset-preload.
//!
//! Global options (verbosity, color, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Preload every image under a site's asset directory
//! asset-preload preload site/src/assets/images
//!
//! # Same, as a JSON report with at most 4 concurrent loads
//! asset-preload preload site/src/assets/images --concurrency 4 --output json
//!
//! # Inject <link rel="preload"> hints into a built page
//! asset-preload manifest site/src/assets/images --inject dist/index.html
//!
//! # Resolve single images, falling back to a placeholder asset
//! asset-preload check /assets/images/team.webp --root site/src/assets/images \
//!     --fallback /assets/images/placeholder.png
//! ```

use bytesize::ByteSize;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Image asset cache and bounded-concurrency preloader.
#[derive(Debug, Parser)]
#[command(name = "asset-preload")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load every image under a directory into the cache, showing progress
    Preload(PreloadArgs),
    /// Print or inject <link rel="preload"> hints for every image
    Manifest(ManifestArgs),
    /// Resolve individual images the way an image element would
    Check(CheckArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Discovery flags shared by subcommands that walk an asset directory.
#[derive(Debug, Default, Args)]
pub struct DiscoveryArgs {
    /// Maximum number of images loaded at once (default: 16)
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Image extensions to include (replaces the configured list)
    #[arg(short, long = "extension", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Glob patterns to ignore (can be specified multiple times)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Follow symbolic links during discovery
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip images larger than this (e.g., 500KB, 2MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// URL prefix the asset directory is served under
    #[arg(long, value_name = "PREFIX")]
    pub url_prefix: Option<String>,
}

/// Arguments for the preload subcommand.
#[derive(Debug, Args)]
pub struct PreloadArgs {
    /// Asset directory to preload
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the manifest subcommand.
#[derive(Debug, Args)]
pub struct ManifestArgs {
    /// Asset directory to scan
    #[arg(value_name = "DIR")]
    pub path: PathBuf,

    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    /// Rewrite this HTML file in place instead of printing the links
    #[arg(long, value_name = "HTML")]
    pub inject: Option<PathBuf>,
}

/// Arguments for the check subcommand.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Asset identifiers to resolve
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,

    /// Directory identifiers are resolved against
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// URL prefix that maps onto the root directory
    #[arg(long, value_name = "PREFIX")]
    pub url_prefix: Option<String>,

    /// Asset to display when an image fails to load
    #[arg(long, value_name = "ID")]
    pub fallback: Option<String>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size such as `500KB` or `2MiB` into bytes.
///
/// Numbers without a unit are bytes.
///
/// # Examples
///
/// ```
/// use asset_preload::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("500KB").unwrap(), 500_000);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty or not a valid size.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    s.parse::<ByteSize>()
        .map(|size| size.as_u64())
        .map_err(|e| format!("Invalid size '{s}': {e}"))
}
