//! asset-preload - image asset cache and startup preloader
//!
//! A site that gates its content behind a loading screen needs two things:
//! a cache that lets image elements paint instantly when their asset is
//! already decoded, and a one-time preload of every build-known image with
//! bounded concurrency and a progress feed to decide when the loading screen
//! can go away.
//!
//! # Layout
//!
//! - [`cache`]: the [`AssetCache`](cache::AssetCache) with static and dynamic partitions
//! - [`loader`]: the fetch/decode seam and the filesystem loader
//! - [`manifest`]: asset discovery and `<link rel="preload">` manifests
//! - [`pool`]: the fixed-width worker pool
//! - [`preload`]: the [`PreloadCoordinator`](preload::PreloadCoordinator) state machine
//! - [`gate`]: loading-screen gate over the progress feed
//! - [`resolve`]: render-time image resolution with fallbacks

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gate;
pub mod loader;
pub mod logging;
pub mod manifest;
pub mod pool;
pub mod preload;
pub mod progress;
pub mod resolve;

use anyhow::{Context, Result};

use cli::{Cli, Commands};
use config::Config;
use error::ExitCode;

/// Run the CLI application and return the process exit code.
///
/// # Errors
///
/// Returns an error if configuration, I/O, or the async runtime fails.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref());
    log::debug!("Effective config: {:?}", config);

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::Success)
        }
        Commands::Manifest(args) => {
            let config = config.with_overrides(&args.discovery);
            commands::manifest(&args, &config)
        }
        Commands::Preload(args) => {
            let config = config.with_overrides(&args.discovery);
            runtime()?.block_on(commands::preload(&args, &config, cli.quiet, cli.no_color))
        }
        Commands::Check(args) => runtime()?.block_on(commands::check(&args, &config)),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}
