//! Subcommand implementations behind [`crate::run_app`].

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use bytesize::ByteSize;
use serde::Serialize;
use yansi::Paint;

use crate::cache::{AssetCache, AssetId, CacheStats};
use crate::cli::{CheckArgs, ManifestArgs, OutputFormat, PreloadArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::gate::LoadingGate;
use crate::loader::FsImageLoader;
use crate::manifest::{inject_preload_links, preload_links, AssetSource, DirectorySource};
use crate::preload::{PreloadCoordinator, PreloadState};
use crate::progress::PreloadProgress;
use crate::resolve::{peek, resolve, ImageView};

/// Result of a preload run, as printed by the `preload` subcommand.
#[derive(Debug, Serialize)]
pub struct PreloadReport {
    /// Asset directory that was preloaded.
    pub root: String,
    /// Final snapshot of the run.
    pub state: PreloadState,
    /// Wall-clock duration of the run.
    pub elapsed_ms: u128,
    /// Cache contents after the run.
    pub cache: CacheStats,
}

/// Outcome of resolving one identifier in the `check` subcommand.
#[derive(Debug, Serialize)]
pub struct CheckEntry {
    pub id: AssetId,
    /// `ready`, `fallback` or `placeholder`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<AssetId>,
    /// Whether the first, synchronous lookup already hit the cache.
    pub cached: bool,
}

/// Preload every image under `args.path` and report the outcome.
pub async fn preload(
    args: &PreloadArgs,
    config: &Config,
    quiet: bool,
    plain: bool,
) -> Result<ExitCode> {
    if !args.path.is_dir() {
        bail!("Asset directory not found: {}", args.path.display());
    }

    let source = Arc::new(DirectorySource::new(&args.path, config.discovery()));
    let loader = Arc::new(
        FsImageLoader::new(&args.path).with_url_prefix(config.url_prefix.clone()),
    );
    let cache = Arc::new(AssetCache::new(loader));
    let coordinator = PreloadCoordinator::new(Arc::clone(&cache), source, config.preload());

    let hidden = quiet || args.no_progress || args.output == OutputFormat::Json;
    let progress = PreloadProgress::new(hidden, plain);
    let subscription = coordinator.subscribe(progress.listener());

    let started = Instant::now();
    let gate = LoadingGate::attach(&coordinator);
    let state = gate.wait_ready().await;
    subscription.unsubscribe();

    let report = PreloadReport {
        root: args.path.display().to_string(),
        state,
        elapsed_ms: started.elapsed().as_millis(),
        cache: cache.stats(),
    };

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text if !quiet => print_preload_report(&report),
        OutputFormat::Text => {}
    }

    Ok(ExitCode::for_state(&state))
}

fn print_preload_report(report: &PreloadReport) {
    let state = &report.state;
    let failed = if state.failed > 0 {
        state.failed.red().bold().to_string()
    } else {
        state.failed.to_string()
    };

    println!(
        "{} {} of {} images loaded, {} failed in {} ms",
        "Preload complete:".green().bold(),
        state.loaded,
        state.total,
        failed,
        report.elapsed_ms
    );
    println!(
        "Cache: {} static, {} dynamic entries ({} decoded)",
        report.cache.static_entries,
        report.cache.dynamic_entries,
        ByteSize(report.cache.decoded_bytes)
    );
}

/// Print or inject preload hints for every image under `args.path`.
pub fn manifest(args: &ManifestArgs, config: &Config) -> Result<ExitCode> {
    let source = DirectorySource::new(&args.path, config.discovery());
    let ids = source
        .discover()
        .with_context(|| format!("Failed to scan {}", args.path.display()))?;
    let links = preload_links(&ids);

    match &args.inject {
        Some(html_path) => {
            let html = fs::read_to_string(html_path)
                .with_context(|| format!("Failed to read {}", html_path.display()))?;
            let injected = inject_preload_links(&html, &links);
            if injected != html {
                fs::write(html_path, injected)
                    .with_context(|| format!("Failed to write {}", html_path.display()))?;
                log::info!(
                    "{} preload links injected into {}",
                    links.len(),
                    html_path.display()
                );
            }
        }
        None => {
            for link in &links {
                println!("{link}");
            }
        }
    }

    Ok(if ids.is_empty() {
        ExitCode::NoAssets
    } else {
        ExitCode::Success
    })
}

/// Resolve each requested identifier the way an image element would.
pub async fn check(args: &CheckArgs, config: &Config) -> Result<ExitCode> {
    let prefix = args
        .url_prefix
        .clone()
        .unwrap_or_else(|| config.url_prefix.clone());
    let loader = Arc::new(FsImageLoader::new(&args.root).with_url_prefix(prefix));
    let cache = AssetCache::new(loader);
    let fallback = args.fallback.as_deref().map(AssetId::from);

    let mut entries = Vec::with_capacity(args.ids.len());
    for raw in &args.ids {
        let id = AssetId::from(raw.as_str());
        let cached = peek(&cache, &id).is_ready();
        let view = resolve(&cache, &id, fallback.as_ref()).await;
        entries.push(check_entry(id, cached, view));
    }

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            for entry in &entries {
                print_check_entry(entry);
            }
        }
    }

    let all_ready = entries.iter().all(|e| e.status == "ready");
    Ok(if entries.is_empty() {
        ExitCode::NoAssets
    } else if all_ready {
        ExitCode::Success
    } else {
        ExitCode::PartialSuccess
    })
}

fn check_entry(id: AssetId, cached: bool, view: ImageView) -> CheckEntry {
    let mut entry = CheckEntry {
        id,
        status: "placeholder",
        width: None,
        height: None,
        fallback: None,
        cached,
    };
    match view {
        ImageView::Ready(handle) => {
            entry.status = "ready";
            entry.width = Some(handle.width());
            entry.height = Some(handle.height());
        }
        ImageView::Fallback(fallback) => {
            entry.status = "fallback";
            entry.fallback = Some(fallback);
        }
        ImageView::Loading | ImageView::Placeholder => {}
    }
    entry
}

fn print_check_entry(entry: &CheckEntry) {
    match (entry.status, entry.width, entry.height, &entry.fallback) {
        ("ready", Some(w), Some(h), _) => {
            println!("{} {} ({}x{})", "ready".green(), entry.id, w, h);
        }
        (_, _, _, Some(fallback)) => {
            println!("{} {} -> {}", "fallback".yellow(), entry.id, fallback);
        }
        _ => println!("{} {}", "placeholder".red(), entry.id),
    }
}
