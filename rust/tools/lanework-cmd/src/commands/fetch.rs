//! Fetch command implementation
//!
//! Copies every source into the output directory, a bounded number of files
//! at a time. The first failing copy ends the command; copies already in
//! progress on other lanes are left to finish.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Instant,
};

use anyhow::{Context, Result};
use lanework::{Error, ExecutorConfig, LaneExecutor};
use lanework_common::error::Error as CommonError;

use crate::{commands::source_to_path, utils::format_size};

/// Executor settings given on the command line; each one overrides the
/// config file.
#[derive(Debug, Default)]
pub struct FetchArgs {
    pub lanes: Option<usize>,
    pub config: Option<String>,
    pub deadline_ms: Option<u64>,
}

/// A single copy: `source` into `target`.
#[derive(Debug, Clone)]
struct FetchItem {
    source: PathBuf,
    target: PathBuf,
}

#[derive(Debug, Default)]
struct FetchStats {
    files: AtomicUsize,
    bytes: AtomicU64,
}

pub fn run(args: FetchArgs, sources: Vec<String>, out_dir: String) -> Result<()> {
    let config = resolve_config(&args)?;
    let out_dir = PathBuf::from(out_dir);
    let items = plan_items(&sources, &out_dir)?;
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let started = Instant::now();
    let stats = fetch(config, items)?;
    println!(
        "Fetched {} files ({}) into {} in {:.2?}",
        stats.files.load(Ordering::Relaxed),
        format_size(stats.bytes.load(Ordering::Relaxed)),
        out_dir.display(),
        started.elapsed()
    );
    Ok(())
}

fn resolve_config(args: &FetchArgs) -> Result<ExecutorConfig> {
    let mut config = match &args.config {
        Some(path) => ExecutorConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {path}"))?,
        None => ExecutorConfig::default().with_thread_name_prefix("fetch"),
    };
    if let Some(lanes) = args.lanes {
        config.lane_count = lanes;
    }
    if args.deadline_ms.is_some() {
        config.deadline_ms = args.deadline_ms;
    }
    config.validate()?;
    Ok(config)
}

fn plan_items(sources: &[String], out_dir: &Path) -> Result<Vec<FetchItem>> {
    let mut names = HashSet::new();
    sources
        .iter()
        .map(|source| {
            let source = source_to_path(source)?;
            let name = source
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Source has no file name: {}", source.display()))?
                .to_owned();
            if !names.insert(name.clone()) {
                anyhow::bail!("Duplicate target name: {}", Path::new(&name).display());
            }
            Ok(FetchItem {
                target: out_dir.join(&name),
                source,
            })
        })
        .collect()
}

fn fetch(config: ExecutorConfig, items: Vec<FetchItem>) -> Result<Arc<FetchStats>> {
    let executor = LaneExecutor::new(config)?;
    let stats = Arc::new(FetchStats::default());
    let counters = stats.clone();
    log::info!(
        "fetching {} files on {} lanes",
        items.len(),
        executor.lane_count()
    );
    executor
        .execute(items, move |item| copy_item(&item, &counters))
        .context("Fetch failed")?;
    Ok(stats)
}

fn copy_item(item: &FetchItem, stats: &FetchStats) -> Result<(), Error<CommonError>> {
    log::debug!("{} -> {}", item.source.display(), item.target.display());
    let bytes = std::fs::copy(&item.source, &item.target)
        .map_err(|e| CommonError::io(item.source.display().to_string(), e))?;
    stats.files.fetch_add(1, Ordering::Relaxed);
    stats.bytes.fetch_add(bytes, Ordering::Relaxed);
    Ok(())
}
