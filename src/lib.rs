//! checksize - Minimal distinguishing prefix lengths for same-size files
//!
//! Deduplication tools hash short file prefixes before whole files. checksize
//! finds, for every group of files sharing an exact byte size, the shortest
//! prefix whose BLAKE3 digest already tells every member apart.
//!
//! # Pipeline
//!
//! 1. [`scanner`] discovers files and records their sizes
//! 2. [`uniqueness::SizeBucketStore`] buckets them by size
//! 3. [`uniqueness::UniquenessResolver`] walks a logarithmic
//!    [schedule](uniqueness::checksum_schedule) of prefix lengths per bucket
//! 4. [`output`] renders the `size -> prefix length` map
//!
//! [`worker`] runs step 3 on a background thread with a cancellation token
//! and a progress channel; [`records`] lets a scan be saved and resolved later.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod records;
pub mod scanner;
pub mod signal;
pub mod uniqueness;
pub mod worker;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, FilterArgs, OutputFormat, ResolveArgs, ScanArgs, ScheduleArgs, StatsArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::output::{CsvOutput, JsonOutput, RunReport, TextOutput};
use crate::progress::Progress;
use crate::records::{RecordSet, RecordSettings};
use crate::scanner::{Blake3Prefix, Discovery, Walker, WalkerConfig};
use crate::signal::CancelToken;
use crate::uniqueness::{checksum_schedule, ResolverConfig, SizeBucketStore, StoreStats};

/// Run the application for parsed CLI arguments.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the scan root or record
/// file cannot be used, the resolver fails fast, or output cannot be written.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    log::debug!("Effective config: {:?}", config);

    match cli.command {
        Commands::Scan(args) => run_scan(args, &config, cli.quiet),
        Commands::Stats(args) => run_stats(args, &config, cli.quiet),
        Commands::Resolve(args) => run_resolve(args, &config, cli.quiet),
        Commands::Schedule(args) => run_schedule(&args),
    }
}

/// Layer CLI filters over the configured ones.
fn walker_config(config: &Config, filters: FilterArgs) -> Result<WalkerConfig> {
    let mut walker = config.walker_config();
    walker.follow_symlinks |= filters.follow_symlinks;
    walker.skip_hidden |= filters.skip_hidden;
    walker.media_only |= filters.media_only;
    walker.ignore_patterns.extend(filters.ignore_patterns);
    if filters.min_size.is_some() {
        walker.min_size = filters.min_size;
    }
    if filters.max_size.is_some() {
        walker.max_size = filters.max_size;
    }
    if let (Some(min), Some(max)) = (walker.min_size, walker.max_size) {
        anyhow::ensure!(min <= max, "--min-size ({min}) is larger than --max-size ({max})");
    }
    Ok(walker)
}

fn cancel_token() -> CancelToken {
    match signal::install_handler() {
        Ok(token) => token,
        Err(e) => {
            log::warn!("{}; Ctrl+C will terminate immediately", e);
            CancelToken::new()
        }
    }
}

fn discover(path: &Path, walker_config: WalkerConfig, token: &CancelToken) -> Result<Discovery> {
    let discovery = Walker::new(path, walker_config)
        .with_cancel_token(token.clone())
        .discover();

    // A bad root yields exactly one error and nothing else.
    if discovery.records.is_empty() && !path.is_dir() {
        if let Some(err) = discovery.errors.into_iter().next() {
            return Err(err).with_context(|| format!("Cannot scan {}", path.display()));
        }
        anyhow::bail!("Cannot scan {}", path.display());
    }
    for err in &discovery.errors {
        log::warn!("{}", err);
    }
    Ok(discovery)
}

fn run_scan(args: ScanArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let token = cancel_token();
    let walker = walker_config(config, args.filters)?;
    let settings = RecordSettings::from(&walker);
    let discovery = discover(&args.path, walker, &token)?;
    if discovery.cancelled {
        eprintln!("[{}] Scan interrupted", ExitCode::Interrupted.code_prefix());
        return Ok(ExitCode::Interrupted);
    }

    let scan_errors = discovery.errors.len();
    let records = discovery.records;
    if let Some(ref path) = args.save_records {
        RecordSet::new(args.path.clone(), settings, records.clone())
            .save(path)
            .with_context(|| format!("Failed to save records to {}", path.display()))?;
    }

    let store: SizeBucketStore = records.into_iter().collect();
    let io_threads = args.io_threads.unwrap_or(config.io_threads);
    resolve_and_report(
        &args.path,
        store,
        scan_errors,
        io_threads,
        token,
        args.output,
        quiet || !config.progress,
        quiet,
    )
}

fn run_resolve(args: ResolveArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let set = RecordSet::load(&args.records)
        .with_context(|| format!("Failed to load records from {}", args.records.display()))?;
    log::info!(
        "Loaded {} records captured {} under {}",
        set.len(),
        set.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        set.root.display()
    );

    let io_threads = args.io_threads.unwrap_or(config.io_threads);
    resolve_and_report(
        &args.records,
        set.to_store(),
        0,
        io_threads,
        cancel_token(),
        args.output,
        quiet || !config.progress,
        quiet,
    )
}

#[allow(clippy::too_many_arguments)]
fn resolve_and_report(
    source: &Path,
    store: SizeBucketStore,
    scan_errors: usize,
    io_threads: usize,
    token: CancelToken,
    format: OutputFormat,
    hide_progress: bool,
    quiet: bool,
) -> Result<ExitCode> {
    anyhow::ensure!(io_threads >= 1, "--io-threads must be at least 1");

    let store = Arc::new(store);
    let handle = worker::spawn_resolution(
        Arc::clone(&store),
        Arc::new(Blake3Prefix::new()),
        ResolverConfig::default()
            .with_io_threads(io_threads)
            .with_cancel_token(token),
    )?;
    handle.drain_into(&Progress::new(hide_progress));
    let resolution = handle.join()?;

    let report = RunReport::new(source, &store, &resolution, scan_errors);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => TextOutput::new(&report, quiet).write_to(&mut out)?,
        OutputFormat::Json => JsonOutput::new(&report).write_to(&mut out, true)?,
        OutputFormat::Csv => CsvOutput::new(&report).write_to(&mut out)?,
    }
    out.flush()?;

    Ok(report.exit_code)
}

fn run_stats(args: StatsArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let token = cancel_token();
    let walker = walker_config(config, args.filters)?;
    let discovery = discover(&args.path, walker, &token)?;
    let scan_errors = discovery.errors.len();

    let store: SizeBucketStore = discovery.records.into_iter().collect();
    let stats = StoreStats::from_store(&store);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => {
            if !quiet {
                output::text::write_store_stats(&mut out, &args.path, &stats, scan_errors)?;
            }
        }
        OutputFormat::Json => {
            output::json::JsonStats::new(&args.path, stats, scan_errors).write_to(&mut out, true)?
        }
        OutputFormat::Csv => output::csv::write_stats(&mut out, &stats)?,
    }
    out.flush()?;

    Ok(ExitCode::for_run(
        discovery.cancelled,
        scan_errors,
        stats.candidate_buckets,
    ))
}

fn run_schedule(args: &ScheduleArgs) -> Result<ExitCode> {
    let schedule = checksum_schedule(args.size);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    output::text::write_schedule(&mut out, args.size, &schedule)?;
    out.flush()?;
    Ok(ExitCode::Success)
}
