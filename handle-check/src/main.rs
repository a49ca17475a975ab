//! Handle Check CLI Application
//!
//! A command-line interface for finding which websites have an account for a
//! username. This CLI application provides a user-friendly interface to the
//! handle-check-lib library.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use futures::StreamExt;
use handle_check_lib::{
    load_env_config, parse_mode, parse_timeout_string, validate_username, Catalog,
    ConfigManager, EnvConfig, FileConfig, FoundProfile, ProgressStride, ResultAggregator,
    ScanConfig, ScanMode, ScanReport, Scanner, DEFAULT_FAST_LIMIT, MAX_CONCURRENCY,
};
use std::borrow::Cow;
use std::path::Path;
use std::process;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Catalog used when none is configured and this file exists.
const FALLBACK_CATALOG: &str = "data.json";

/// Exit status for a scan stopped with Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

/// CLI arguments for handle-check
#[derive(Parser, Debug)]
#[command(name = "handle-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Find which websites have an account for a username")]
#[command(
    long_about = "Find which websites have an account for a username.\n\nProbes every site in a Sherlock-style catalog concurrently, classifies each response by the site's own rule, and lists the profiles that exist."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Username to look for
    #[arg(value_name = "USERNAME")]
    pub username: Option<String>,

    /// Site catalog (JSON, Sherlock data.json format)
    #[arg(long = "catalog", value_name = "FILE", help_heading = "Site Selection")]
    pub catalog: Option<String>,

    /// Check only the first sites of the catalog (fast) or all of them (full)
    #[arg(
        long = "mode",
        value_name = "MODE",
        value_parser = ["fast", "full"],
        help_heading = "Site Selection"
    )]
    pub mode: Option<String>,

    /// Number of sites checked in fast mode (default: 50)
    #[arg(long = "fast-limit", value_name = "N", help_heading = "Site Selection")]
    pub fast_limit: Option<usize>,

    /// List the sites and URLs that would be checked, without sending requests
    #[arg(long = "dry-run", help_heading = "Site Selection")]
    pub dry_run: bool,

    /// Output found profiles as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Output found profiles as CSV
    #[arg(long = "csv", help_heading = "Output Format")]
    pub csv: bool,

    /// Enable structured output with a header and summary
    #[arg(short = 'p', long = "pretty", help_heading = "Output Format")]
    pub pretty: bool,

    /// Sort found profiles by site name instead of completion order
    #[arg(long = "sort", help_heading = "Output Format")]
    pub sort: bool,

    /// Max probes in flight (default: 20, max: 100)
    #[arg(short = 'c', long = "concurrency", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// Per-request timeout, e.g. "5s", "750ms" (default: 5s)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Report progress every N completed sites
    #[arg(long = "progress-every", value_name = "N", help_heading = "Progress")]
    pub progress_every: Option<usize>,

    /// Report progress every 1/N of the scan (default: 20, i.e. every 5%)
    #[arg(long = "progress-fraction", value_name = "N", help_heading = "Progress")]
    pub progress_fraction: Option<usize>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logs, including every probe
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// How found profiles are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Everything resolved from config files, environment and arguments.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) scan: ScanConfig,
    pub(crate) mode: ScanMode,
    pub(crate) catalog: Option<String>,
    pub(crate) format: OutputFormat,
    pub(crate) sort: bool,
    pub(crate) pretty: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(&args);
    info!("handle-check v{} starting", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(Some(report)) if report.cancelled => process::exit(EXIT_INTERRUPTED),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` overrides the flags.
fn init_logging(args: &Args) {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,handle_check_lib={0},handle_check={0}",
            level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn validate_args(args: &Args) -> Result<(), String> {
    let username = args
        .username
        .as_deref()
        .ok_or_else(|| "You must specify a username to look for".to_string())?;

    validate_username(username).map_err(|e| e.to_string())?;

    // Can't have multiple output formats
    if args.json && args.csv {
        return Err("Cannot specify multiple output formats (--json, --csv)".to_string());
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err("Concurrency must be between 1 and 100".to_string());
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m', at most 60m",
                timeout
            ));
        }
    }

    if args.fast_limit == Some(0) {
        return Err("--fast-limit must be at least 1".to_string());
    }

    if args.progress_every.is_some() && args.progress_fraction.is_some() {
        return Err("Cannot specify both --progress-every and --progress-fraction".to_string());
    }

    if args.progress_every == Some(0) || args.progress_fraction == Some(0) {
        return Err("Progress settings must be at least 1".to_string());
    }

    Ok(())
}

/// Run one scan. Returns `None` for a dry run.
async fn run(args: Args) -> Result<Option<ScanReport>, Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let file_config = load_file_config(&args, &env_config)?;
    let settings = build_settings(&args, file_config, &env_config)?;

    let catalog_path = resolve_catalog_path(&settings)?;
    let catalog = Catalog::load_file(&catalog_path)?;
    info!(
        path = %catalog_path,
        sites = catalog.len(),
        skipped = catalog.skipped().len(),
        "loaded site catalog"
    );

    let username = args.username.as_deref().unwrap_or_default().trim();
    let sites = settings.mode.select(catalog.sites());

    if args.dry_run {
        ui::print_dry_run(username, sites, settings.mode);
        return Ok(None);
    }

    let scanner = Scanner::with_config(settings.scan.clone())?;
    let session = scanner.session(username, sites.to_vec())?;

    // Ctrl-C stops admission; whatever completed is still reported.
    let token = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping scan");
            token.cancel();
        }
    });

    let text = settings.format == OutputFormat::Text;
    if text && settings.pretty {
        ui::print_header(username, sites.len(), settings.mode, settings.scan.concurrency);
    }

    let (mut stream, receiver) = scanner.scan_with_progress(&session);
    let progress = if text {
        ui::ProgressLine::start(receiver)
    } else {
        None
    };

    // Found profiles are shown as they arrive unless a sorted listing was asked for.
    let stream_found = text && !settings.sort;
    let start = Instant::now();
    let mut aggregator = ResultAggregator::new();

    while let Some(outcome) = stream.next().await {
        aggregator.push(&outcome);
        if stream_found {
            if let Some(profile) = outcome.to_profile() {
                ui::print_found(&profile, settings.pretty);
            }
        }
    }
    drop(stream);

    if let Some(line) = progress {
        line.finish().await;
    }

    let mut report = aggregator.into_report(username, session.len(), start.elapsed());
    if settings.sort {
        report.sort_by_site();
    }

    display_report(&report, &settings, !stream_found)?;
    Ok(Some(report))
}

/// Load the config file: `--config`, then `HC_CONFIG`, then discovery.
fn load_file_config(
    args: &Args,
    env_config: &EnvConfig,
) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new();

    let explicit = args
        .config
        .as_ref()
        .map(|path| (path, "CLI --config"))
        .or_else(|| env_config.config.as_ref().map(|path| (path, "HC_CONFIG")));

    if let Some((path, source)) = explicit {
        info!("using explicit config file ({}): {}", source, path);
        let file_config = config_manager
            .load_file(path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?;
        return Ok(file_config);
    }

    debug!("discovering config files");
    Ok(config_manager.discover_and_load()?)
}

/// Build run settings.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments (explicit user input)
/// 2. Environment variables (HC_*)
/// 3. Config files (local, then global, then XDG)
/// 4. Built-in defaults
fn build_settings(
    args: &Args,
    file_config: FileConfig,
    env_config: &EnvConfig,
) -> Result<Settings, String> {
    let defaults = file_config.defaults.unwrap_or_default();
    let output = file_config.output.unwrap_or_default();
    let mut scan = ScanConfig::default();

    if let Some(concurrency) = args
        .concurrency
        .or(env_config.concurrency)
        .or(defaults.concurrency)
    {
        scan = scan.with_concurrency(concurrency);
    }

    let timeout = args
        .timeout
        .as_deref()
        .or(env_config.timeout.as_deref())
        .or(defaults.timeout.as_deref());
    if let Some(timeout_str) = timeout {
        let timeout = parse_timeout_string(timeout_str)
            .ok_or_else(|| format!("Invalid timeout '{}'", timeout_str))?;
        scan = scan.with_timeout(timeout);
    }

    if let Some(user_agent) = defaults.user_agent {
        scan = scan.with_user_agent(user_agent);
    }

    // A cadence given at a higher level replaces both settings below it.
    let stride = if let Some(n) = args.progress_every {
        Some(ProgressStride::Every(n))
    } else if let Some(n) = args.progress_fraction {
        Some(ProgressStride::Fraction(n))
    } else if let Some(n) = env_config.progress_every {
        Some(ProgressStride::Every(n))
    } else if let Some(n) = defaults.progress_every {
        Some(ProgressStride::Every(n))
    } else {
        defaults.progress_fraction.map(ProgressStride::Fraction)
    };
    if let Some(stride) = stride {
        scan = scan.with_progress(stride);
    }

    let fast_limit = args
        .fast_limit
        .or(env_config.fast_limit)
        .or(defaults.fast_limit)
        .unwrap_or(DEFAULT_FAST_LIMIT);
    let mode = match args
        .mode
        .as_deref()
        .or(env_config.mode.as_deref())
        .or(defaults.mode.as_deref())
    {
        Some(name) => parse_mode(name, fast_limit).ok_or_else(|| format!("Invalid mode '{}'", name))?,
        None => ScanMode::Fast { limit: fast_limit },
    };

    let catalog = args
        .catalog
        .clone()
        .or_else(|| env_config.catalog.clone())
        .or(defaults.catalog);

    if env_config.has_output_format_conflict() {
        warn!("both HC_JSON and HC_CSV are set, CLI args will resolve conflict");
    }
    let format = if args.json {
        OutputFormat::Json
    } else if args.csv {
        OutputFormat::Csv
    } else if env_config.json == Some(true) && env_config.csv != Some(true) {
        OutputFormat::Json
    } else if env_config.csv == Some(true) && env_config.json != Some(true) {
        OutputFormat::Csv
    } else {
        match output.format.as_deref() {
            Some("json") => OutputFormat::Json,
            Some("csv") => OutputFormat::Csv,
            _ => OutputFormat::Text,
        }
    };

    // Boolean flags only override when passed; their default is "not set".
    let sort = args.sort || output.sort.unwrap_or(false);
    let pretty = args.pretty || env_config.pretty.or(output.pretty).unwrap_or(false);

    Ok(Settings {
        scan,
        mode,
        catalog,
        format,
        sort,
        pretty,
    })
}

/// Pick the catalog file, falling back to `./data.json`.
fn resolve_catalog_path(settings: &Settings) -> Result<String, String> {
    if let Some(path) = &settings.catalog {
        return Ok(path.clone());
    }

    if Path::new(FALLBACK_CATALOG).exists() {
        return Ok(FALLBACK_CATALOG.to_string());
    }

    Err(format!(
        "No site catalog given. Use --catalog FILE, set HC_CATALOG, or place {} in the current directory",
        FALLBACK_CATALOG
    ))
}

fn display_report(
    report: &ScanReport,
    settings: &Settings,
    list_found: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match settings.format {
        OutputFormat::Json => display_json_results(&report.found)?,
        OutputFormat::Csv => display_csv_results(&report.found),
        OutputFormat::Text => display_text_results(report, settings, list_found),
    }

    Ok(())
}

/// Display found profiles in JSON format
fn display_json_results(found: &[FoundProfile]) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(found)?;
    println!("{}", json);
    Ok(())
}

/// Display found profiles in CSV format
fn display_csv_results(found: &[FoundProfile]) {
    println!("site,url,elapsed_ms");

    for profile in found {
        println!(
            "{},{},{}",
            csv_field(&profile.site),
            csv_field(&profile.url),
            profile.elapsed_millis
        );
    }
}

/// Quote a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Display results in human-readable text format
fn display_text_results(report: &ScanReport, settings: &Settings, list_found: bool) {
    if list_found {
        for profile in &report.found {
            ui::print_found(profile, settings.pretty);
        }
    }

    if report.cancelled {
        ui::print_interrupted(report.completed, report.total);
    }

    if report.found.is_empty() {
        ui::print_no_accounts(&report.username);
    }

    if settings.pretty {
        println!();
        ui::print_summary(report);
    }
}
