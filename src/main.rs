// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_arguments)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info};

use crate::app_config::{Backend, Config};
use crate::app_controller::Controller;
use crate::broker::{JobQueue, Worker};
use crate::interpreters::create_interpreter;

mod app_config;
mod app_controller;
mod broker;
mod engine;
mod errors;
mod interpreters;
mod language_utils;
mod pair_resolver;
mod store;

/// CLI wrapper for Backend to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliBackend {
    Argos,
    Apertium,
    Mock,
}

impl From<CliBackend> for Backend {
    fn from(cli_backend: CliBackend) -> Self {
        match cli_backend {
            CliBackend::Argos => Backend::Argos,
            CliBackend::Apertium => Backend::Apertium,
            CliBackend::Mock => Backend::Mock,
        }
    }
}

/// CLI wrapper for log levels to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate matching documents in the index (default command)
    #[command(alias = "translate")]
    Translate(TranslateArgs),

    /// Consume queued translation jobs until terminated
    Worker(WorkerArgs),

    /// List the language pairs the selected backend supports
    Pairs(PairsArgs),

    /// Show queued, leased and deliverable job counts for the broker
    Status(StatusArgs),

    /// Generate shell completions for estrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Document store URL
    #[arg(short, long, env = "ESTRANS_URL", default_value = "http://localhost:9200")]
    url: String,

    /// Index to search and update
    #[arg(short, long, default_value = "local-datashare")]
    index: String,

    /// Translation backend to use
    #[arg(short, long, value_enum, default_value_t = CliBackend::Argos)]
    backend: CliBackend,

    /// Endpoint for HTTP-served backends
    #[arg(long, default_value = "http://localhost:5000")]
    backend_endpoint: String,

    /// Source language code (e.g. 'fr', 'por')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g. 'en', 'spa')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Intermediary language for two-hop routes (searched automatically
    /// when omitted)
    #[arg(long)]
    intermediary_language: Option<String>,

    /// Document field to translate
    #[arg(long, default_value = "content")]
    source_field: String,

    /// Document field where translations are stored
    #[arg(long, default_value = "content_translated")]
    target_field: String,

    /// Query string to filter candidate documents
    #[arg(short, long)]
    query_string: Option<String>,

    /// Directory where language packs are downloaded
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Scan cursor lease (e.g. '5m', '90s')
    #[arg(long, default_value = "5m")]
    scan_scroll: String,

    /// Documents per scan page
    #[arg(long, default_value_t = 10)]
    scan_page_size: usize,

    /// Compute translations without writing anything to the store
    #[arg(long)]
    dry_run: bool,

    /// Replace existing translations for the same backend and pair
    #[arg(short, long)]
    force: bool,

    /// Number of parallel translation jobs
    #[arg(long, default_value_t = 1)]
    pool_size: usize,

    /// Per-document timeout in seconds
    #[arg(long, default_value_t = 1800)]
    pool_timeout: u64,

    /// Delay in milliseconds after each job
    #[arg(long, default_value_t = 0)]
    throttle: u64,

    /// Max translated content length ('[0-9]+[KMG]?', powers of 1024)
    #[arg(long, default_value = "19G")]
    max_content_length: String,

    /// Broker queue database path
    #[arg(long, env = "ESTRANS_BROKER_URL", default_value = "estrans-queue.db")]
    broker_url: String,

    /// Queue jobs onto the broker instead of translating now
    #[arg(long)]
    plan: bool,

    /// Display a progress bar
    #[arg(long)]
    progressbar: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct WorkerArgs {
    /// Broker queue database path
    #[arg(long, env = "ESTRANS_BROKER_URL", default_value = "estrans-queue.db")]
    broker_url: String,

    /// Number of concurrent consumer loops
    #[arg(long, default_value_t = 1)]
    pool_size: usize,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct StatusArgs {
    /// Broker queue database path
    #[arg(long, env = "ESTRANS_BROKER_URL", default_value = "estrans-queue.db")]
    broker_url: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct PairsArgs {
    /// Translation backend to query
    #[arg(short, long, value_enum, default_value_t = CliBackend::Argos)]
    backend: CliBackend,

    /// Endpoint for HTTP-served backends
    #[arg(long, default_value = "http://localhost:5000")]
    backend_endpoint: String,

    /// Directory where language packs are downloaded
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// estrans - bulk document translation for Elasticsearch indices
///
/// Scans an index for documents to translate, routes each one through a
/// pluggable machine-translation backend (direct or via an intermediary
/// language) and stores the result back on the document.
#[derive(Parser, Debug)]
#[command(name = "estrans")]
#[command(version = "1.0.0")]
#[command(about = "Bulk document translation for Elasticsearch indices")]
#[command(long_about = "estrans scans an Elasticsearch index for documents to translate, routes
each one through a machine-translation backend and stores the result
back on the document without touching any other field.

EXAMPLES:
    estrans -s fr -t en                          # Translate with defaults
    estrans -s pt -t en --intermediary-language es
    estrans -s fr -t en --dry-run                # Compute, write nothing
    estrans -s fr -t en -f                       # Replace existing records
    estrans -s fr -t en --plan                   # Queue jobs for workers
    estrans worker --pool-size 4                 # Consume queued jobs
    estrans pairs -b apertium                    # List installable pairs
    estrans completions bash > estrans.bash      # Generate completions")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Default to info; subcommands raise or lower it from their own flag
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "estrans", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Worker(args)) => run_worker(args).await,
        Some(Commands::Pairs(args)) => run_pairs(args).await,
        Some(Commands::Status(args)) => run_status(args).await,
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if let Some(level) = options.log_level {
        log::set_max_level(level.into());
    }

    let source_language = options
        .source_language
        .ok_or_else(|| anyhow!("--source-language is required"))?;
    let target_language = options
        .target_language
        .ok_or_else(|| anyhow!("--target-language is required"))?;

    let mut config = Config {
        url: options.url,
        index: options.index,
        backend: options.backend.into(),
        backend_endpoint: options.backend_endpoint,
        source_language,
        target_language,
        intermediary_language: options.intermediary_language,
        source_field: options.source_field,
        target_field: options.target_field,
        query_string: options.query_string,
        scan_scroll: options.scan_scroll,
        scan_page_size: options.scan_page_size,
        dry_run: options.dry_run,
        force: options.force,
        pool_size: options.pool_size,
        pool_timeout_secs: options.pool_timeout,
        throttle_ms: options.throttle,
        max_content_length: options.max_content_length,
        broker_url: options.broker_url,
        plan: options.plan,
        progressbar: options.progressbar,
        ..Config::default()
    };
    if let Some(data_dir) = options.data_dir {
        config.data_dir = data_dir;
    }

    let controller = Controller::new(config)?;
    controller.run().await?;
    Ok(())
}

async fn run_worker(options: WorkerArgs) -> Result<()> {
    if let Some(level) = options.log_level {
        log::set_max_level(level.into());
    }

    let worker = Worker::connect(&options.broker_url, options.pool_size)?;
    tokio::select! {
        result = worker.run_forever() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, shutting down");
        }
    }
    Ok(())
}

async fn run_status(options: StatusArgs) -> Result<()> {
    if let Some(level) = options.log_level {
        log::set_max_level(level.into());
    }

    let queue = JobQueue::connect(&options.broker_url)?;
    let stats = queue.stats().await?;

    println!("Queue {}:", options.broker_url);
    println!("  queued       {}", stats.total);
    println!("  leased       {}", stats.leased);
    println!("  deliverable  {}", stats.deliverable());
    Ok(())
}

async fn run_pairs(options: PairsArgs) -> Result<()> {
    if let Some(level) = options.log_level {
        log::set_max_level(level.into());
    }

    let mut config = Config {
        backend: options.backend.into(),
        backend_endpoint: options.backend_endpoint,
        ..Config::default()
    };
    if let Some(data_dir) = options.data_dir {
        config.data_dir = data_dir;
    }

    let interpreter = create_interpreter(&config)?;
    let mut pairs = interpreter.supported_pairs().await?;
    pairs.sort();

    println!("{} supports {} pair(s):", interpreter.label(), pairs.len());
    for pair in pairs {
        println!("  {}", pair);
    }
    Ok(())
}
