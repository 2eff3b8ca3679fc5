//! Crawl Executor main entry point
//!
//! This is the command-line interface that schedules a crawl plan on the cluster.

use clap::Parser;
use crawl_executor::config::{load_config, Config};
use crawl_executor::ids::UuidGenerator;
use crawl_executor::plan::{load_plan_with_hash, CrawlPlan};
use crawl_executor::producer::{KafkaSink, MemorySink, MessageProducer};
use crawl_executor::source::UrlSource;
use crawl_executor::{Executor, ExecutorError, RunOutcome};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Crawl Executor: schedules a crawl plan on a distributed crawl cluster
///
/// Checks cluster health, sets per-domain rate limits on the control plane,
/// and streams the URL dump into the cluster's Kafka ingestion topic.
#[derive(Parser, Debug)]
#[command(name = "crawl-executor")]
#[command(version)]
#[command(about = "Schedules a crawl plan on a crawl cluster", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Crawl plan to execute (overrides input.plan-path)
    #[arg(long, value_name = "FILE")]
    plan: Option<PathBuf>,

    /// URL dump to schedule (overrides input.url-dump-path)
    #[arg(long, value_name = "FILE")]
    urls: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate inputs and show what would be scheduled without contacting the cluster
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_executor=info,warn"),
            1 => EnvFilter::new("crawl_executor=debug,info"),
            2 => EnvFilter::new("crawl_executor=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads every input, then runs or previews the crawl
///
/// Inputs are read before any network interaction so a bad file fails fast.
async fn run(cli: Cli) -> Result<u8, ExecutorError> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)?;

    let plan_path = cli
        .plan
        .unwrap_or_else(|| PathBuf::from(&config.input.plan_path));
    let urls_path = cli
        .urls
        .unwrap_or_else(|| PathBuf::from(&config.input.url_dump_path));

    let (plan, plan_hash) = load_plan_with_hash(&plan_path)?;
    tracing::info!(
        "Crawl plan loaded from {} ({} domains, hash: {})",
        plan_path.display(),
        plan.len(),
        plan_hash
    );

    let urls = UrlSource::open(&urls_path)?;

    if cli.dry_run {
        handle_dry_run(&config, &plan, urls).await;
        return Ok(0);
    }

    handle_crawl(config, &plan, urls).await
}

/// Handles the --dry-run mode: validates inputs and shows what would be scheduled
async fn handle_dry_run(config: &Config, plan: &CrawlPlan, urls: UrlSource) {
    println!("=== Crawl Executor Dry Run ===\n");

    println!("Cluster:");
    println!("  Control plane: {}", config.cluster.rest_url);
    println!("  Request timeout: {}ms", config.cluster.request_timeout_ms);

    println!("\nKafka:");
    println!("  Brokers: {}", config.kafka.brokers);
    println!("  Topic: {}", config.kafka.topic);
    println!(
        "  Buffer capacity: {} messages",
        config.kafka.queue_buffering_max_messages
    );

    println!("\nRate Limits ({} domains):", plan.len());
    for (domain, limit) in &plan.domains {
        println!("  - {}: {} hits / {}", domain, limit.hits, limit.window);
    }

    let summary = MessageProducer::from_config(MemorySink::new(), config)
        .run(urls, "dry-run")
        .await;

    println!("\nURL Dump:");
    println!("  Messages: {}", summary.submitted);
    println!("  Unreadable rows: {}", summary.skipped);

    println!("\n✓ Configuration and inputs are valid");
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    plan: &CrawlPlan,
    urls: UrlSource,
) -> Result<u8, ExecutorError> {
    let kafka = config.kafka.clone();
    let executor = Executor::new(config, Arc::new(UuidGenerator))?;

    let outcome = executor
        .execute(plan, urls, || KafkaSink::connect(&kafka))
        .await;

    if let RunOutcome::Scheduled { crawl_id, summary } = &outcome {
        tracing::info!(
            "Crawl {} finished: {} sent, {} failed, {} skipped",
            crawl_id,
            summary.sent,
            summary.failed,
            summary.skipped
        );
    }

    Ok(outcome.exit_code())
}
