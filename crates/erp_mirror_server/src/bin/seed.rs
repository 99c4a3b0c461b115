//! erp_mirror_seed: pull collections from the ERP service layer into the mirror.
//!
//! Usage:
//!   erp_mirror_seed run [--only customers,items] [--page-size 100] [--max-pages N] [--format json]
//!   erp_mirror_seed collections
//!
//! Exit codes: 0 every collection completed cleanly, 1 fatal error (config,
//! store or upstream login), 2 the run finished with aborted collections or
//! failed records.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use erp_mirror_core::catalog::{select_collections, CATALOG};
use erp_mirror_core::reconcile::{CollectionOutcome, Reconciler, RunReport};
use erp_mirror_server::config::SeedConfig;
use erp_mirror_server::open_stores;
use erp_mirror_upstream::ServiceLayerClient;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "erp_mirror_seed")]
#[command(about = "Mirror ERP service layer collections into the document store")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for the run report
    #[arg(long, short = 'f', global = true, default_value = "text", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the selected collections (all when --only is omitted)
    Run {
        /// Collections to sync, by route, name or label
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Records requested per upstream page (overrides MIRROR_SYNC_PAGE_SIZE)
        #[arg(long)]
        page_size: Option<u32>,

        /// Page limit per collection (overrides MIRROR_SYNC_MAX_PAGES)
        #[arg(long)]
        max_pages: Option<u64>,
    },
    /// List the collections known to the mirror
    Collections,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,erp_mirror_server=debug,erp_mirror_core=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Collections => {
            list_collections(cli.format);
            ExitCode::SUCCESS
        }
        Commands::Run {
            only,
            page_size,
            max_pages,
        } => match run(only, page_size, max_pages).await {
            Ok(report) => {
                print_report(&report, cli.format);
                if report.is_clean() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            Err(e) => {
                tracing::error!("seed failed: {e:#}");
                if cli.format == OutputFormat::Json {
                    println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
                }
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(
    only: Vec<String>,
    page_size: Option<u32>,
    max_pages: Option<u64>,
) -> anyhow::Result<RunReport> {
    let mut config = SeedConfig::from_env()?;
    if let Some(page_size) = page_size {
        config.options.page_size = page_size;
    }
    if let Some(max_pages) = max_pages {
        config.options.max_pages = max_pages;
    }

    let collections = select_collections(&only)
        .map_err(|unknown| anyhow::anyhow!("Unknown collection(s): {}", unknown.join(", ")))?;

    let stores = open_stores(&config.store).await?;
    let client = Arc::new(ServiceLayerClient::new(&config.upstream)?);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current page");
            on_signal.cancel();
        }
    });

    let reconciler = Reconciler::new(client.clone(), client, stores.documents, config.options)
        .with_cancellation(cancel);
    let report = reconciler.run(&config.credentials, &collections).await?;
    Ok(report)
}

fn list_collections(format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = CATALOG
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "name": c.name,
                        "route": c.route,
                        "label": c.label,
                        "upstream": c.upstream.path,
                    })
                })
                .collect();
            println!("{}", serde_json::Value::Array(rows));
        }
        OutputFormat::Text => {
            for c in CATALOG {
                println!("{:<20} /api/{:<20} {}", c.name, c.route, c.upstream.path);
            }
        }
    }
}

fn print_report(report: &RunReport, format: OutputFormat) {
    if format == OutputFormat::Json {
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!("failed to render report: {e}"),
        }
        return;
    }

    println!(
        "{:<20} {:>6} {:>8} {:>8} {:>8} {:>6}  status",
        "collection", "pages", "fetched", "inserted", "updated", "failed"
    );
    for c in &report.collections {
        let status = match &c.outcome {
            CollectionOutcome::Completed => "completed".to_string(),
            CollectionOutcome::Aborted { error } => format!("aborted: {error}"),
            CollectionOutcome::PageLimitReached => "page limit reached".to_string(),
            CollectionOutcome::Cancelled => "cancelled".to_string(),
        };
        println!(
            "{:<20} {:>6} {:>8} {:>8} {:>8} {:>6}  {}",
            c.collection, c.pages, c.fetched, c.inserted, c.updated, c.failed, status
        );
    }
}
