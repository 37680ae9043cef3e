//! Replay product identifiers found in catalog exports to the indexer, or split exports into chunks.
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use envconfig::Envconfig;
use tracing::{error, info};

use reindex_common::metrics::{serve, setup_metrics_router};
use reindex_common::webhook::{Country, Environment};
use reindex_worker::config::Config;
use reindex_worker::events::{log_events, EventSender};
use reindex_worker::orchestrator::{BatchOrchestrator, RunSettings};
use reindex_worker::sink::DirectorySink;
use reindex_worker::split::SplitOrchestrator;
use reindex_worker::spreadsheet::InputFile;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deduplicate the product ids in the given spreadsheets and notify the indexer about each one
    Dispatch {
        /// Spreadsheets to read product ids from
        files: Vec<PathBuf>,

        /// Which indexer to notify: qa or production
        #[arg(long, default_value = "production")]
        environment: Environment,

        /// Country code sent with every notification
        #[arg(long, default_value = "SV")]
        country: Country,
    },

    /// Merge the given spreadsheets by product id and write them back out in fixed-size files
    Split {
        /// Spreadsheets to merge
        files: Vec<PathBuf>,

        /// Directory the bloque_<n>.xlsx files are written to
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Maximum rows per output file, overriding CHUNK_SIZE
        #[arg(long)]
        chunk_size: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    let config = Config::init_from_env().context("Invalid configuration")?;
    let cli = Cli::parse();

    if config.export_prometheus {
        let router = setup_metrics_router().context("failed to install metrics recorder")?;
        let bind = config.bind();
        tokio::task::spawn(async move {
            if let Err(e) = serve(router, &bind).await {
                error!("failed to start serving metrics: {}", e);
            }
        });
    }

    let (events, rx) = EventSender::channel();
    let collaborator = tokio::task::spawn(log_events(rx));

    let result = match cli.command {
        Commands::Dispatch {
            files,
            environment,
            country,
        } => dispatch(&config, files, environment, country, events).await,
        Commands::Split {
            files,
            output_dir,
            chunk_size,
        } => split(&config, files, output_dir, chunk_size, events).await,
    };

    // Every EventSender is gone by now, so the collaborator drains and exits.
    collaborator.await?;

    result
}

async fn dispatch(
    config: &Config,
    paths: Vec<PathBuf>,
    environment: Environment,
    country: Country,
    events: EventSender,
) -> anyhow::Result<()> {
    let settings = RunSettings::resolve(&config.endpoints(), environment, country)?;

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        match InputFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => events.error(e.to_string()),
        }
    }

    if files.is_empty() && !paths.is_empty() {
        anyhow::bail!("none of the {} input file(s) could be opened", paths.len());
    }

    let orchestrator = BatchOrchestrator::from_config(config, settings, events)?;
    let report = orchestrator.run(&files).await?;

    info!(
        succeeded = report.success_count,
        failed = report.failed_requests.len(),
        "all done"
    );
    Ok(())
}

async fn split(
    config: &Config,
    paths: Vec<PathBuf>,
    output_dir: PathBuf,
    chunk_size: Option<usize>,
    events: EventSender,
) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        match InputFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => {
                events.error(e.to_string());
                return Err(e.into());
            }
        }
    }

    let orchestrator = SplitOrchestrator::new(chunk_size.unwrap_or(config.chunk_size));
    let sink = DirectorySink::new(&output_dir);
    let outputs = orchestrator.run(&files, &sink, &events).await?;

    info!(files = outputs.len(), dir = %output_dir.display(), "all done");
    Ok(())
}
