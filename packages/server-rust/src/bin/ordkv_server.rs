//! `ordkv-server`: applies queued operations to an in-memory ordered store.
//!
//! Reads JSON operation records line by line from stdin, or from
//! `--input-file`, and runs until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ordkv_server::service::{OperationJournal, ServerConfig, ServiceModule};
use ordkv_server::telemetry::{init_tracing, LogFormat};
use ordkv_server::traits::MessageSource;
use ordkv_server::transport::LineSource;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "ordkv-server", about = "Queue-driven ordered key-value store", version)]
struct Args {
    /// Number of worker tasks applying operations (defaults to the CPU count).
    #[arg(long, env = "PARALLELISM_DEGREE")]
    parallelism_degree: Option<usize>,

    /// Capacity of the internal operation queue.
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = ordkv_server::service::config::DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Long-poll wait per receive, in seconds.
    #[arg(
        long,
        env = "WAIT_TIME_SECONDS",
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    wait_time_seconds: u64,

    /// File to read operation records from instead of stdin.
    #[arg(long, env = "INPUT_FILE")]
    input_file: Option<PathBuf>,

    /// Append a journal of processed operations to this file.
    #[arg(long, env = "JOURNAL_FILE")]
    journal_file: Option<PathBuf>,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            worker_count: self.parallelism_degree.unwrap_or(defaults.worker_count),
            queue_capacity: self.queue_capacity,
            wait_time: Duration::from_secs(self.wait_time_seconds),
            ..defaults
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format)?;

    let journal = args
        .journal_file
        .as_deref()
        .map(|path| {
            OperationJournal::create(path)
                .with_context(|| format!("can't open journal file {}", path.display()))
        })
        .transpose()?;

    let source: Arc<dyn MessageSource> = match &args.input_file {
        Some(path) => Arc::new(
            LineSource::open(path)
                .await
                .with_context(|| format!("can't open input file {}", path.display()))?,
        ),
        None => Arc::new(LineSource::stdin()),
    };

    let module = ServiceModule::new(args.server_config(), journal);
    info!(
        workers = module.config().worker_count,
        queue_capacity = module.config().queue_capacity,
        "starting ordkv server"
    );

    let report = module
        .serve(source, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("can't listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!(
        received = report.dispatch.received,
        applied = report.pool.applied,
        drained = report.pool.drained,
        "server stopped"
    );
    Ok(())
}
