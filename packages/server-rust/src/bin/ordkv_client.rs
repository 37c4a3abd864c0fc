//! `ordkv-client`: turns text commands into JSON operation records on stdout.
//!
//! Without `--input-file` the client is interactive: commands are read from
//! stdin and every line is answered on stderr. Pipe stdout into
//! `ordkv-server` to apply the operations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ordkv_server::client::{run_client, BatchResponder, Executor, InteractiveResponder, Responder};
use ordkv_server::telemetry::{init_tracing, LogFormat};
use ordkv_server::transport::LineSink;
use tokio::io::BufReader;

#[derive(Debug, Parser)]
#[command(name = "ordkv-client", about = "Publish ordkv operations", version)]
struct Args {
    /// Read commands from this file instead of stdin.
    #[arg(long, env = "INPUT_FILE")]
    input_file: Option<PathBuf>,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format)?;

    let executor = Executor::new(Arc::new(LineSink::stdout()));

    match &args.input_file {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("can't open input file {}", path.display()))?;
            let mut responder = BatchResponder::new(std::io::stderr());
            run(&executor, &mut responder, BufReader::new(file)).await
        }
        None => {
            let mut responder = InteractiveResponder::new(std::io::stderr());
            run(&executor, &mut responder, BufReader::new(tokio::io::stdin())).await
        }
    }
}

async fn run<R>(executor: &Executor, responder: &mut dyn Responder, input: R) -> anyhow::Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    run_client(executor, responder, input, ctrl_c())
        .await
        .context("error reading commands")
}
