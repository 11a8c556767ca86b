use std::process;
use std::sync::Arc;

use clap::{ArgAction, Parser};
use tracing::{error, info, warn};

use skipbo_server::config::{DEFAULT_HOST, DEFAULT_MAX_LINE_LENGTH, DEFAULT_PORT};
use skipbo_server::telemetry::init_tracing;
use skipbo_server::{ServerConfig, ServerError, TARGET_SCORE, TracingSink};

#[derive(Parser, Debug)]
#[command(name = "skipbo-server", about = "Multiplayer Skip-Bo game server.")]
struct Args {
    /// Address to bind
    #[arg(long, env = "SKIPBO_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// TCP port (0 picks a free one)
    #[arg(short, long, env = "SKIPBO_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Base RNG seed for reproducible deals
    #[arg(short, long, env = "SKIPBO_SEED")]
    seed: Option<u64>,

    /// Override the per-player stock size (default rules when omitted)
    #[arg(long = "stock-size", env = "SKIPBO_STOCK_SIZE")]
    stock_size: Option<usize>,

    /// Cumulative score that ends a game
    #[arg(long = "target-score", env = "SKIPBO_TARGET_SCORE", default_value_t = TARGET_SCORE)]
    target_score: u32,

    /// Longest accepted request line in bytes
    #[arg(long = "max-line-length", env = "SKIPBO_MAX_LINE_LENGTH", default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    max_line_length: usize,

    /// Emit logs as JSON
    #[arg(long = "json-logs", env = "SKIPBO_JSON_LOGS", action = ArgAction::SetTrue)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.json_logs);
    if let Err(err) = run(args).await {
        error!(error = %err, "server failed");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        seed: args.seed,
        stock_size: args.stock_size,
        target_score: args.target_score,
        max_line_length: args.max_line_length,
    };
    let (handle, addr) = skipbo_server::start(config, Arc::new(TracingSink)).await?;
    info!(%addr, "skipbo server ready");

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
    }
    handle.shutdown().await;
    Ok(())
}
