//! Weave node entry point.
//!
//! Minimal by design: load the chain config, open the block log, replay
//! into the deterministic core, and report the head. Network ingestion and
//! API surfaces attach as collaborators around [`lib_chain::Database`].

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use lib_chain::{ChainConfig, Database, SledBlockLog};
use lib_protocol::HashSigner;

#[derive(Parser, Debug)]
#[command(name = "weaved", about = "Weave chain node", version)]
struct Args {
    /// Data directory holding the block log
    #[arg(long, default_value = "./weave-data")]
    data_dir: PathBuf,

    /// Chain config JSON; omit for mainnet defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the short-window test configuration
    #[arg(long)]
    testnet: bool,

    /// Log filter, e.g. "info" or "lib_chain=debug"
    #[arg(long, default_value = "info")]
    log: String,
}

fn load_config(args: &Args) -> Result<ChainConfig> {
    if let Some(path) = &args.config {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading chain config {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing chain config {}", path.display()))?;
        return Ok(config);
    }
    Ok(if args.testnet {
        ChainConfig::testing()
    } else {
        ChainConfig::default()
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&args.log)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config(&args)?;
    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("creating data dir {}", args.data_dir.display()))?;

    let block_log = SledBlockLog::open(args.data_dir.join("block_log"))
        .context("opening block log")?;
    let mut database = Database::open(config, Box::new(block_log), Box::new(HashSigner))
        .context("initializing chain state")?;

    let replayed = database.replay_block_log().context("replaying block log")?;
    let global = database.state().global();
    info!(
        replayed,
        head = global.head_block_number,
        time = %global.time,
        supply = %global.current_supply,
        irreversible = global.last_irreversible_block_num,
        "node state ready"
    );

    println!(
        "weaved: head block {} at {} ({} accounts, supply {})",
        global.head_block_number,
        global.time,
        database.state().accounts.len(),
        global.current_supply,
    );
    Ok(())
}
