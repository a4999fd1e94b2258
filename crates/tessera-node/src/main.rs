//! tessera-node: single-process chain running the budget engine.
//!
//! Builds the genesis state, then produces a block every
//! `block_interval_secs`, allocating budget payouts in each one. Stops after
//! `max_blocks` or on Ctrl-C and prints a JSON summary of the chain to
//! stdout.

mod config;
mod genesis;
mod producer;

use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::NodeConfig;
use crate::genesis::GenesisState;
use crate::producer::BlockProducer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = NodeConfig::load()?;

    // 2. Initialize tracing; RUST_LOG wins over the configured level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.log_level)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Tessera node starting");

    // 3. Build genesis state
    let genesis = match config.genesis_path() {
        Some(path) => {
            info!("Loading genesis from {:?}", path);
            GenesisState::load(&path)?
        }
        None => GenesisState::empty(config.chain.genesis_time),
    };
    let store = genesis.build()?;
    let mut producer = BlockProducer::new(store, config.chain.block_interval_secs);
    info!(
        accounts = producer.store().account_count(),
        head = producer.store().chain_state().head_block_num,
        "Genesis loaded"
    );

    // 4. Produce blocks until the limit or shutdown
    let max_blocks = config.chain.max_blocks;
    let mut ticker = tokio::time::interval(Duration::from_secs(u64::from(
        config.chain.block_interval_secs,
    )));
    // The first tick completes immediately; block 1 comes one interval later.
    ticker.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut produced: u32 = 0;
    while max_blocks == 0 || produced < max_blocks {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = producer.produce() {
                    error!("Block production failed: {}", e);
                    break;
                }
                produced += 1;
            }
            _ = &mut shutdown => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    // 5. Report final state
    let summary = producer.summary()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!(blocks = produced, "Node stopped");
    Ok(())
}
