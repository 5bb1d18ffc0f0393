//! # llm-discovery
//!
//! Discovers the models offered by LLM providers, caches the latest complete
//! listing for offline use, and records what changed between runs.
//!
//! ## Features
//! - Concurrent, all-or-nothing discovery across providers (`update`)
//! - Offline listing and export from the cache (`list`, `export`)
//! - Snapshot history with added/removed model tracking (`changes`, `snapshots`)

mod cli;
mod core;
mod run;

use clap::Parser;
use dotenv::dotenv;

use crate::cli::Args;

#[tokio::main]
async fn main() {
    dotenv().ok();

    let args = Args::parse();
    run::init_logger(&args);

    run::dispatch(args).await;
}
