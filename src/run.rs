//! Application run modes: logger init, cancellation, command dispatch.

use std::io;

use clap::CommandFactory;
use tokio_util::sync::CancellationToken;

use crate::cli::{self, Args, Commands, SnapshotsSubcommand};
use crate::core;
use crate::core::config::Config;
use crate::core::service::DiscoveryService;

/// Initialize env_logger on stderr so stdout stays clean for exports.
pub fn init_logger(args: &Args) {
    let log_level = args.log_level();
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .target(env_logger::Target::Stderr)
        .try_init();
}

fn load_config() -> Config {
    core::config::load().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    })
}

/// Token cancelled on Ctrl-C, so an in-flight discovery stops without committing.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; cancelling discovery");
            trigger.cancel();
        }
    });
    token
}

/// Run the parsed command to completion.
pub async fn dispatch(args: Args) {
    match args.command {
        Commands::Completions { shell } => {
            let mut cmd = Args::command();
            cli::generate(shell, &mut cmd, core::app::NAME, &mut io::stdout());
        }
        Commands::Config => core::cli::run_config(&load_config()),
        command => {
            let service = DiscoveryService::new(load_config());
            run_with_service(&service, command).await;
        }
    }
}

async fn run_with_service(service: &DiscoveryService, command: Commands) {
    match command {
        Commands::Update => {
            let cancel = cancel_on_ctrl_c();
            core::cli::run_update(service, &cancel).await;
        }
        Commands::List { query } => core::cli::run_list(service, query.as_deref()),
        Commands::Export { format, output } => {
            core::cli::run_export(service, format, output.as_deref())
        }
        Commands::Changes { from, to, json } => {
            core::cli::run_changes(service, from.as_deref(), to.as_deref(), json)
        }
        Commands::Snapshots { subcommand } => match subcommand {
            SnapshotsSubcommand::List { limit } => core::cli::run_snapshots_list(service, limit),
            SnapshotsSubcommand::Show { id } => core::cli::run_snapshots_show(service, &id),
            SnapshotsSubcommand::Prune { retention_days } => {
                core::cli::run_snapshots_prune(service, retention_days)
            }
        },
        Commands::Config | Commands::Completions { .. } => {}
    }
}
