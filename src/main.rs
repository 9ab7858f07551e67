mod cli;
mod config;
mod model;
mod providers;
mod sync;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Command;
use sync::Reconciler;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = cli::parse_args(&args)?;
    if opts.command == Command::Help {
        cli::print_help();
        return Ok(());
    }

    init_tracing(opts.verbose);

    // Missing credentials or lists are fatal before any remote call
    let config = config::load_config(opts.config_path.as_deref())?;
    info!(
        board = %config.board_id,
        lists = config.lists.len(),
        workers = config.workers,
        interval_secs = config.sync_interval.as_secs(),
        "Configuration loaded"
    );

    let board = providers::create_board(&config);
    let search = providers::create_search(&config);
    info!(board = board.name(), search = search.name(), "Clients ready");
    let reconciler = Reconciler::new(config, board, search);

    match opts.command {
        Command::Lists => {
            let report = reconciler.reconcile_lists().await?;
            info!(created = ?report.created, closed = ?report.closed, "Lists reconciled");
        }
        Command::Once => {
            let report = reconciler.run_once().await?;
            info!(%report, "Pass complete");
        }
        Command::Run => {
            tokio::select! {
                _ = reconciler.run_forever() => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
            }
        }
        Command::Help => {}
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
