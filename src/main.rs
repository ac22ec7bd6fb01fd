//! Crossword Duel server binary.

use anyhow::{Context, Result};
use clap::Parser;
use crossword_duel::{Board, Cli, Command, CrosswordServer, ServerConfig, parse_puzzle};
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();
    initialize_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            puzzle_dir,
            port,
            host,
        } => run_server(&cli.config, puzzle_dir, port, host).await,
        Command::Check { files } => check_puzzles(&files),
    }
}

fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crossword_duel=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Run the TCP game server
#[instrument(skip_all, fields(config_path = %config_path.display()))]
async fn run_server(
    config_path: &Path,
    puzzle_dir: Option<PathBuf>,
    port: Option<u16>,
    host: Option<String>,
) -> Result<()> {
    let mut config = ServerConfig::load_or_default(config_path)?;
    if let Some(dir) = puzzle_dir {
        config = config.with_puzzle_dir(dir);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(host) = host {
        config = config.with_host(host);
    }
    info!(?config, "Starting crossword server");

    let server = CrosswordServer::from_config(&config)?;
    info!(puzzles = server.registry().catalog().len(), "Catalog ready");
    server.run(&config).await
}

/// Validate puzzle files, reporting every failure
#[instrument(skip_all, fields(count = files.len()))]
fn check_puzzles(files: &[PathBuf]) -> Result<()> {
    let mut failures = 0;
    for path in files {
        let result = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))
            .and_then(|text| Ok(parse_puzzle(&text)?))
            .and_then(|spec| Ok(Board::from_spec(&spec)?));
        match result {
            Ok(board) => {
                info!(path = %path.display(), catalog_id = %board.catalog_id(), "Puzzle OK");
                println!("{}: {} ({} words)", path.display(), board.catalog_id(), board.slots().count());
                print!("{}", board.render_text());
            }
            Err(e) => {
                failures += 1;
                error!(path = %path.display(), error = %e, "Puzzle rejected");
                eprintln!("{}: {:#}", path.display(), e);
            }
        }
    }
    anyhow::ensure!(failures == 0, "{failures} puzzle(s) rejected");
    Ok(())
}
