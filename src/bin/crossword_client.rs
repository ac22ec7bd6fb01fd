//! Terminal client for Crossword Duel.
//!
//! Forwards stdin lines to the server and prints every snapshot as text.

use anyhow::{Context, Result};
use clap::Parser;
use crossword_duel::ServerResponse;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Crossword Duel terminal client
#[derive(Parser, Debug)]
#[command(name = "crossword_client", version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "4949")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let stream = TcpStream::connect((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("connecting to {}:{}", args.host, args.port))?;
    info!(host = %args.host, port = args.port, "Connected");

    let (reader, mut writer) = stream.into_split();
    let mut server_lines = BufReader::new(reader).lines();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = server_lines.next_line() => {
                let Some(line) = line? else {
                    println!("Server closed the connection.");
                    return Ok(());
                };
                match serde_json::from_str::<ServerResponse>(&line) {
                    Ok(response) => print!("{}", render(&response)),
                    Err(e) => warn!(error = %e, %line, "Unreadable snapshot"),
                }
            }
            command = input.next_line(), if stdin_open => {
                match command? {
                    Some(command) => {
                        debug!(%command, "Sending");
                        writer.write_all(command.trim().as_bytes()).await?;
                        writer.write_all(b"\n").await?;
                    }
                    None => {
                        stdin_open = false;
                        writer.shutdown().await?;
                    }
                }
            }
        }
    }
}

fn render(response: &ServerResponse) -> String {
    let mut out = format!("\n== {} ==\n", response.state());
    if let Some(message) = response.message() {
        out.push_str(&format!("> {message}\n"));
    }
    match response {
        ServerResponse::Start { .. } => out.push_str("Enter a player ID:\n"),
        ServerResponse::Choose { games, .. } => {
            out.push_str("PLAY <matchId> | NEW <matchId> <puzzleId> \"<description>\" | EXIT\n");
            for game in games {
                out.push_str(&format!("  {game}\n"));
            }
        }
        ServerResponse::Wait { .. } => out.push_str("Waiting for an opponent. EXIT to cancel.\n"),
        ServerResponse::Play {
            board,
            clues,
            scores,
            ..
        } => {
            out.push_str(&board.to_string());
            out.push_str("Clues:\n");
            for clue in clues {
                out.push_str(&format!("  {clue}\n"));
            }
            out.push_str(&format!("Scores: {}\n", scores.join(", ")));
            out.push_str("TRY <slotId> <word> | CHALLENGE <slotId> <word> | EXIT\n");
        }
        ServerResponse::Score { scores, .. } => {
            out.push_str(&format!("Scores: {}\n", scores.join(", ")));
            out.push_str("NEW MATCH | EXIT\n");
        }
    }
    out
}
