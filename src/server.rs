//! TCP front end: one task per connection, one JSON snapshot per line.

use crate::config::ServerConfig;
use crate::games::crossword::Catalog;
use crate::protocol::ServerResponse;
use crate::registry::Registry;
use crate::session::{Flow, Session};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::{debug, error, info, instrument, warn};

/// Crossword server over a shared registry.
#[derive(Debug, Clone)]
pub struct CrosswordServer {
    registry: Arc<Registry>,
}

impl CrosswordServer {
    /// Creates a server serving `catalog`.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            registry: Arc::new(Registry::new(catalog)),
        }
    }

    /// Loads the catalog named by `config`.
    #[instrument(skip(config), fields(dir = %config.puzzle_dir().display()))]
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let catalog = Catalog::load_dir(config.puzzle_dir(), config.puzzle_extension())
            .with_context(|| format!("reading puzzle directory {}", config.puzzle_dir().display()))?;
        if catalog.is_empty() {
            warn!("No puzzles loaded; players can only join existing matches");
        }
        Ok(Self::new(catalog))
    }

    /// Shared registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Binds the configured address and serves forever.
    pub async fn run(self, config: &ServerConfig) -> Result<()> {
        let addr = config.bind_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        self.serve(listener).await
    }

    /// Accepts connections on `listener` until it fails.
    #[instrument(skip_all, fields(addr = ?listener.local_addr().ok()))]
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!("Crossword server listening");
        loop {
            let (stream, peer) = listener.accept().await.context("accepting connection")?;
            let registry = Arc::clone(&self.registry);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(registry, stream, peer).await {
                    warn!(%peer, error = %e, "Connection ended with error");
                }
            });
        }
    }
}

/// Runs one connection: reads commands until EXIT, EOF or an internal error.
#[instrument(skip(registry, stream))]
async fn handle_connection(
    registry: Arc<Registry>,
    stream: TcpStream,
    peer: SocketAddr,
) -> Result<()> {
    info!("Client connected");
    let (reader, writer) = stream.into_split();
    let (tx, rx) = unbounded_channel();
    let writer_task = tokio::spawn(write_responses(writer, rx));

    let mut session = Session::new(registry, tx);
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!("Client closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Read failed");
                break;
            }
        }
        // Invalid UTF-8 becomes U+FFFD and earns the usual in-state diagnostic.
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        match session.handle_line(line) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Close) => break,
            Err(e) => {
                error!(error = %e, "Dropping connection after internal error");
                break;
            }
        }
    }

    // Every outbox sender goes away with the session, letting the writer drain and stop.
    session.disconnect();
    drop(session);
    writer_task.await.context("writer task panicked")??;
    info!("Client disconnected");
    Ok(())
}

async fn write_responses(
    mut writer: OwnedWriteHalf,
    mut outbox: UnboundedReceiver<ServerResponse>,
) -> Result<()> {
    while let Some(response) = outbox.recv().await {
        let mut line = serde_json::to_string(&response)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
    }
    writer.shutdown().await?;
    Ok(())
}
