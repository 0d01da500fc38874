// src/server/mod.rs

//! Server bootstrap: journal recovery, listener setup, and task spawning.

mod listener;

use crate::config::Config;
use crate::core::journal::{Journal, recovery};
use crate::core::state::ServerState;
use crate::core::store::Store;
use crate::core::tasks::prune::PruneTask;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

/// A bound, recovered server that has not yet started accepting connections.
///
/// Splitting bind from run lets callers (tests in particular) learn the bound
/// address and hold a shutdown handle before the accept loop starts.
pub struct Server {
    state: Arc<ServerState>,
    listener: TcpListener,
    shutdown_tx: broadcast::Sender<()>,
    local_addr: SocketAddr,
}

impl Server {
    /// Opens the journal, replays it into a fresh store, and binds the
    /// listener.
    pub async fn bind(config: Config) -> Result<Self> {
        let journal = Journal::open(&config.journal_path)
            .await
            .with_context(|| format!("Failed to open journal at '{}'", config.journal_path))?;

        let mut store = Store::new(journal);
        recovery::replay(&mut store);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("Failed to bind TCP listener on {bind_addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read the listener's local address")?;

        let (shutdown_tx, _) = broadcast::channel(1);
        let state = Arc::new(ServerState::new(config, store));

        info!("Listening on {local_addr}");
        Ok(Self {
            state,
            listener,
            shutdown_tx,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// A handle that stops the accept loop and every spawned task when fired.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Spawns the background tasks and runs the accept loop until shutdown.
    pub async fn run(self) -> Result<()> {
        let prune = PruneTask::new(self.state.clone());
        let prune_shutdown_rx = self.shutdown_tx.subscribe();
        let prune_handle = tokio::spawn(prune.run(prune_shutdown_rx));

        listener::run(self.state, self.listener, self.shutdown_tx).await;

        let _ = prune_handle.await;
        info!("Server shutdown complete.");
        Ok(())
    }
}

/// The main server startup function: bind, recover, and serve until a
/// shutdown signal arrives.
pub async fn run(config: Config) -> Result<()> {
    Server::bind(config).await?.run().await
}
