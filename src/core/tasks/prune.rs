// src/core/tasks/prune.rs

//! The liveness sweep: evicts connections that have stopped heartbeating.

use crate::core::state::ServerState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Periodically prunes connections silent for longer than the configured
/// deadline. Eviction reverts any bound user to logged-out and fires the
/// connection's kill channel; nothing is journaled.
pub struct PruneTask {
    state: Arc<ServerState>,
}

impl PruneTask {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.state.config.prune_interval_ms));
        info!(
            "Prune task started. Connections are evicted after {}s of silence.",
            self.state.config.dead_after_secs
        );

        loop {
            tokio::select! {
                _ = interval.tick() => self.sweep().await,
                _ = shutdown_rx.recv() => {
                    info!("Prune task shutting down.");
                    return;
                }
            }
        }
    }

    async fn sweep(&self) {
        let dead = self.state.liveness.expired(self.state.dead_after());
        for conn_id in dead {
            {
                let mut store = self.state.store.lock().await;
                if let Some(index) = store.find_user_by_connection(conn_id) {
                    info!(
                        "User \"{}\" did not log out properly; no heartbeat since the deadline, assuming dead",
                        store.user(index).name
                    );
                    store.logout_user(index);
                }
            }
            debug!("Evicting silent connection {conn_id}");
            self.state.liveness.kill(conn_id);
        }
    }
}
