// src/server/listener.rs

//! Contains the main accept loop and graceful shutdown handling.

use crate::connection::ConnectionHandler;
use crate::core::state::ServerState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

// Platform-specific signal handling imports
#[cfg(windows)]
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Waits for a shutdown signal based on the operating system.
/// On Unix, it listens for SIGINT and SIGTERM. On Windows, Ctrl+C.
async fn await_shutdown_signal() {
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to create SIGINT stream");
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to create SIGTERM stream");

    #[cfg(windows)]
    let mut ctrl_c = signal::ctrl_c().expect("Failed to create Ctrl+C stream");

    tokio::select! {
        _ = async { #[cfg(unix)] { sigint.recv().await; info!("SIGINT received, initiating graceful shutdown."); } } => {},
        _ = async { #[cfg(unix)] { sigterm.recv().await; info!("SIGTERM received, initiating graceful shutdown."); } } => {},
        _ = async { #[cfg(windows)] { ctrl_c.await; info!("Ctrl-C received, initiating graceful shutdown."); } } => {},
    }
}

/// Accepts connections until a shutdown signal (OS or programmatic) arrives,
/// then tears down every connection task.
pub(super) async fn run(
    state: Arc<ServerState>,
    listener: TcpListener,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut conn_id_counter: u64 = 0;
    let mut client_tasks = JoinSet::new();
    let mut external_shutdown_rx = shutdown_tx.subscribe();

    loop {
        tokio::select! {
            biased;

            _ = await_shutdown_signal() => {
                break;
            },

            _ = external_shutdown_rx.recv() => {
                info!("Shutdown requested, stopping the accept loop.");
                break;
            },

            res = listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        if state.liveness.len() >= state.config.max_clients {
                            warn!("Refusing connection from {addr}: max_clients reached");
                            continue;
                        }

                        conn_id_counter = conn_id_counter.wrapping_add(1);
                        let conn_id = conn_id_counter;
                        info!("Accepted new connection from {addr} (connection {conn_id})");

                        let kill_rx = state.liveness.register(conn_id);
                        let shutdown_rx = shutdown_tx.subscribe();
                        let state_clone = state.clone();
                        client_tasks.spawn(async move {
                            let mut handler = ConnectionHandler::new(
                                socket, addr, conn_id, state_clone, kill_rx, shutdown_rx,
                            );
                            handler.run().await;
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {e}");
                    }
                }
            },

            // Reap completed client tasks.
            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            },
        }
    }

    info!("Shutting down. Sending signal to all connection tasks.");
    let _ = shutdown_tx.send(());
    client_tasks.shutdown().await;
    info!("All client connections closed.");
}
