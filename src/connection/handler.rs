// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a
//! client connection.
//!
//! One task per connection. The loop reads exactly one opcode byte, hands the
//! conversation to the protocol engine, and returns for the next opcode, so a
//! client's opcodes are strictly serialized. Idle reads are unbounded: silent
//! connections are the liveness sweep's job, and the sweep reaches in through
//! the kill channel registered at accept time.
//!
//! A task that exits on EOF or a transport error deliberately leaves its
//! liveness entry behind; the sweep evicts it and reverts the bound user to
//! logged-out, exactly as it would for a silently dead socket.

use crate::core::ChatError;
use crate::core::handler::{self, Conversation, NextAction};
use crate::core::protocol::Opcode;
use crate::core::state::ServerState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Manages the full lifecycle of a client connection.
pub struct ConnectionHandler {
    stream: TcpStream,
    addr: SocketAddr,
    conn_id: u64,
    state: Arc<ServerState>,
    kill_rx: broadcast::Receiver<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        conn_id: u64,
        state: Arc<ServerState>,
        kill_rx: broadcast::Receiver<()>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            stream,
            addr,
            conn_id,
            state,
            kill_rx,
            shutdown_rx,
        }
    }

    /// The main event loop for the connection.
    pub async fn run(&mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => {
                    debug!("Connection {} ({}) closing: server shutdown", self.conn_id, self.addr);
                    break;
                }
                _ = self.kill_rx.recv() => {
                    debug!("Connection {} ({}) evicted by the liveness sweep", self.conn_id, self.addr);
                    break;
                }
                result = self.stream.read_u8() => {
                    match result {
                        Ok(byte) => {
                            if !self.handle_opcode_byte(byte).await {
                                break;
                            }
                        }
                        Err(e) => {
                            debug!("Connection {} ({}) closed: {}", self.conn_id, self.addr, e);
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Handles a single opcode byte. Returns false when the connection should
    /// be torn down.
    async fn handle_opcode_byte(&mut self, byte: u8) -> bool {
        let opcode = match Opcode::try_from(byte) {
            Ok(opcode) => opcode,
            Err(_) => {
                warn!("Unknown opcode {byte} from {}", self.addr);
                return true;
            }
        };

        let mut conversation =
            Conversation::new(&mut self.stream, self.state.clone(), self.conn_id);
        match handler::dispatch(opcode, &mut conversation).await {
            Ok(NextAction::Continue) => true,
            Ok(NextAction::Close) => false,
            Err(ChatError::ReadTimeout) => {
                // The client went quiet mid-conversation. Abort the handler
                // without a reply; the connection itself stays up until the
                // sweep reclaims it.
                warn!("Client {} dropped mid-{:?}", self.addr, opcode);
                true
            }
            Err(e) => {
                debug!(
                    "Conversation {:?} with {} failed: {}; closing connection",
                    opcode, self.addr, e
                );
                !e.is_fatal_for_connection()
            }
        }
    }
}
