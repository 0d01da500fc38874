// src/core/errors.rs

//! Defines the primary error type for the entire application.

use thiserror::Error;

/// The main error enum, representing all possible failures within the server.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// An intra-conversation read did not complete within the per-read timeout.
    /// The handler aborts without a response; the connection itself survives
    /// until the liveness sweep reclaims it.
    #[error("Read timed out mid-conversation")]
    ReadTimeout,

    /// The peer closed its end of the connection.
    #[error("Peer closed the connection")]
    PeerClosed,

    /// A length prefix announced more bytes than the receive buffer holds.
    #[error("Declared field length {0} exceeds the receive buffer")]
    FieldTooLarge(u32),

    #[error("Unknown opcode {0}")]
    UnknownOpcode(u8),

    #[error("Journal Error: {0}")]
    Journal(String),
}

impl ChatError {
    /// Errors after which the connection should be torn down rather than
    /// returned to the opcode loop.
    pub fn is_fatal_for_connection(&self) -> bool {
        !matches!(self, ChatError::ReadTimeout)
    }
}
