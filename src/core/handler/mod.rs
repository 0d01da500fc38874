// src/core/handler/mod.rs

//! The protocol engine: one handler per opcode.
//!
//! Each handler owns a TCP conversation. It reads the opcode's fields (every
//! read bounded by the per-read timeout), validates, mutates the store
//! (journaling first), and writes a status byte plus any response payload. A
//! timeout or EOF mid-conversation aborts the handler without a response;
//! prior writes in the same conversation are not rolled back.

mod directory;
mod messaging;
mod session;

use crate::core::ChatError;
use crate::core::protocol::{Opcode, Status, io};
use crate::core::state::ServerState;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// What the connection loop should do after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    Continue,
    Close,
}

/// One opcode's worth of request/response exchange on a connection.
pub struct Conversation<'a> {
    stream: &'a mut TcpStream,
    pub state: Arc<ServerState>,
    pub conn_id: u64,
    read_timeout: Duration,
}

impl<'a> Conversation<'a> {
    pub fn new(stream: &'a mut TcpStream, state: Arc<ServerState>, conn_id: u64) -> Self {
        let read_timeout = state.read_timeout();
        Self {
            stream,
            state,
            conn_id,
            read_timeout,
        }
    }

    pub async fn read_u8(&mut self) -> Result<u8, ChatError> {
        io::read_u8(self.stream, self.read_timeout).await
    }

    pub async fn read_i32(&mut self) -> Result<i32, ChatError> {
        io::read_i32(self.stream, self.read_timeout).await
    }

    pub async fn read_u32(&mut self) -> Result<u32, ChatError> {
        io::read_u32(self.stream, self.read_timeout).await
    }

    pub async fn read_string(&mut self) -> Result<String, ChatError> {
        io::read_string(self.stream, self.read_timeout).await
    }

    pub async fn read_unframed_string(&mut self) -> Result<String, ChatError> {
        io::read_unframed_string(self.stream, self.read_timeout).await
    }

    pub async fn write_status(&mut self, status: Status) -> Result<(), ChatError> {
        io::write_status(self.stream, status).await
    }

    pub async fn write_i32(&mut self, value: i32) -> Result<(), ChatError> {
        io::write_i32(self.stream, value).await
    }

    pub async fn write_u32(&mut self, value: u32) -> Result<(), ChatError> {
        io::write_u32(self.stream, value).await
    }

    pub async fn write_string(&mut self, value: &str) -> Result<(), ChatError> {
        io::write_string(self.stream, value).await
    }
}

/// Routes one opcode to its handler.
pub async fn dispatch(
    opcode: Opcode,
    conversation: &mut Conversation<'_>,
) -> Result<NextAction, ChatError> {
    debug!("Dispatching opcode {:?}", opcode);
    match opcode {
        Opcode::SendMessage => messaging::send_message(conversation).await?,
        Opcode::DeleteMessage => messaging::delete_message(conversation).await?,
        Opcode::GetMessages => messaging::get_messages(conversation).await?,
        Opcode::GetUsers => directory::get_users(conversation).await?,
        Opcode::SetStatus => session::set_status(conversation).await?,
        Opcode::Login => session::login(conversation).await?,
        Opcode::Logout => session::logout(conversation).await?,
        Opcode::Register => session::register(conversation).await?,
        Opcode::Goodbye => return goodbye(conversation),
        Opcode::Heartbeat => heartbeat(conversation).await?,
        Opcode::GetGroups => directory::get_groups(conversation).await?,
        Opcode::RegisterGroup => directory::register_group(conversation).await?,
    }
    Ok(NextAction::Continue)
}

/// HEARTBEAT: refresh this connection's liveness timestamp.
async fn heartbeat(conversation: &mut Conversation<'_>) -> Result<(), ChatError> {
    let tracked = conversation
        .state
        .liveness
        .touch(conversation.conn_id);
    if tracked {
        conversation.write_status(Status::Success).await
    } else {
        warn!(
            "Heartbeat from untracked connection {}",
            conversation.conn_id
        );
        conversation.write_status(Status::InvalidRequest).await
    }
}

/// GOODBYE: untrack the connection and close it. No status byte is sent.
fn goodbye(conversation: &mut Conversation<'_>) -> Result<NextAction, ChatError> {
    conversation.state.liveness.remove(conversation.conn_id);
    debug!("Connection {} said goodbye", conversation.conn_id);
    Ok(NextAction::Close)
}
