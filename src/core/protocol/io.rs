// src/core/protocol/io.rs

//! Timeout-bounded read primitives and the matching write primitives.
//!
//! Every read inside a conversation is wrapped in a short timeout. A timeout
//! or EOF aborts the handler mid-conversation without a reply; the peer is
//! considered dropped and the liveness sweep will reclaim the connection.

use super::wire::{RECV_BUFFER_SIZE, Status};
use crate::core::ChatError;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

fn map_io_error(e: std::io::Error) -> ChatError {
    match e.kind() {
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe => {
            ChatError::PeerClosed
        }
        _ => ChatError::Io(e),
    }
}

/// Reads a single byte, bounded by `read_timeout`.
pub async fn read_u8(stream: &mut TcpStream, read_timeout: Duration) -> Result<u8, ChatError> {
    timeout(read_timeout, stream.read_u8())
        .await
        .map_err(|_| ChatError::ReadTimeout)?
        .map_err(map_io_error)
}

/// Reads a 4-byte little-endian signed integer, bounded by `read_timeout`.
pub async fn read_i32(stream: &mut TcpStream, read_timeout: Duration) -> Result<i32, ChatError> {
    timeout(read_timeout, stream.read_i32_le())
        .await
        .map_err(|_| ChatError::ReadTimeout)?
        .map_err(map_io_error)
}

/// Reads a 4-byte little-endian unsigned integer, bounded by `read_timeout`.
pub async fn read_u32(stream: &mut TcpStream, read_timeout: Duration) -> Result<u32, ChatError> {
    timeout(read_timeout, stream.read_u32_le())
        .await
        .map_err(|_| ChatError::ReadTimeout)?
        .map_err(map_io_error)
}

/// Reads a length-prefixed string: a 4-byte little-endian length, then that
/// many bytes of UTF-8. A length larger than the receive buffer is refused
/// before any payload byte is read.
pub async fn read_string(
    stream: &mut TcpStream,
    read_timeout: Duration,
) -> Result<String, ChatError> {
    let length = read_u32(stream, read_timeout).await?;
    if length as usize > RECV_BUFFER_SIZE {
        return Err(ChatError::FieldTooLarge(length));
    }

    let mut payload = vec![0u8; length as usize];
    timeout(read_timeout, stream.read_exact(&mut payload))
        .await
        .map_err(|_| ChatError::ReadTimeout)?
        .map_err(map_io_error)?;

    Ok(String::from_utf8_lossy(&payload).into_owned())
}

/// Reads an *unframed* string: a single receive of up to one buffer's worth of
/// bytes, whose length is whatever arrives first. This mirrors the original
/// framing of REGISTER, LOGIN, and the SET_STATUS payload.
pub async fn read_unframed_string(
    stream: &mut TcpStream,
    read_timeout: Duration,
) -> Result<String, ChatError> {
    let mut buffer = [0u8; RECV_BUFFER_SIZE - 1];
    let n = timeout(read_timeout, stream.read(&mut buffer))
        .await
        .map_err(|_| ChatError::ReadTimeout)?
        .map_err(map_io_error)?;

    if n == 0 {
        return Err(ChatError::PeerClosed);
    }

    Ok(String::from_utf8_lossy(&buffer[..n]).into_owned())
}

/// Writes the status byte of a reply.
pub async fn write_status(stream: &mut TcpStream, status: Status) -> Result<(), ChatError> {
    stream.write_u8(status as u8).await.map_err(map_io_error)
}

/// Writes a 4-byte little-endian signed integer.
pub async fn write_i32(stream: &mut TcpStream, value: i32) -> Result<(), ChatError> {
    stream.write_i32_le(value).await.map_err(map_io_error)
}

/// Writes a 4-byte little-endian unsigned integer.
pub async fn write_u32(stream: &mut TcpStream, value: u32) -> Result<(), ChatError> {
    stream.write_u32_le(value).await.map_err(map_io_error)
}

/// Writes a length-prefixed string.
pub async fn write_string(stream: &mut TcpStream, value: &str) -> Result<(), ChatError> {
    stream
        .write_u32_le(value.len() as u32)
        .await
        .map_err(map_io_error)?;
    stream
        .write_all(value.as_bytes())
        .await
        .map_err(map_io_error)
}
