// src/core/protocol/wire.rs

//! Byte-level vocabulary of the protocol.
//!
//! Framing, top to bottom: a 1-byte opcode, 4-byte little-endian integers,
//! length-prefixed strings (4-byte little-endian length, then UTF-8 bytes, no
//! terminator), and a 1-byte status. A few opcodes read an *unframed* string
//! whose length is whatever a single receive returns; see the handlers.

use crate::core::ChatError;

/// Size of the receive buffer for unframed reads. Unframed names are capped at
/// one byte less, mirroring the NUL terminator slot of the original protocol.
pub const RECV_BUFFER_SIZE: usize = 4096;

/// One byte on the wire, sent by the client to open a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    SendMessage = 0,
    DeleteMessage = 1,
    GetMessages = 2,
    GetUsers = 3,
    SetStatus = 4,
    Login = 5,
    Logout = 6,
    Register = 7,
    Goodbye = 8,
    Heartbeat = 9,
    GetGroups = 10,
    RegisterGroup = 11,
}

impl TryFrom<u8> for Opcode {
    type Error = ChatError;

    fn try_from(value: u8) -> Result<Self, ChatError> {
        match value {
            0 => Ok(Opcode::SendMessage),
            1 => Ok(Opcode::DeleteMessage),
            2 => Ok(Opcode::GetMessages),
            3 => Ok(Opcode::GetUsers),
            4 => Ok(Opcode::SetStatus),
            5 => Ok(Opcode::Login),
            6 => Ok(Opcode::Logout),
            7 => Ok(Opcode::Register),
            8 => Ok(Opcode::Goodbye),
            9 => Ok(Opcode::Heartbeat),
            10 => Ok(Opcode::GetGroups),
            11 => Ok(Opcode::RegisterGroup),
            other => Err(ChatError::UnknownOpcode(other)),
        }
    }
}

/// The per-opcode status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Success = 0,
    InvalidRequest = 1,
    Unauthorized = 2,
}

/// Tag selecting the recipient table for SEND_MESSAGE and journal records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecipientType {
    User = 0,
    Group = 1,
}

impl RecipientType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RecipientType::User),
            1 => Some(RecipientType::Group),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_values_are_stable() {
        assert_eq!(Opcode::try_from(0).unwrap(), Opcode::SendMessage);
        assert_eq!(Opcode::try_from(7).unwrap(), Opcode::Register);
        assert_eq!(Opcode::try_from(11).unwrap(), Opcode::RegisterGroup);
        assert!(matches!(
            Opcode::try_from(12),
            Err(ChatError::UnknownOpcode(12))
        ));
    }

    #[test]
    fn recipient_type_round_trips() {
        assert_eq!(RecipientType::from_u8(0), Some(RecipientType::User));
        assert_eq!(RecipientType::from_u8(1), Some(RecipientType::Group));
        assert_eq!(RecipientType::from_u8(2), None);
        assert_eq!(RecipientType::Group.as_u32(), 1);
    }
}
