// src/core/journal/record.rs

//! The journal's record grammar.
//!
//! Records are whitespace-delimited text, one per line. Strings are
//! double-quoted with no escape mechanism, so user content containing `"` or a
//! newline does not survive a round trip. This is an inherited limitation of
//! the on-disk format.

use crate::core::ChatError;
use crate::core::protocol::RecipientType;

/// One durable state mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    NewUser {
        name: String,
    },
    NewMessage {
        sender: String,
        recipient_type: RecipientType,
        recipient: String,
        content: String,
    },
    DeleteMessage {
        id: u32,
    },
    UpdateId {
        id: u32,
    },
    NewGroup {
        name: String,
        members: Vec<String>,
    },
}

impl Record {
    /// Formats the record exactly as it is written to disk (without the
    /// record-separating newline).
    pub fn render(&self) -> String {
        match self {
            Record::NewUser { name } => format!("NEW_USER \"{name}\""),
            Record::NewMessage {
                sender,
                recipient_type,
                recipient,
                content,
            } => format!(
                "NEW_MESSAGE \"{sender}\" {} \"{recipient}\" \"{content}\"",
                recipient_type.as_u32()
            ),
            Record::DeleteMessage { id } => format!("DELETE_MESSAGE {id}"),
            Record::UpdateId { id } => format!("UPDATE_ID {id}"),
            Record::NewGroup { name, members } => {
                let mut out = format!("NEW_GROUP \"{name}\" {} ", members.len());
                for member in members {
                    out.push('"');
                    out.push_str(member);
                    out.push_str("\" ");
                }
                out
            }
        }
    }
}

/// A cursor over the journal text. Delimiters are all ASCII, so scanning by
/// byte offset is safe on UTF-8 input.
pub(crate) struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(input: &'a str, pos: usize) -> Self {
        Self { input, pos }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn skip_whitespace(&mut self) {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    pub(crate) fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.input.len()
    }

    /// Takes the next whitespace-delimited token.
    fn word(&mut self) -> Result<&'a str, ChatError> {
        self.skip_whitespace();
        let bytes = self.input.as_bytes();
        let start = self.pos;
        while self.pos < bytes.len() && !bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(ChatError::Journal("unexpected end of journal".to_string()));
        }
        Ok(&self.input[start..self.pos])
    }

    /// Takes a double-quoted string. There is no escaping; the string ends at
    /// the next `"`, which may be on a later line.
    fn quoted(&mut self) -> Result<String, ChatError> {
        self.skip_whitespace();
        let bytes = self.input.as_bytes();
        if self.pos >= bytes.len() || bytes[self.pos] != b'"' {
            return Err(ChatError::Journal("expected '\"' to begin string".to_string()));
        }
        self.pos += 1;
        let start = self.pos;
        while self.pos < bytes.len() && bytes[self.pos] != b'"' {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return Err(ChatError::Journal("unterminated string".to_string()));
        }
        let value = self.input[start..self.pos].to_string();
        self.pos += 1;
        Ok(value)
    }

    fn number(&mut self) -> Result<u32, ChatError> {
        let word = self.word()?;
        word.parse::<u32>()
            .map_err(|_| ChatError::Journal(format!("invalid number '{word}'")))
    }

    fn recipient_type(&mut self) -> Result<RecipientType, ChatError> {
        let value = self.number()?;
        u8::try_from(value)
            .ok()
            .and_then(RecipientType::from_u8)
            .ok_or_else(|| ChatError::Journal(format!("invalid recipient type {value}")))
    }

    /// Parses one complete record.
    pub(crate) fn record(&mut self) -> Result<Record, ChatError> {
        let operation = self.word()?;
        match operation {
            "NEW_USER" => Ok(Record::NewUser {
                name: self.quoted()?,
            }),
            "NEW_MESSAGE" => Ok(Record::NewMessage {
                sender: self.quoted()?,
                recipient_type: self.recipient_type()?,
                recipient: self.quoted()?,
                content: self.quoted()?,
            }),
            "DELETE_MESSAGE" => Ok(Record::DeleteMessage { id: self.number()? }),
            "UPDATE_ID" => Ok(Record::UpdateId { id: self.number()? }),
            "NEW_GROUP" => {
                let name = self.quoted()?;
                let count = self.number()?;
                let mut members = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    members.push(self.quoted()?);
                }
                Ok(Record::NewGroup { name, members })
            }
            other => Err(ChatError::Journal(format!(
                "unrecognized journal operation '{other}'"
            ))),
        }
    }
}
