// src/core/journal/mod.rs

//! The append-only journal.
//!
//! Every state mutation is written here before it touches the in-memory
//! store, and on startup the recovery driver replays the file to rebuild that
//! store. A parse failure is terminal: the journal flips to an *invalid*
//! state in which reads return nothing and appends are dropped with a logged
//! error, and the server keeps serving whatever state was recovered.

pub mod record;
pub mod recovery;

pub use record::Record;

use crate::core::ChatError;
use record::Scanner;
use std::io::ErrorKind;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

#[derive(Debug)]
pub struct Journal {
    file: File,
    /// Full journal text as of open time; the recovery cursor walks this.
    text: String,
    cursor: usize,
    invalid: bool,
}

impl Journal {
    /// Opens (creating if absent) the journal at `path`. The existing
    /// contents are held for replay; the file handle is kept in append mode
    /// for the life of the process.
    pub async fn open(path: &str) -> Result<Self, ChatError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        info!("Journal file loaded: size is {} bytes", text.len());
        Ok(Self {
            file,
            text,
            cursor: 0,
            invalid: false,
        })
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub(crate) fn invalidate(&mut self, reason: &str) {
        if !self.invalid {
            error!("Invalid journal: {reason}. The server is operating without a journal!");
        }
        self.invalid = true;
    }

    /// True iff any unread record text remains past the recovery cursor.
    pub fn has_more(&mut self) -> bool {
        if self.invalid {
            return false;
        }
        let mut scanner = Scanner::new(&self.text, self.cursor);
        let more = !scanner.at_end();
        // Committing the whitespace skip keeps the cursor cheap to re-check.
        self.cursor = scanner.pos();
        more
    }

    /// Parses the next record, advancing the recovery cursor. Any format
    /// error transitions the journal into the invalid state and returns
    /// `None`.
    pub fn next_record(&mut self) -> Option<Record> {
        if !self.has_more() {
            return None;
        }
        let mut scanner = Scanner::new(&self.text, self.cursor);
        match scanner.record() {
            Ok(parsed) => {
                self.cursor = scanner.pos();
                Some(parsed)
            }
            Err(e) => {
                self.invalidate(&e.to_string());
                None
            }
        }
    }

    /// Appends one record: a record-separating newline, the rendered text,
    /// and a flush. Must only be called once recovery has drained the file.
    pub async fn append(&mut self, entry: &Record) {
        if self.invalid {
            error!("Dropped journal append: the journal is invalid");
            return;
        }
        debug_assert!(
            !self.has_more(),
            "journal append before recovery drained the file"
        );

        let line = format!("\n{}", entry.render());
        if let Err(e) = self.write_and_flush(line.as_bytes()).await {
            self.invalidate(&format!("append failed: {e}"));
        }
    }

    async fn write_and_flush(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.write_all(bytes).await?;
        self.file.flush().await
    }
}
