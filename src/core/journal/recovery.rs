// src/core/journal/recovery.rs

//! Startup recovery: drains the journal into the store before the listener
//! accepts its first connection.
//!
//! Replay never journals. A record that fails to parse, or one whose names no
//! longer resolve (which can only mean a corrupt file), stops recovery and
//! flips the journal to invalid; the server starts anyway with whatever was
//! recovered.

use crate::core::journal::Record;
use crate::core::protocol::RecipientType;
use crate::core::store::{Group, Message, Recipient, Store, User};
use tracing::{info, warn};

/// Replays every journal record into the store. Returns the number of records
/// applied.
pub fn replay(store: &mut Store) -> usize {
    let mut applied = 0usize;
    loop {
        let Some(entry) = store.journal_mut().next_record() else {
            break;
        };
        if !apply(store, entry) {
            break;
        }
        applied += 1;
    }

    if store.journal().is_invalid() {
        warn!("Recovery stopped early; continuing with partially recovered state");
    }
    info!("Recovered {applied} journal records");
    applied
}

/// Applies a single record. Returns false when the record proves the file
/// corrupt and recovery must stop.
fn apply(store: &mut Store, entry: Record) -> bool {
    match entry {
        Record::NewUser { name } => {
            store.insert_user(User::new(name));
            true
        }
        Record::UpdateId { id } => {
            store.set_next_id(id as i32);
            true
        }
        Record::NewGroup { name, members } => {
            for member in &members {
                if store.find_user_by_name(member).is_none() {
                    store
                        .journal_mut()
                        .invalidate(&format!("group member \"{member}\" does not resolve"));
                    return false;
                }
            }
            store.insert_group(Group { name, members });
            true
        }
        Record::DeleteMessage { id } => {
            // A group send replayed against changed membership can expand to
            // different ids than the live fan-out did; a dangling deletion is
            // tolerated rather than treated as corruption.
            match store.find_message_by_id(id as i32) {
                Some(index) => store.remove_message(index),
                None => warn!("DELETE_MESSAGE {id} does not match a stored message; skipping"),
            }
            true
        }
        Record::NewMessage {
            sender,
            recipient_type,
            recipient,
            content,
        } => {
            if store.find_user_by_name(&sender).is_none() {
                store
                    .journal_mut()
                    .invalidate(&format!("message sender \"{sender}\" does not resolve"));
                return false;
            }
            match recipient_type {
                RecipientType::User => {
                    if store.find_user_by_name(&recipient).is_none() {
                        store.journal_mut().invalidate(&format!(
                            "message recipient \"{recipient}\" does not resolve"
                        ));
                        return false;
                    }
                    // The UPDATE_ID the original send wrote precedes this
                    // record, so the counter already holds the message id.
                    let id = store.current_id();
                    store.insert_message(Message {
                        id,
                        content,
                        sender,
                        recipient: Recipient::User(recipient),
                    });
                }
                RecipientType::Group => {
                    let Some(index) = store.find_group_by_name(&recipient) else {
                        store.journal_mut().invalidate(&format!(
                            "message recipient group \"{recipient}\" does not resolve"
                        ));
                        return false;
                    };
                    // Re-expand across the group's current membership. The
                    // ids taken here are the ones the UPDATE_ID records that
                    // follow in the file will land on.
                    let members = store.group(index).members.clone();
                    for member in members {
                        let id = store.bump_id();
                        store.insert_message(Message {
                            id,
                            content: content.clone(),
                            sender: sender.clone(),
                            recipient: Recipient::User(member),
                        });
                    }
                }
            }
            true
        }
    }
}
