// src/core/store/mod.rs

//! The in-memory store of users, groups, and messages, plus the journaled id
//! allocator.
//!
//! Mutating operations journal their record before touching memory. The
//! non-journaling `insert_*`/`set_next_id` entry points exist for recovery
//! replay, which must rebuild the store without writing the file it is
//! reading.

pub mod model;

pub use model::{Group, Message, Recipient, User};

use crate::core::journal::{Journal, Record};
use crate::core::protocol::RecipientType;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug)]
pub struct Store {
    users: Vec<User>,
    groups: Vec<Group>,
    messages: Vec<Message>,
    next_id: i32,
    journal: Journal,
}

impl Store {
    pub fn new(journal: Journal) -> Self {
        Self {
            users: Vec::new(),
            groups: Vec::new(),
            messages: Vec::new(),
            next_id: 0,
            journal,
        }
    }

    // --- lookups ---

    pub fn find_user_by_name(&self, name: &str) -> Option<usize> {
        self.users.iter().position(|u| u.name == name)
    }

    pub fn find_user_by_session(&self, session_id: i32) -> Option<usize> {
        self.users.iter().position(|u| u.session_id == session_id)
    }

    pub fn find_user_by_connection(&self, conn_id: u64) -> Option<usize> {
        self.users.iter().position(|u| u.connection == Some(conn_id))
    }

    pub fn find_group_by_name(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }

    pub fn find_message_by_id(&self, id: i32) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    pub fn user(&self, index: usize) -> &User {
        &self.users[index]
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn group(&self, index: usize) -> &Group {
        &self.groups[index]
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn current_id(&self) -> i32 {
        self.next_id
    }

    /// Returns the user index iff a user holds this session id, is logged in,
    /// and the session is bound to the calling connection. The session id
    /// alone is insufficient: a peer that learns an id cannot act on it from
    /// a different socket.
    pub fn authenticated(&self, session_id: i32, conn_id: u64) -> Option<usize> {
        let index = self.find_user_by_session(session_id)?;
        let user = &self.users[index];
        (user.logged_in && user.connection == Some(conn_id)).then_some(index)
    }

    // --- journaled mutations ---

    /// Bumps the id counter, journals the new value, and returns it. Session
    /// ids and message ids share this counter, which is why it survives
    /// restarts.
    pub async fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.journal
            .append(&Record::UpdateId {
                id: self.next_id as u32,
            })
            .await;
        self.next_id
    }

    pub async fn add_user(&mut self, name: &str) {
        self.journal
            .append(&Record::NewUser {
                name: name.to_string(),
            })
            .await;
        self.users.push(User::new(name));
    }

    pub async fn add_group(&mut self, name: &str, members: Vec<String>) {
        self.journal
            .append(&Record::NewGroup {
                name: name.to_string(),
                members: members.clone(),
            })
            .await;
        self.groups.push(Group {
            name: name.to_string(),
            members,
        });
    }

    /// Journals one NEW_MESSAGE record. A group send journals exactly one
    /// record; the per-member fan-out copies are stored by the caller without
    /// further journaling and get re-expanded during replay.
    pub async fn journal_message(
        &mut self,
        sender: &str,
        recipient_type: RecipientType,
        recipient: &str,
        content: &str,
    ) {
        self.journal
            .append(&Record::NewMessage {
                sender: sender.to_string(),
                recipient_type,
                recipient: recipient.to_string(),
                content: content.to_string(),
            })
            .await;
    }

    pub fn store_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Journals the deletion, then removes the message.
    pub async fn delete_message(&mut self, index: usize) {
        let id = self.messages[index].id;
        self.journal
            .append(&Record::DeleteMessage { id: id as u32 })
            .await;
        self.messages.remove(index);
    }

    // --- session transitions (not journaled; sessions are not durable) ---

    pub fn login_user(&mut self, index: usize, session_id: i32, conn_id: u64) {
        let user = &mut self.users[index];
        user.status = "Online".to_string();
        user.logged_in = true;
        user.session_id = session_id;
        user.connection = Some(conn_id);
        user.last_heartbeat = now_secs();
    }

    pub fn logout_user(&mut self, index: usize) {
        let user = &mut self.users[index];
        user.status = "Offline".to_string();
        user.logged_in = false;
        user.session_id = -1;
        user.connection = None;
        user.last_heartbeat = 0;
    }

    pub fn set_user_status(&mut self, index: usize, status: &str) {
        self.users[index].status = status.to_string();
    }

    /// Stamps the vestigial per-user heartbeat field. The liveness table is
    /// what pruning actually consults.
    pub fn touch_user(&mut self, index: usize) {
        self.users[index].last_heartbeat = now_secs();
    }

    // --- replay-only entry points ---

    pub(crate) fn journal_mut(&mut self) -> &mut Journal {
        &mut self.journal
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub(crate) fn insert_user(&mut self, user: User) {
        self.users.push(user);
    }

    pub(crate) fn insert_group(&mut self, group: Group) {
        self.groups.push(group);
    }

    pub(crate) fn insert_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn remove_message(&mut self, index: usize) {
        self.messages.remove(index);
    }

    pub(crate) fn set_next_id(&mut self, id: i32) {
        self.next_id = id;
    }

    /// Advances the counter without journaling; replay uses this when
    /// re-expanding a group send, whose UPDATE_ID records follow in the file.
    pub(crate) fn bump_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}
