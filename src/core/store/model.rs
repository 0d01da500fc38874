// src/core/store/model.rs

//! The entities held by the in-memory store: users, groups, and messages.

/// A registered user. The name is the primary identifier across restarts;
/// everything else is session state.
#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    pub status: String,
    pub logged_in: bool,
    /// Server-issued session id, `-1` while logged out.
    pub session_id: i32,
    /// Id of the connection that owns the session, if any.
    pub connection: Option<u64>,
    /// Wall-clock seconds of the last directory refresh. Kept for parity with
    /// the original data model; the liveness table is what pruning consults.
    pub last_heartbeat: u64,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "Offline".to_string(),
            logged_in: false,
            session_id: -1,
            connection: None,
            last_heartbeat: 0,
        }
    }
}

/// A named, immutable list of member usernames. Groups are never mutated
/// after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub members: Vec<String>,
}

/// The destination of a message: a single user or a whole group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    User(String),
    Group { name: String, members: Vec<String> },
}

impl Recipient {
    /// Every username this recipient resolves to, in member order.
    pub fn usernames(&self) -> Vec<String> {
        match self {
            Recipient::User(name) => vec![name.clone()],
            Recipient::Group { members, .. } => members.clone(),
        }
    }

    /// The first resolved username. Deletion authorization compares against
    /// this name.
    pub fn primary_username(&self) -> Option<&str> {
        match self {
            Recipient::User(name) => Some(name),
            Recipient::Group { members, .. } => members.first().map(String::as_str),
        }
    }

    pub fn contains_user(&self, username: &str) -> bool {
        match self {
            Recipient::User(name) => name == username,
            Recipient::Group { members, .. } => members.iter().any(|m| m == username),
        }
    }
}

/// A stored message. Group sends fan out to one `Message` per member, each
/// with its own id and a `Recipient::User` pointing at that member.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: i32,
    pub content: String,
    pub sender: String,
    pub recipient: Recipient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_users_start_offline() {
        let user = User::new("alice");
        assert_eq!(user.status, "Offline");
        assert!(!user.logged_in);
        assert_eq!(user.session_id, -1);
        assert_eq!(user.connection, None);
    }

    #[test]
    fn recipient_usernames_cover_both_variants() {
        let direct = Recipient::User("bob".to_string());
        assert_eq!(direct.usernames(), vec!["bob".to_string()]);
        assert_eq!(direct.primary_username(), Some("bob"));
        assert!(direct.contains_user("bob"));
        assert!(!direct.contains_user("alice"));

        let group = Recipient::Group {
            name: "g1".to_string(),
            members: vec!["alice".to_string(), "bob".to_string()],
        };
        assert_eq!(group.usernames().len(), 2);
        assert_eq!(group.primary_username(), Some("alice"));
        assert!(group.contains_user("bob"));
    }
}
