use parley::core::journal::Journal;
use parley::core::protocol::RecipientType;
use parley::core::store::{Message, Recipient, Store};
use tempfile::TempDir;

async fn fresh_store(dir: &TempDir) -> Store {
    let path = dir
        .path()
        .join("store.chatjournal")
        .to_string_lossy()
        .into_owned();
    Store::new(Journal::open(&path).await.unwrap())
}

#[tokio::test]
async fn test_add_user_and_lookups() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir).await;

    store.add_user("alice").await;
    store.add_user("bob").await;

    assert_eq!(store.find_user_by_name("alice"), Some(0));
    assert_eq!(store.find_user_by_name("bob"), Some(1));
    assert_eq!(store.find_user_by_name("carol"), None);

    let alice = store.user(0);
    assert_eq!(alice.status, "Offline");
    assert!(!alice.logged_in);
    assert_eq!(alice.session_id, -1);
}

#[tokio::test]
async fn test_id_allocation_is_monotonic() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir).await;

    assert_eq!(store.allocate_id().await, 1);
    assert_eq!(store.allocate_id().await, 2);
    assert_eq!(store.allocate_id().await, 3);
    assert_eq!(store.current_id(), 3);
}

#[tokio::test]
async fn test_login_binds_session_to_connection() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir).await;
    store.add_user("alice").await;

    let session_id = store.allocate_id().await;
    store.login_user(0, session_id, 7);

    let alice = store.user(0);
    assert!(alice.logged_in);
    assert_eq!(alice.status, "Online");
    assert_eq!(alice.session_id, session_id);
    assert_eq!(alice.connection, Some(7));

    // The session id alone is not enough; the socket must match.
    assert_eq!(store.authenticated(session_id, 7), Some(0));
    assert_eq!(store.authenticated(session_id, 8), None);
    assert_eq!(store.authenticated(session_id + 1, 7), None);
}

#[tokio::test]
async fn test_logout_clears_every_session_field() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir).await;
    store.add_user("alice").await;

    let session_id = store.allocate_id().await;
    store.login_user(0, session_id, 7);
    store.logout_user(0);

    let alice = store.user(0);
    assert!(!alice.logged_in);
    assert_eq!(alice.status, "Offline");
    assert_eq!(alice.session_id, -1);
    assert_eq!(alice.connection, None);
    assert_eq!(store.authenticated(session_id, 7), None);
}

#[tokio::test]
async fn test_relogin_gets_a_larger_session_id() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir).await;
    store.add_user("alice").await;

    let first = store.allocate_id().await;
    store.login_user(0, first, 7);
    store.logout_user(0);
    let second = store.allocate_id().await;
    store.login_user(0, second, 9);

    assert!(second > first);
    assert_eq!(store.authenticated(second, 9), Some(0));
}

#[tokio::test]
async fn test_distinct_logged_in_users_have_distinct_sessions() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir).await;
    store.add_user("alice").await;
    store.add_user("bob").await;

    let alice_session = store.allocate_id().await;
    store.login_user(0, alice_session, 1);
    let bob_session = store.allocate_id().await;
    store.login_user(1, bob_session, 2);

    assert_ne!(alice_session, bob_session);
    assert_eq!(store.find_user_by_connection(1), Some(0));
    assert_eq!(store.find_user_by_connection(2), Some(1));
}

#[tokio::test]
async fn test_groups_keep_request_order() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir).await;
    store.add_user("alice").await;
    store.add_user("bob").await;

    store
        .add_group("g1", vec!["bob".to_string(), "alice".to_string()])
        .await;

    assert_eq!(store.find_group_by_name("g1"), Some(0));
    assert_eq!(store.group(0).members, vec!["bob", "alice"]);
}

#[tokio::test]
async fn test_delete_message_journals_and_removes() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir).await;
    store.add_user("alice").await;

    let id = store.allocate_id().await;
    store
        .journal_message("alice", RecipientType::User, "alice", "note to self")
        .await;
    store.store_message(Message {
        id,
        content: "note to self".to_string(),
        sender: "alice".to_string(),
        recipient: Recipient::User("alice".to_string()),
    });
    assert_eq!(store.find_message_by_id(id), Some(0));

    store.delete_message(0).await;
    assert_eq!(store.find_message_by_id(id), None);
    assert!(store.messages().is_empty());

    let contents = std::fs::read_to_string(
        dir.path().join("store.chatjournal"),
    )
    .unwrap();
    assert!(contents.contains(&format!("DELETE_MESSAGE {id}")));
}
