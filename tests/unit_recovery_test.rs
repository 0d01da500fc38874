use parley::core::journal::{Journal, recovery};
use parley::core::protocol::RecipientType;
use parley::core::store::{Message, Recipient, Store};
use tempfile::TempDir;

fn journal_path(dir: &TempDir) -> String {
    dir.path()
        .join("recovery.chatjournal")
        .to_string_lossy()
        .into_owned()
}

async fn reopened_store(path: &str) -> Store {
    let mut store = Store::new(Journal::open(path).await.unwrap());
    recovery::replay(&mut store);
    store
}

#[tokio::test]
async fn test_replay_rebuilds_users_groups_messages_and_counter() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);

    {
        let mut store = Store::new(Journal::open(&path).await.unwrap());
        store.add_user("alice").await;
        store.add_user("bob").await;
        store
            .add_group("g1", vec!["alice".to_string(), "bob".to_string()])
            .await;

        let id = store.allocate_id().await;
        store
            .journal_message("alice", RecipientType::User, "bob", "hello")
            .await;
        store.store_message(Message {
            id,
            content: "hello".to_string(),
            sender: "alice".to_string(),
            recipient: Recipient::User("bob".to_string()),
        });
    }

    let store = reopened_store(&path).await;

    assert_eq!(store.users().len(), 2);
    assert_eq!(store.find_user_by_name("alice"), Some(0));
    assert_eq!(store.find_user_by_name("bob"), Some(1));
    // Sessions are not durable: everyone comes back logged out.
    for user in store.users() {
        assert!(!user.logged_in);
        assert_eq!(user.status, "Offline");
        assert_eq!(user.session_id, -1);
    }

    assert_eq!(store.groups().len(), 1);
    assert_eq!(store.group(0).members, vec!["alice", "bob"]);

    assert_eq!(store.messages().len(), 1);
    let message = &store.messages()[0];
    assert_eq!(message.id, 1);
    assert_eq!(message.sender, "alice");
    assert_eq!(message.content, "hello");
    assert_eq!(message.recipient, Recipient::User("bob".to_string()));

    assert_eq!(store.current_id(), 1);
    assert!(!store.journal().is_invalid());
}

#[tokio::test]
async fn test_group_sends_re_expand_across_membership() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    std::fs::write(
        &path,
        "\nNEW_USER \"alice\"\nNEW_USER \"bob\"\nNEW_GROUP \"g1\" 2 \"alice\" \"bob\" \
         \nNEW_MESSAGE \"alice\" 1 \"g1\" \"hi all\"\nUPDATE_ID 1\nUPDATE_ID 2",
    )
    .unwrap();

    let store = reopened_store(&path).await;

    // One stored copy per member, ids landing on the journaled UPDATE_IDs.
    assert_eq!(store.messages().len(), 2);
    assert_eq!(store.messages()[0].id, 1);
    assert_eq!(
        store.messages()[0].recipient,
        Recipient::User("alice".to_string())
    );
    assert_eq!(store.messages()[1].id, 2);
    assert_eq!(
        store.messages()[1].recipient,
        Recipient::User("bob".to_string())
    );
    assert_eq!(store.current_id(), 2);
}

#[tokio::test]
async fn test_deleted_messages_stay_deleted_after_replay() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);

    let (first_id, second_id) = {
        let mut store = Store::new(Journal::open(&path).await.unwrap());
        store.add_user("alice").await;

        let mut ids = Vec::new();
        for content in ["one", "two"] {
            let id = store.allocate_id().await;
            store
                .journal_message("alice", RecipientType::User, "alice", content)
                .await;
            store.store_message(Message {
                id,
                content: content.to_string(),
                sender: "alice".to_string(),
                recipient: Recipient::User("alice".to_string()),
            });
            ids.push(id);
        }
        store.delete_message(0).await;
        (ids[0], ids[1])
    };

    let store = reopened_store(&path).await;
    assert_eq!(store.find_message_by_id(first_id), None);
    assert_eq!(store.find_message_by_id(second_id), Some(0));
    assert_eq!(store.messages()[0].content, "two");
    assert_eq!(store.current_id(), second_id);
}

#[tokio::test]
async fn test_unresolvable_sender_degrades_to_partial_state() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    std::fs::write(
        &path,
        "\nNEW_USER \"alice\"\nNEW_MESSAGE \"ghost\" 0 \"alice\" \"boo\"\nNEW_USER \"bob\"",
    )
    .unwrap();

    let mut store = Store::new(Journal::open(&path).await.unwrap());
    let applied = recovery::replay(&mut store);

    // Recovery stops at the corrupt record; what preceded it is kept.
    assert_eq!(applied, 1);
    assert_eq!(store.users().len(), 1);
    assert!(store.messages().is_empty());
    assert!(store.journal().is_invalid());
}

#[tokio::test]
async fn test_dangling_delete_is_skipped() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    std::fs::write(
        &path,
        "\nNEW_USER \"alice\"\nDELETE_MESSAGE 42\nNEW_USER \"bob\"",
    )
    .unwrap();

    let store = reopened_store(&path).await;
    assert_eq!(store.users().len(), 2);
    assert!(!store.journal().is_invalid());
}

#[tokio::test]
async fn test_counter_stays_monotonic_across_restarts() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);

    let before = {
        let mut store = Store::new(Journal::open(&path).await.unwrap());
        store.add_user("alice").await;
        store.allocate_id().await;
        store.allocate_id().await
    };

    let mut store = reopened_store(&path).await;
    assert_eq!(store.current_id(), before);
    assert!(store.allocate_id().await > before);
}
