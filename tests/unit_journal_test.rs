use parley::core::journal::{Journal, Record};
use parley::core::protocol::RecipientType;
use tempfile::TempDir;

fn journal_path(dir: &TempDir) -> String {
    dir.path()
        .join("test.chatjournal")
        .to_string_lossy()
        .into_owned()
}

#[tokio::test]
async fn test_fresh_journal_is_empty() {
    let dir = TempDir::new().unwrap();
    let mut journal = Journal::open(&journal_path(&dir)).await.unwrap();
    assert!(!journal.has_more());
    assert!(journal.next_record().is_none());
    assert!(!journal.is_invalid());
}

#[tokio::test]
async fn test_append_writes_newline_separated_records() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);

    let mut journal = Journal::open(&path).await.unwrap();
    journal
        .append(&Record::NewUser {
            name: "alice".to_string(),
        })
        .await;
    journal.append(&Record::UpdateId { id: 1 }).await;

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "\nNEW_USER \"alice\"\nUPDATE_ID 1");
}

#[tokio::test]
async fn test_appended_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);

    let records = vec![
        Record::NewUser {
            name: "alice".to_string(),
        },
        Record::NewUser {
            name: "bob".to_string(),
        },
        Record::NewGroup {
            name: "g1".to_string(),
            members: vec!["alice".to_string(), "bob".to_string()],
        },
        Record::UpdateId { id: 1 },
        Record::NewMessage {
            sender: "alice".to_string(),
            recipient_type: RecipientType::User,
            recipient: "bob".to_string(),
            content: "hello there".to_string(),
        },
        Record::DeleteMessage { id: 1 },
    ];

    {
        let mut journal = Journal::open(&path).await.unwrap();
        for entry in &records {
            journal.append(entry).await;
        }
    }

    let mut journal = Journal::open(&path).await.unwrap();
    let mut replayed = Vec::new();
    while journal.has_more() {
        replayed.push(journal.next_record().unwrap());
    }
    assert_eq!(replayed, records);
    assert!(!journal.is_invalid());
}

#[tokio::test]
async fn test_parse_failure_is_terminal() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    std::fs::write(&path, "\nNEW_USER \"alice\"\nEAT_EVERYTHING 12").unwrap();

    let mut journal = Journal::open(&path).await.unwrap();
    assert_eq!(
        journal.next_record(),
        Some(Record::NewUser {
            name: "alice".to_string()
        })
    );

    // The bad record flips the journal to invalid; reads dry up.
    assert!(journal.next_record().is_none());
    assert!(journal.is_invalid());
    assert!(!journal.has_more());

    // Appends are dropped once invalid.
    journal.append(&Record::UpdateId { id: 9 }).await;
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(!contents.contains("UPDATE_ID"));
}

#[tokio::test]
async fn test_truncated_record_is_a_parse_failure() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);
    std::fs::write(&path, "NEW_MESSAGE \"alice\" 0 \"bob\"").unwrap();

    let mut journal = Journal::open(&path).await.unwrap();
    assert!(journal.next_record().is_none());
    assert!(journal.is_invalid());
}

#[tokio::test]
async fn test_group_record_round_trips_member_order() {
    let dir = TempDir::new().unwrap();
    let path = journal_path(&dir);

    let entry = Record::NewGroup {
        name: "team".to_string(),
        members: vec![
            "carol".to_string(),
            "alice".to_string(),
            "bob".to_string(),
        ],
    };
    {
        let mut journal = Journal::open(&path).await.unwrap();
        journal.append(&entry).await;
    }

    let mut journal = Journal::open(&path).await.unwrap();
    assert_eq!(journal.next_record(), Some(entry));
    assert!(!journal.has_more());
}
