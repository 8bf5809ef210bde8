//! Integration tests for attempt enumeration.

mod common;

use common::{AttemptBuilder, RepositoryBuilder, TestHarness, CM_ID};
use quizarchiver::model::FileRef;
use quizarchiver::{AttemptEnumerator, AttemptRef};

#[test]
fn test_previews_are_excluded_and_order_is_stable() {
    let repo = RepositoryBuilder::new()
        .user(3, "alice")
        .user(4, "bob")
        .attempt(AttemptBuilder::new(30, 4).build(), 1)
        .attempt(AttemptBuilder::new(21, 3).build(), 1)
        .attempt(AttemptBuilder::new(25, 3).preview().build(), 1)
        .attempt(AttemptBuilder::new(26, 4).in_progress().build(), 1)
        .build();
    let enumerator = AttemptEnumerator::new(&repo);

    assert_eq!(
        enumerator.list_attempts(CM_ID).unwrap(),
        vec![
            AttemptRef {
                attempt_id: 21,
                user_id: 3
            },
            AttemptRef {
                attempt_id: 26,
                user_id: 4
            },
            AttemptRef {
                attempt_id: 30,
                user_id: 4
            },
        ]
    );
    assert!(enumerator.attempt_exists(CM_ID, 26).unwrap());
    assert!(!enumerator.attempt_exists(CM_ID, 25).unwrap());
    assert!(enumerator.list_attempts(999).is_err());
}

#[test]
fn test_metadata_carries_user_identity() {
    let repo = RepositoryBuilder::new()
        .user(3, "alice")
        .attempt(AttemptBuilder::new(21, 3).build(), 1)
        .attempt(AttemptBuilder::new(26, 3).in_progress().build(), 1)
        .build();
    let enumerator = AttemptEnumerator::new(&repo);

    let all = enumerator.list_attempts_metadata(CM_ID, None).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].username, "alice");
    assert_eq!(all[0].idnumber, "ID-3");
    assert_eq!(all[0].state, "finished");
    assert_eq!(all[1].state, "inprogress");

    let some = enumerator
        .list_attempts_metadata(CM_ID, Some(&[26, 1000]))
        .unwrap();
    assert_eq!(some.len(), 1);
    assert_eq!(some[0].attemptid, 26);
}

#[test]
fn test_attachments_are_listed_by_slot() {
    let harness = TestHarness::new();
    let first = harness.put_file(
        &FileRef::new(42, "question", "response_attachments", 1, "/", "a.pdf"),
        b"a",
    );
    let second = harness.put_file(
        &FileRef::new(42, "question", "response_attachments", 2, "/", "b.pdf"),
        b"bb",
    );
    let third = harness.put_file(
        &FileRef::new(42, "question", "response_attachments", 3, "/", "c.png"),
        b"ccc",
    );

    let repo = RepositoryBuilder::new()
        .user(3, "alice")
        .attempt(AttemptBuilder::new(21, 3).build(), 3)
        .attachment(21, 3, third)
        .attachment(21, 1, first)
        .attachment(21, 1, second)
        .build();

    let attachments = AttemptEnumerator::new(&repo).list_attachments(21).unwrap();
    let listed: Vec<(u32, &str)> = attachments
        .iter()
        .map(|a| (a.slot, a.file.reference.filename.as_str()))
        .collect();
    assert_eq!(listed, vec![(1, "a.pdf"), (1, "b.pdf"), (3, "c.png")]);
    assert_eq!(attachments[2].file.mimetype, "image/png");
}
