//! Integration tests for the collaborative session coordinator.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use folio_core::collaboration::{EndMode, LiveChange, LiveOperation, ParticipantRole};
use folio_core::error::CoreError;
use folio_core::types::new_id;
use folio_core::version::ChangeType;
use folio_store::{PublishRepo, SessionOutcome};

use common::{author, coordinator, seeded_store, PATH};

const BASE: &str = "# Overview\nIntro paragraph.\n\n# Usage\nRun it.\n";

fn edit(author_id: &str, section: &str, content: &str) -> LiveChange {
    LiveChange {
        author_id: author_id.to_string(),
        timestamp: Utc::now(),
        operation: LiveOperation::ReplaceSection {
            section: section.to_string(),
            content: content.to_string(),
        },
    }
}

#[tokio::test]
async fn start_seeds_working_copy_from_current_version() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    let session = sessions.start(PATH, author("owner")).await.unwrap();

    let history = store.get_history(PATH).await.unwrap();
    assert_eq!(session.working_copy, BASE);
    assert_eq!(Some(session.base_version_id), history.current_version_id);
    assert_eq!(session.participants[0].role, ParticipantRole::Owner);
    assert_eq!(sessions.list(Some(PATH)).await.len(), 1);
    assert!(sessions.list(Some("other/path")).await.is_empty());
}

#[tokio::test]
async fn start_on_unknown_path_is_not_found() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    assert_matches!(
        sessions.start("missing/path", author("owner")).await,
        Err(CoreError::NotFound { .. })
    );
}

#[tokio::test]
async fn commit_appends_one_draft_with_all_edits() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    let session = sessions.start(PATH, author("owner")).await.unwrap();
    sessions
        .join(session.id, "bob", "Bob", ParticipantRole::Editor)
        .await
        .unwrap();

    sessions
        .apply_change(session.id, edit("owner", "Overview", "Owner intro."))
        .await
        .unwrap();
    sessions
        .apply_change(session.id, edit("bob", "Usage", "Bob usage."))
        .await
        .unwrap();

    let before = store.get_history(PATH).await.unwrap().versions.len();
    let ended = sessions.end(session.id, EndMode::Commit).await.unwrap();

    let version = match ended.outcome {
        SessionOutcome::Committed { version } => version,
        other => panic!("expected commit, got {other:?}"),
    };
    assert!(version.content.contains("Owner intro."));
    assert!(version.content.contains("Bob usage."));
    assert_eq!(version.author.id, "owner");
    assert_eq!(version.changes[0].change_type, ChangeType::Session);
    assert_eq!(store.get_history(PATH).await.unwrap().versions.len(), before + 1);
}

#[tokio::test]
async fn commit_without_changes_discards() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    let session = sessions.start(PATH, author("owner")).await.unwrap();
    let ended = sessions.end(session.id, EndMode::Commit).await.unwrap();
    assert_matches!(ended.outcome, SessionOutcome::Discarded { failure: None, .. });
    assert_eq!(store.get_history(PATH).await.unwrap().versions.len(), 1);
}

#[tokio::test]
async fn discard_leaves_history_and_surfaces_changes() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    let session = sessions.start(PATH, author("owner")).await.unwrap();
    sessions
        .apply_change(session.id, edit("owner", "Usage", "Changed."))
        .await
        .unwrap();

    let ended = sessions.end(session.id, EndMode::Discard).await.unwrap();
    assert_matches!(ended.outcome, SessionOutcome::Discarded { ref unflushed, .. } if unflushed.len() == 1);
    assert_eq!(store.get_history(PATH).await.unwrap().versions.len(), 1);
}

#[tokio::test]
async fn ended_sessions_are_expired_and_unknown_are_not_found() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    let session = sessions.start(PATH, author("owner")).await.unwrap();
    sessions.end(session.id, EndMode::Discard).await.unwrap();

    assert_matches!(
        sessions
            .join(session.id, "bob", "Bob", ParticipantRole::Editor)
            .await,
        Err(CoreError::SessionExpired(_))
    );
    assert_matches!(
        sessions.end(session.id, EndMode::Commit).await,
        Err(CoreError::SessionExpired(_))
    );
    assert_matches!(sessions.get(new_id()).await, Err(CoreError::NotFound { .. }));
    assert_eq!(sessions.active_count().await, 0);
}

#[tokio::test]
async fn non_participant_change_is_rejected() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    let session = sessions.start(PATH, author("owner")).await.unwrap();
    assert_matches!(
        sessions
            .apply_change(session.id, edit("mallory", "Usage", "x"))
            .await,
        Err(CoreError::Validation(_))
    );
}

#[tokio::test]
async fn checkpoint_saves_and_rebases() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    let session = sessions.start(PATH, author("owner")).await.unwrap();
    assert!(sessions.checkpoint(session.id).await.unwrap().is_none());

    sessions
        .apply_change(session.id, edit("owner", "Usage", "Saved."))
        .await
        .unwrap();
    let saved = sessions.checkpoint_all().await;
    assert_eq!(saved.len(), 1);

    let current = sessions.get(session.id).await.unwrap();
    assert!(current.changes.is_empty());
    assert_eq!(current.base_version_id, saved[0].id);
    assert!(current.is_active());

    // Nothing new since the checkpoint, so commit is a discard.
    let ended = sessions.end(session.id, EndMode::Commit).await.unwrap();
    assert_matches!(ended.outcome, SessionOutcome::Discarded { .. });
    assert_eq!(store.get_history(PATH).await.unwrap().versions.len(), 2);
}

#[tokio::test]
async fn stale_sessions_expire_with_unflushed_changes() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    let session = sessions.start(PATH, author("owner")).await.unwrap();
    sessions
        .apply_change(session.id, edit("owner", "Usage", "Pending."))
        .await
        .unwrap();

    assert!(sessions.expire_stale(Duration::hours(1)).await.is_empty());

    let expired = sessions.expire_stale(Duration::seconds(-1)).await;
    assert_eq!(expired.len(), 1);
    assert_matches!(
        &expired[0].outcome,
        SessionOutcome::Discarded { unflushed, .. } if unflushed.len() == 1
    );
    assert_matches!(sessions.get(session.id).await, Err(CoreError::SessionExpired(_)));
    assert_eq!(store.get_history(PATH).await.unwrap().versions.len(), 1);
}

#[tokio::test]
async fn comments_are_recorded() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    let session = sessions.start(PATH, author("owner")).await.unwrap();
    let comment = sessions
        .add_comment(session.id, "owner", Some("Usage".into()), "Add an example")
        .await
        .unwrap();
    let current = sessions.get(session.id).await.unwrap();
    assert_eq!(current.comments, vec![comment]);
}

// ---------------------------------------------------------------------------
// Main line moving under a session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn coexisting_sessions_both_land_their_edits() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    let alice = sessions.start(PATH, author("alice")).await.unwrap();
    let bob = sessions.start(PATH, author("bob")).await.unwrap();
    assert_eq!(alice.base_version_id, bob.base_version_id);

    sessions
        .apply_change(alice.id, edit("alice", "Overview", "Alice intro."))
        .await
        .unwrap();
    sessions
        .apply_change(bob.id, edit("bob", "Usage", "Bob usage."))
        .await
        .unwrap();

    let first = sessions.end(alice.id, EndMode::Commit).await.unwrap();
    let alice_version = match first.outcome {
        SessionOutcome::Committed { version } => version,
        other => panic!("expected commit, got {other:?}"),
    };
    let second = sessions.end(bob.id, EndMode::Commit).await.unwrap();
    let bob_version = match second.outcome {
        SessionOutcome::Committed { version } => version,
        other => panic!("expected commit, got {other:?}"),
    };

    assert_eq!(bob_version.parent_version_id, Some(alice_version.id));
    assert!(bob_version.content.contains("Alice intro."));
    assert!(bob_version.content.contains("Bob usage."));
    assert!(!bob_version.content.contains("Intro paragraph."));

    let history = store.get_history(PATH).await.unwrap();
    assert_eq!(history.versions.len(), 3);
    assert_eq!(history.current_version_id, Some(bob_version.id));
}

#[tokio::test]
async fn checkpoint_after_draft_keeps_the_draft() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    let session = sessions.start(PATH, author("owner")).await.unwrap();
    sessions
        .apply_change(session.id, edit("owner", "Usage", "Session usage."))
        .await
        .unwrap();

    let draft = PublishRepo::save_draft(
        &store,
        PATH,
        "# Overview\nDraft intro.\n\n# Usage\nRun it.\n".to_string(),
        author("editor"),
        None,
    )
    .await
    .unwrap();

    let saved = sessions.checkpoint(session.id).await.unwrap().unwrap();
    assert_eq!(saved.parent_version_id, Some(draft.id));
    assert!(saved.content.contains("Draft intro."));
    assert!(saved.content.contains("Session usage."));

    let rebased = sessions.get(session.id).await.unwrap();
    assert_eq!(rebased.base_version_id, saved.id);
    assert!(rebased.changes.is_empty());
}

#[tokio::test]
async fn commit_matching_the_moved_tip_is_a_discard() {
    let store = seeded_store(BASE);
    let sessions = coordinator(&store);
    let session = sessions.start(PATH, author("owner")).await.unwrap();
    sessions
        .apply_change(session.id, edit("owner", "Usage", "Same words."))
        .await
        .unwrap();
    let draft = PublishRepo::save_draft(
        &store,
        PATH,
        "# Overview\nIntro paragraph.\n\n# Usage\nSame words.\n".to_string(),
        author("editor"),
        None,
    )
    .await
    .unwrap();

    let ended = sessions.end(session.id, EndMode::Commit).await.unwrap();

    assert_matches!(
        ended.outcome,
        SessionOutcome::Discarded { failure: None, .. }
    );
    let history = store.get_history(PATH).await.unwrap();
    assert_eq!(history.current_version_id, Some(draft.id));
}
