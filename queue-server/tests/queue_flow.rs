//! 队列全流程集成测试
//!
//! Exercises the sequencer, lifecycle engine and queue control operations
//! through the full DbService init path (real SQLite file, migrations).

use queue_server::db::DbService;
use queue_server::db::repository::{RepoError, account, call_log, queue, ticket};
use shared::models::{GUEST_CANCEL_REASON, TicketStatus};
use tempfile::TempDir;

async fn test_db() -> (TempDir, DbService) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("queue.db");
    let db = DbService::new(path.to_str().unwrap())
        .await
        .expect("db init");
    (dir, db)
}

async fn serving_count(db: &DbService, queue_id: i64) -> usize {
    queue::find_tickets(&db.pool, queue_id)
        .await
        .unwrap()
        .iter()
        .filter(|t| t.status == TicketStatus::Serving)
        .count()
}

#[tokio::test]
async fn claim_call_complete_flow() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Desk A").await.unwrap();
    assert!(q.is_open);
    assert_eq!(q.last_number, 0);

    // First claim gets #1, pending
    let t1 = ticket::claim(&db, q.id, "Alice", "SV001", &q.token)
        .await
        .unwrap();
    assert_eq!(t1.number, 1);
    assert_eq!(t1.status, TicketStatus::Pending);
    assert!(t1.called_at.is_none());

    // Call next promotes #1 to serving
    let called = ticket::call_next(&db, q.id, None).await.unwrap();
    assert_eq!(called.ticket.id, t1.id);
    assert_eq!(called.ticket.status, TicketStatus::Serving);
    assert!(called.ticket.called_at.is_some());
    assert!(called.resolved.is_none());

    // Second claim gets #2
    let t2 = ticket::claim(&db, q.id, "Bob", "SV002", &q.token)
        .await
        .unwrap();
    assert_eq!(t2.number, 2);

    // Resolve #1 as done
    let done = ticket::update_status(&db, t1.id, None, TicketStatus::Done, None)
        .await
        .unwrap();
    assert_eq!(done.status, TicketStatus::Done);
    assert!(done.finished_at.is_some());

    // Terminal law: repeating the update fails and changes nothing
    let err = ticket::update_status(&db, t1.id, None, TicketStatus::Done, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidTransition(_)));
    let unchanged = ticket::find_by_id(&db.pool, t1.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, TicketStatus::Done);
    assert_eq!(unchanged.finished_at, done.finished_at);

    // Call next now yields #2
    let called2 = ticket::call_next(&db, q.id, None).await.unwrap();
    assert_eq!(called2.ticket.id, t2.id);
    assert_eq!(serving_count(&db, q.id).await, 1);

    // last_number tracked the claims
    let q = queue::find_by_id(&db.pool, q.id).await.unwrap().unwrap();
    assert_eq!(q.last_number, 2);
}

#[tokio::test]
async fn rejected_claims_consume_no_number() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Desk B").await.unwrap();

    // Wrong token
    let err = ticket::claim(&db, q.id, "Eve", "SV666", "not-the-token")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Unauthorized));

    // Empty token always fails, even if the stored token were empty
    let err = ticket::claim(&db, q.id, "Eve", "SV666", "").await.unwrap_err();
    assert!(matches!(err, RepoError::Unauthorized));

    // Unknown queue
    let err = ticket::claim(&db, 9999, "Eve", "SV666", &q.token)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));

    // The failed attempts did not consume a number
    let t = ticket::claim(&db, q.id, "Alice", "SV001", &q.token)
        .await
        .unwrap();
    assert_eq!(t.number, 1);
}

#[tokio::test]
async fn closed_queue_rejects_claims_and_reopen_keeps_numbering() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Desk C").await.unwrap();

    let t1 = ticket::claim(&db, q.id, "Alice", "SV001", &q.token)
        .await
        .unwrap();
    assert_eq!(t1.number, 1);

    queue::update(&db.pool, q.id, None, Some(false)).await.unwrap();
    let err = ticket::claim(&db, q.id, "Bob", "SV002", &q.token)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Closed));

    // Reopen: claims resume from the existing sequence, no renumbering
    queue::update(&db.pool, q.id, None, Some(true)).await.unwrap();
    let t2 = ticket::claim(&db, q.id, "Bob", "SV002", &q.token)
        .await
        .unwrap();
    assert_eq!(t2.number, 2);
}

#[tokio::test]
async fn rotate_token_invalidates_old_claim_links() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Desk D").await.unwrap();
    let old_token = q.token.clone();

    ticket::claim(&db, q.id, "Alice", "SV001", &old_token)
        .await
        .unwrap();

    let rotated = queue::rotate_token(&db.pool, q.id).await.unwrap();
    assert_ne!(rotated.token, old_token);

    // Pre-rotation token no longer authorizes
    let err = ticket::claim(&db, q.id, "Bob", "SV002", &old_token)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Unauthorized));

    // New token continues the sequence
    let t2 = ticket::claim(&db, q.id, "Bob", "SV002", &rotated.token)
        .await
        .unwrap();
    assert_eq!(t2.number, 2);

    // Rotation did not touch ticket history
    assert_eq!(queue::find_tickets(&db.pool, q.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn guest_cancel_maps_to_skipped_with_fixed_reason() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Desk E").await.unwrap();
    let t = ticket::claim(&db, q.id, "Alice", "SV001", &q.token)
        .await
        .unwrap();

    // Wrong token is rejected before any state change
    let err = ticket::guest_cancel(&db, t.id, "bogus").await.unwrap_err();
    assert!(matches!(err, RepoError::Unauthorized));

    let cancelled = ticket::guest_cancel(&db, t.id, &q.token).await.unwrap();
    assert_eq!(cancelled.status, TicketStatus::Skipped);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some(GUEST_CANCEL_REASON));
    assert!(cancelled.finished_at.is_some());

    // Terminal law applies to guest cancel too
    let err = ticket::guest_cancel(&db, t.id, &q.token).await.unwrap_err();
    assert!(matches!(err, RepoError::InvalidTransition(_)));

    // Guest action is logged without a staff id
    let log = call_log::find_by_ticket(&db.pool, t.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, "skip");
    assert_eq!(log[0].staff_id, None);
    assert_eq!(log[0].note.as_deref(), Some(GUEST_CANCEL_REASON));
}

#[tokio::test]
async fn call_next_auto_resolves_lingering_serving_ticket() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Desk F").await.unwrap();
    let t1 = ticket::claim(&db, q.id, "Alice", "SV001", &q.token)
        .await
        .unwrap();
    let t2 = ticket::claim(&db, q.id, "Bob", "SV002", &q.token)
        .await
        .unwrap();

    let first = ticket::call_next(&db, q.id, None).await.unwrap();
    assert_eq!(first.ticket.id, t1.id);

    // Calling again without resolving #1: #1 is auto-resolved to done
    let second = ticket::call_next(&db, q.id, None).await.unwrap();
    assert_eq!(second.ticket.id, t2.id);
    let resolved = second.resolved.expect("previous serving ticket resolved");
    assert_eq!(resolved.id, t1.id);
    assert_eq!(resolved.status, TicketStatus::Done);

    assert_eq!(serving_count(&db, q.id).await, 1);
}

#[tokio::test]
async fn call_next_on_empty_queue_fails() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Desk G").await.unwrap();

    let err = ticket::call_next(&db, q.id, None).await.unwrap_err();
    assert!(matches!(err, RepoError::EmptyQueue));

    let err = ticket::call_next(&db, 4242, None).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}

#[tokio::test]
async fn staff_attribution_is_best_effort() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Desk H").await.unwrap();
    let staff = account::create(&db.pool, "desk1", "s3cret", "Front Desk")
        .await
        .unwrap();

    ticket::claim(&db, q.id, "Alice", "SV001", &q.token)
        .await
        .unwrap();
    ticket::claim(&db, q.id, "Bob", "SV002", &q.token)
        .await
        .unwrap();

    // Known account is attached
    let first = ticket::call_next(&db, q.id, Some(staff.id)).await.unwrap();
    assert_eq!(first.ticket.served_by, Some(staff.id));
    let log = call_log::find_by_ticket(&db.pool, first.ticket.id)
        .await
        .unwrap();
    assert_eq!(log[0].action, "call");
    assert_eq!(log[0].staff_id, Some(staff.id));

    // Unknown account degrades to anonymous instead of failing
    let second = ticket::call_next(&db, q.id, Some(99999)).await.unwrap();
    assert_eq!(second.ticket.served_by, None);
    let log = call_log::find_by_ticket(&db.pool, second.ticket.id)
        .await
        .unwrap();
    assert_eq!(log.last().unwrap().staff_id, None);
}

#[tokio::test]
async fn reset_purges_tickets_and_restarts_numbering() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Desk I").await.unwrap();
    for i in 0..3 {
        ticket::claim(&db, q.id, "Holder", &format!("SV{i:03}"), &q.token)
            .await
            .unwrap();
    }
    let called = ticket::call_next(&db, q.id, None).await.unwrap();

    let after = queue::reset(&db, q.id).await.unwrap();
    assert_eq!(after.last_number, 0);
    assert!(queue::find_tickets(&db.pool, q.id).await.unwrap().is_empty());

    // Cascade removed the call log of the purged tickets
    let log = call_log::find_by_ticket(&db.pool, called.ticket.id)
        .await
        .unwrap();
    assert!(log.is_empty());

    // Numbering restarts at 1
    let t = ticket::claim(&db, q.id, "Alice", "SV001", &q.token)
        .await
        .unwrap();
    assert_eq!(t.number, 1);
}

#[tokio::test]
async fn delete_queue_cascades_to_tickets() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Desk J").await.unwrap();
    let t = ticket::claim(&db, q.id, "Alice", "SV001", &q.token)
        .await
        .unwrap();

    queue::delete(&db, q.id).await.unwrap();

    assert!(queue::find_by_id(&db.pool, q.id).await.unwrap().is_none());
    assert!(ticket::find_by_id(&db.pool, t.id).await.unwrap().is_none());

    let err = queue::delete(&db, q.id).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}

#[tokio::test]
async fn update_status_rejects_non_terminal_target() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Desk K").await.unwrap();
    let t = ticket::claim(&db, q.id, "Alice", "SV001", &q.token)
        .await
        .unwrap();

    let err = ticket::update_status(&db, t.id, None, TicketStatus::Serving, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));

    // Pending tickets can be skipped directly (never called)
    let skipped = ticket::update_status(&db, t.id, None, TicketStatus::Skipped, Some("no-show"))
        .await
        .unwrap();
    assert_eq!(skipped.status, TicketStatus::Skipped);
    assert_eq!(skipped.cancel_reason.as_deref(), Some("no-show"));
}
