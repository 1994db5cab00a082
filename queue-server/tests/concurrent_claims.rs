//! 并发正确性测试
//!
//! The properties that motivate the per-queue serialization lock:
//! - N concurrent claims yield exactly {1..N}, no duplicates, no gaps
//! - at most one ticket per queue is ever `serving`
//! - reset is all-or-nothing relative to racing claims

use std::collections::HashSet;

use queue_server::db::DbService;
use queue_server::db::repository::{queue, ticket};
use shared::models::TicketStatus;
use tempfile::TempDir;

const CLAIMS: usize = 25;

async fn test_db() -> (TempDir, DbService) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("queue.db");
    let db = DbService::new(path.to_str().unwrap())
        .await
        .expect("db init");
    (dir, db)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_claims_get_unique_gapless_numbers() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Stress").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..CLAIMS {
        let db = db.clone();
        let token = q.token.clone();
        let queue_id = q.id;
        handles.push(tokio::spawn(async move {
            ticket::claim(
                &db,
                queue_id,
                &format!("Holder {i}"),
                &format!("SV{i:03}"),
                &token,
            )
            .await
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let t = handle.await.unwrap().expect("claim succeeds");
        assert!(numbers.insert(t.number), "duplicate number {}", t.number);
    }

    // Exactly {1..N}: unique + bounds ⇒ gapless
    assert_eq!(numbers.len(), CLAIMS);
    assert_eq!(*numbers.iter().min().unwrap(), 1);
    assert_eq!(*numbers.iter().max().unwrap(), CLAIMS as i64);

    let after = queue::find_by_id(&db.pool, q.id).await.unwrap().unwrap();
    assert_eq!(after.last_number, CLAIMS as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_call_next_keeps_single_serving_invariant() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Stress2").await.unwrap();

    for i in 0..10 {
        ticket::claim(&db, q.id, "Holder", &format!("SV{i:03}"), &q.token)
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..10 {
        let db = db.clone();
        let queue_id = q.id;
        handles.push(tokio::spawn(
            async move { ticket::call_next(&db, queue_id, None).await },
        ));
    }

    let mut promoted = HashSet::new();
    for handle in handles {
        let outcome = handle.await.unwrap().expect("call-next succeeds");
        assert!(
            promoted.insert(outcome.ticket.id),
            "two calls promoted the same ticket"
        );
    }
    assert_eq!(promoted.len(), 10);

    // Exactly one ticket remains serving; the rest were auto-resolved
    let tickets = queue::find_tickets(&db.pool, q.id).await.unwrap();
    let serving: Vec<_> = tickets
        .iter()
        .filter(|t| t.status == TicketStatus::Serving)
        .collect();
    assert_eq!(serving.len(), 1);
    assert_eq!(
        tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Done)
            .count(),
        9
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn claims_racing_reset_never_see_partial_state() {
    let (_dir, db) = test_db().await;
    let q = queue::create(&db.pool, "Stress3").await.unwrap();

    for i in 0..5 {
        ticket::claim(&db, q.id, "Holder", &format!("SV{i:03}"), &q.token)
            .await
            .unwrap();
    }

    let mut claims = Vec::new();
    for i in 0..10 {
        let db = db.clone();
        let token = q.token.clone();
        let queue_id = q.id;
        claims.push(tokio::spawn(async move {
            ticket::claim(&db, queue_id, "Racer", &format!("RC{i:03}"), &token).await
        }));
    }

    let reset = {
        let db = db.clone();
        let queue_id = q.id;
        tokio::spawn(async move { queue::reset(&db, queue_id).await })
    };

    for claim in claims {
        claim.await.unwrap().expect("racing claim succeeds");
    }
    reset.await.unwrap().expect("reset succeeds");

    // Whatever the interleaving, the surviving tickets are the ones claimed
    // after the reset committed: gapless numbering from 1, no orphans of the
    // pre-reset set
    let tickets = queue::find_tickets(&db.pool, q.id).await.unwrap();
    let numbers: Vec<i64> = tickets.iter().map(|t| t.number).collect();
    let expected: Vec<i64> = (1..=numbers.len() as i64).collect();
    assert_eq!(numbers, expected, "post-reset ticket set is not gapless");
}
