mod common;

use agora_core::{
    CivicContext, CivicError, FixedClock, IdentityLedger, LifecycleManager, StoredGazette,
};
use agora_storage::{AgentStore, GazetteStore, QueryWindow};
use agora_types::{Agent, BillId, BillStatus, CivicPolicy, GazetteEntryType, VoteValue};
use chrono::Duration;
use common::faulty::FaultyStorage;
use common::{t0, Harness};
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn proposal_opens_house_vote_and_rewards_proposer() {
    let h = Harness::new();
    let proposer = h.citizen("agent-a", 12).await;

    let receipt = h
        .lifecycle
        .propose(&proposer, "Bill X", "Adds a harbour", "Section 1. Build it.")
        .await
        .unwrap();

    assert_eq!(receipt.house_voting_end, t0() + Duration::hours(48));
    let bill = h.lifecycle.get_bill(&receipt.bill_id).await.unwrap();
    assert_eq!(bill.status, BillStatus::HouseVoting);
    assert_eq!(bill.house_window.end - bill.created_at, Duration::hours(48));
    assert_eq!(h.agent(&proposer.id).await.activity_score, 17);

    let proposals: Vec<_> = h
        .gazette()
        .await
        .into_iter()
        .filter(|e| e.entry_type == GazetteEntryType::BillProposed)
        .collect();
    assert_eq!(proposals.len(), 1);
    assert!(proposals[0].title.contains("Bill X"));
}

#[tokio::test]
async fn proposal_requires_standing_and_content() {
    let h = Harness::new();
    let newcomer = h.citizen("newcomer", 9).await;
    let applicant = h.applicant("applicant").await;
    let veteran = h.citizen("veteran", 40).await;

    assert!(matches!(
        h.lifecycle.propose(&newcomer, "T", "S", "F").await,
        Err(CivicError::Forbidden(_))
    ));
    assert!(matches!(
        h.lifecycle.propose(&applicant, "T", "S", "F").await,
        Err(CivicError::Forbidden(_))
    ));
    assert!(matches!(
        h.lifecycle.propose(&veteran, "  ", "S", "F").await,
        Err(CivicError::InvalidInput(_))
    ));
    assert!(h
        .lifecycle
        .list_bills(None, QueryWindow::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn proposal_survives_failed_gazette_and_reward() {
    let storage = Arc::new(FaultyStorage::new());
    let ctx = CivicContext::new(storage.clone(), CivicPolicy::default())
        .with_clock(Arc::new(FixedClock::new(t0())))
        .with_gazette(Arc::new(StoredGazette::new(storage.clone())));
    let identity = IdentityLedger::new(ctx.clone());
    let lifecycle = LifecycleManager::new(ctx);

    let registration = identity.register("drafter", None).await.unwrap();
    identity
        .verify(&registration.claim_code, "https://x.com/drafter/status/1")
        .await
        .unwrap();
    let proposer = identity.authenticate(&registration.credential).await.unwrap();
    assert_eq!(proposer.activity_score, 10);

    storage.fail_gazette.store(true, Ordering::SeqCst);
    storage.fail_activity.store(true, Ordering::SeqCst);
    let attempts = storage.gazette_attempts.load(Ordering::SeqCst);

    let receipt = lifecycle
        .propose(&proposer, "Quiet Act", "Passes without fanfare", "Section 1.")
        .await
        .unwrap();

    let bill = lifecycle.get_bill(&receipt.bill_id).await.unwrap();
    assert_eq!(bill.status, BillStatus::HouseVoting);
    assert_eq!(bill.house_window.end, t0() + Duration::hours(48));
    assert_eq!(storage.gazette_attempts.load(Ordering::SeqCst), attempts + 1);
    assert!(storage
        .list_gazette(QueryWindow::default())
        .await
        .unwrap()
        .iter()
        .all(|e| e.entry_type != GazetteEntryType::BillProposed));
    let stored = storage.get_agent(&proposer.id).await.unwrap().unwrap();
    assert_eq!(stored.activity_score, 10);
}

async fn open_bill(h: &Harness) -> (Agent, BillId) {
    let proposer = h.citizen("proposer", 20).await;
    let bill_id = h
        .lifecycle
        .propose(&proposer, "Tidal Act", "Regulates tides", "Full text")
        .await
        .unwrap()
        .bill_id;
    (proposer, bill_id)
}

async fn floor_vote(h: &Harness, bill_id: &BillId, ballots: &[(&str, VoteValue)]) -> Vec<Agent> {
    let mut voters = Vec::new();
    for (name, value) in ballots {
        let voter = h.citizen(name, 30).await;
        h.lifecycle.cast_vote(&voter, bill_id, *value).await.unwrap();
        voters.push(h.agent(&voter.id).await);
    }
    voters
}

#[tokio::test]
async fn bill_passes_both_chambers() {
    let h = Harness::new();
    let (_, bill_id) = open_bill(&h).await;
    let voters = floor_vote(
        &h,
        &bill_id,
        &[
            ("v-one", VoteValue::Yea),
            ("v-two", VoteValue::Yea),
            ("v-three", VoteValue::Yea),
            ("v-four", VoteValue::Nay),
        ],
    )
    .await;

    h.clock.advance(Duration::hours(47));
    let early = h.lifecycle.evaluate(&bill_id, None).await.unwrap();
    assert!(!early.transitioned);
    assert_eq!(early.status, BillStatus::HouseVoting);

    h.clock.advance(Duration::hours(1));
    let advanced = h.lifecycle.evaluate(&bill_id, None).await.unwrap();
    assert!(advanced.transitioned);
    assert_eq!(advanced.status, BillStatus::SenateVoting);
    let senate_window = h
        .lifecycle
        .get_bill(&bill_id)
        .await
        .unwrap()
        .senate_window
        .unwrap();
    assert_eq!(senate_window.start, t0() + Duration::hours(48));
    assert_eq!(senate_window.end - senate_window.start, Duration::hours(24));

    for senator in &voters[..2] {
        h.lifecycle
            .cast_senate_ballot(senator, &bill_id, VoteValue::Yea)
            .await
            .unwrap();
    }
    assert!(matches!(
        h.lifecycle
            .cast_senate_ballot(&voters[0], &bill_id, VoteValue::Nay)
            .await,
        Err(CivicError::Conflict(_))
    ));

    h.clock.advance(Duration::hours(24));
    let enacted = h.lifecycle.evaluate(&bill_id, None).await.unwrap();
    assert!(enacted.transitioned);
    assert_eq!(enacted.status, BillStatus::Enacted);

    let tally = h.lifecycle.tally(&bill_id).await.unwrap();
    assert_eq!((tally.house.yea, tally.house.nay), (3, 1));
    assert_eq!(tally.senate.yea, 2);

    // Terminal bills never move again.
    h.clock.advance(Duration::hours(100));
    assert!(!h.lifecycle.evaluate(&bill_id, None).await.unwrap().transitioned);
}

#[tokio::test]
async fn house_without_quorum_fails() {
    let h = Harness::new();
    let (_, bill_id) = open_bill(&h).await;
    floor_vote(&h, &bill_id, &[("v-one", VoteValue::Yea), ("v-two", VoteValue::Yea)]).await;

    h.clock.advance(Duration::hours(48));
    let outcome = h.lifecycle.evaluate(&bill_id, None).await.unwrap();
    assert_eq!(outcome.status, BillStatus::Failed);
    assert!(h
        .gazette()
        .await
        .iter()
        .any(|e| e.entry_type == GazetteEntryType::BillFailed));
}

#[tokio::test]
async fn tied_house_vote_fails() {
    let h = Harness::new();
    let (_, bill_id) = open_bill(&h).await;
    floor_vote(
        &h,
        &bill_id,
        &[
            ("v-one", VoteValue::Yea),
            ("v-two", VoteValue::Nay),
            ("v-three", VoteValue::Abstain),
        ],
    )
    .await;

    h.clock.advance(Duration::hours(48));
    assert_eq!(
        h.lifecycle.evaluate(&bill_id, None).await.unwrap().status,
        BillStatus::Failed
    );
}

#[tokio::test]
async fn senate_majority_against_vetoes() {
    let h = Harness::new();
    let (_, bill_id) = open_bill(&h).await;
    let voters = floor_vote(
        &h,
        &bill_id,
        &[
            ("v-one", VoteValue::Yea),
            ("v-two", VoteValue::Yea),
            ("v-three", VoteValue::Yea),
        ],
    )
    .await;
    h.clock.advance(Duration::hours(48));
    h.lifecycle.evaluate(&bill_id, None).await.unwrap();

    h.lifecycle
        .cast_senate_ballot(&voters[0], &bill_id, VoteValue::Yea)
        .await
        .unwrap();
    for senator in &voters[1..] {
        h.lifecycle
            .cast_senate_ballot(senator, &bill_id, VoteValue::Nay)
            .await
            .unwrap();
    }

    h.clock.advance(Duration::hours(24));
    assert_eq!(
        h.lifecycle.evaluate(&bill_id, None).await.unwrap().status,
        BillStatus::Vetoed
    );
}

#[tokio::test]
async fn senate_without_quorum_fails() {
    let h = Harness::new();
    let (_, bill_id) = open_bill(&h).await;
    let voters = floor_vote(
        &h,
        &bill_id,
        &[
            ("v-one", VoteValue::Yea),
            ("v-two", VoteValue::Yea),
            ("v-three", VoteValue::Yea),
        ],
    )
    .await;
    h.clock.advance(Duration::hours(48));
    h.lifecycle.evaluate(&bill_id, None).await.unwrap();
    h.lifecycle
        .cast_senate_ballot(&voters[0], &bill_id, VoteValue::Yea)
        .await
        .unwrap();

    h.clock.advance(Duration::hours(24));
    assert_eq!(
        h.lifecycle.evaluate(&bill_id, None).await.unwrap().status,
        BillStatus::Failed
    );
}

#[tokio::test]
async fn senate_ballots_require_standing() {
    let h = Harness::new();
    let (_, bill_id) = open_bill(&h).await;
    floor_vote(
        &h,
        &bill_id,
        &[
            ("v-one", VoteValue::Yea),
            ("v-two", VoteValue::Yea),
            ("v-three", VoteValue::Yea),
        ],
    )
    .await;

    let junior = h.citizen("junior", 24).await;
    let senior = h.citizen("senior", 25).await;

    // House still open.
    assert!(matches!(
        h.lifecycle
            .cast_senate_ballot(&senior, &bill_id, VoteValue::Yea)
            .await,
        Err(CivicError::Conflict(_))
    ));

    h.clock.advance(Duration::hours(48));
    h.lifecycle.evaluate(&bill_id, None).await.unwrap();
    assert!(matches!(
        h.lifecycle
            .cast_senate_ballot(&junior, &bill_id, VoteValue::Yea)
            .await,
        Err(CivicError::Forbidden(_))
    ));
    h.lifecycle
        .cast_senate_ballot(&senior, &bill_id, VoteValue::Yea)
        .await
        .unwrap();
}

#[tokio::test]
async fn floor_votes_are_single_and_timely() {
    let h = Harness::new();
    let (_, bill_id) = open_bill(&h).await;
    let voter = h.citizen("voter", 0).await;
    let applicant = h.applicant("applicant").await;

    h.lifecycle
        .cast_vote(&voter, &bill_id, VoteValue::Yea)
        .await
        .unwrap();
    assert_eq!(h.agent(&voter.id).await.activity_score, 1);

    assert!(matches!(
        h.lifecycle.cast_vote(&voter, &bill_id, VoteValue::Nay).await,
        Err(CivicError::Conflict(_))
    ));
    assert!(matches!(
        h.lifecycle
            .cast_vote(&applicant, &bill_id, VoteValue::Yea)
            .await,
        Err(CivicError::Forbidden(_))
    ));
    assert!(matches!(
        h.lifecycle
            .cast_vote(&voter, &BillId::generate(), VoteValue::Yea)
            .await,
        Err(CivicError::NotFound(_))
    ));

    h.clock.advance(Duration::hours(48));
    let late = h.citizen("latecomer", 5).await;
    assert!(matches!(
        h.lifecycle.cast_vote(&late, &bill_id, VoteValue::Yea).await,
        Err(CivicError::Conflict(_))
    ));

    let tally = h.lifecycle.tally(&bill_id).await.unwrap();
    assert_eq!(tally.house.total(), 1);
}

#[tokio::test]
async fn stale_expected_status_changes_nothing() {
    let h = Harness::new();
    let (_, bill_id) = open_bill(&h).await;
    h.clock.advance(Duration::hours(48));

    let stale = h
        .lifecycle
        .evaluate(&bill_id, Some(BillStatus::SenateVoting))
        .await
        .unwrap();
    assert!(!stale.transitioned);
    assert_eq!(stale.status, BillStatus::HouseVoting);

    let fresh = h
        .lifecycle
        .evaluate(&bill_id, Some(BillStatus::HouseVoting))
        .await
        .unwrap();
    assert!(fresh.transitioned);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_evaluations_transition_once() {
    let h = Harness::new();
    let (_, bill_id) = open_bill(&h).await;
    h.clock.advance(Duration::hours(48));

    let tasks = (0..16).map(|_| {
        let lifecycle = h.lifecycle.clone();
        tokio::spawn(async move { lifecycle.evaluate(&bill_id, None).await })
    });
    let outcomes: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.transitioned).count(), 1);
    assert!(outcomes.iter().all(|o| o.status == BillStatus::Failed));
    let failures = h
        .gazette()
        .await
        .into_iter()
        .filter(|e| e.entry_type == GazetteEntryType::BillFailed)
        .count();
    assert_eq!(failures, 1);
}

#[tokio::test]
async fn committee_pauses_and_discharge_reopens() {
    let h = Harness::new();
    let (proposer, bill_id) = open_bill(&h).await;
    let outsider = h.citizen("outsider", 30).await;

    assert!(matches!(
        h.lifecycle
            .refer_to_committee(&outsider, &bill_id, "Harbours")
            .await,
        Err(CivicError::Forbidden(_))
    ));
    assert!(matches!(
        h.lifecycle.refer_to_committee(&proposer, &bill_id, " ").await,
        Err(CivicError::InvalidInput(_))
    ));

    let referred = h
        .lifecycle
        .refer_to_committee(&proposer, &bill_id, "Harbours")
        .await
        .unwrap();
    assert_eq!(referred.status, BillStatus::CommitteeReview);
    assert_eq!(referred.committee.as_deref(), Some("Harbours"));

    // Committee review is not on a clock.
    h.clock.advance(Duration::hours(200));
    assert!(!h.lifecycle.evaluate(&bill_id, None).await.unwrap().transitioned);
    assert!(h.lifecycle.evaluate_due().await.unwrap().is_empty());

    let reopened = h
        .lifecycle
        .discharge_from_committee(&proposer, &bill_id, true)
        .await
        .unwrap();
    assert_eq!(reopened.status, BillStatus::HouseVoting);
    assert_eq!(reopened.house_window.start, t0() + Duration::hours(200));
    assert_eq!(
        reopened.house_window.end - reopened.house_window.start,
        Duration::hours(48)
    );

    assert!(matches!(
        h.lifecycle
            .discharge_from_committee(&proposer, &bill_id, false)
            .await,
        Err(CivicError::Conflict(_))
    ));
}

#[tokio::test]
async fn unfavorable_discharge_fails_bill() {
    let h = Harness::new();
    let (proposer, bill_id) = open_bill(&h).await;
    h.lifecycle
        .refer_to_committee(&proposer, &bill_id, "Finance")
        .await
        .unwrap();

    let failed = h
        .lifecycle
        .discharge_from_committee(&proposer, &bill_id, false)
        .await
        .unwrap();
    assert_eq!(failed.status, BillStatus::Failed);
}

#[tokio::test]
async fn evaluate_due_sweeps_closed_windows() {
    let h = Harness::new();
    let (proposer, first) = open_bill(&h).await;
    h.clock.advance(Duration::hours(10));
    let second = h
        .lifecycle
        .propose(&proposer, "Second Act", "s", "t")
        .await
        .unwrap()
        .bill_id;

    h.clock.advance(Duration::hours(40));
    let performed = h.lifecycle.evaluate_due().await.unwrap();
    assert_eq!(performed.len(), 1);
    assert_eq!(performed[0].bill_id, first);

    assert!(h.lifecycle.evaluate_due().await.unwrap().is_empty());

    h.clock.advance(Duration::hours(10));
    let performed = h.lifecycle.evaluate_due().await.unwrap();
    assert_eq!(performed.len(), 1);
    assert_eq!(performed[0].bill_id, second);
}

#[tokio::test]
async fn list_bills_filters_by_status() {
    let h = Harness::new();
    let (proposer, first) = open_bill(&h).await;
    h.clock.advance(Duration::hours(1));
    let second = h
        .lifecycle
        .propose(&proposer, "Second Act", "s", "t")
        .await
        .unwrap()
        .bill_id;
    h.lifecycle
        .refer_to_committee(&proposer, &first, "Rules")
        .await
        .unwrap();

    let all = h
        .lifecycle
        .list_bills(None, QueryWindow::default())
        .await
        .unwrap();
    assert_eq!(
        all.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![second, first]
    );

    let on_floor = h
        .lifecycle
        .list_bills(Some(BillStatus::HouseVoting), QueryWindow::default())
        .await
        .unwrap();
    assert_eq!(on_floor.len(), 1);
    assert_eq!(on_floor[0].id, second);
}
