//! Integration tests for matching rounds.
//!
//! Drives `run_round_with` against in-memory stores and checks the store
//! side effects: availability flips, history inserts, and what happens when a
//! store call fails part-way through.

mod common;

use std::collections::HashSet;

use crate::common::TestHarness;
use chrono::Duration;
use pairing_core::domains::matching::{
    was_recently_matched, FisherYates, RecencyLookupPolicy, RoundStep,
};
use pairing_core::domains::participant::Participant;
use pairing_core::kernel::StoreError;
use test_context::test_context;

// =============================================================================
// Empty rounds
// =============================================================================

/// No candidates or a single candidate: empty outcome, no lookups, no writes.
#[test_context(TestHarness)]
#[tokio::test]
async fn fewer_than_two_candidates_is_an_empty_round(ctx: &TestHarness) {
    let empty = ctx.run_round().await.unwrap();
    assert!(empty.is_empty());

    ctx.add_participants(1);
    let single = ctx.run_round().await.unwrap();

    assert!(single.is_empty());
    assert_eq!(single.eligible_count, 1);
    assert!(ctx.stores.match_history.lookups().is_empty());
    assert_eq!(ctx.write_count(), 0);
    // One listing per round and nothing else
    assert_eq!(ctx.stores.participants.call_count(), 2);
}

/// Two empty rounds in a row both come back empty and write nothing.
#[test_context(TestHarness)]
#[tokio::test]
async fn repeated_empty_rounds_write_nothing(ctx: &TestHarness) {
    let people = ctx.add_participants(2);
    ctx.stores.participants.force_availability(people[1].id, false);

    let first = ctx.run_round().await.unwrap();
    let second = ctx.run_round().await.unwrap();

    assert!(first.is_empty());
    assert!(second.is_empty());
    assert_eq!(ctx.write_count(), 0);
}

// =============================================================================
// Pairing without history
// =============================================================================

/// Five participants, no history: two pairs, four busy, one still free,
/// exactly one batch insert of two records.
#[test_context(TestHarness)]
#[tokio::test]
async fn five_participants_form_two_pairs(ctx: &TestHarness) {
    let people = ctx.add_participants(5);

    let outcome = ctx.run_round_shuffled(FisherYates::from_entropy()).await.unwrap();

    assert_eq!(outcome.pairs.len(), 2);
    assert_eq!(outcome.unmatched.len(), 1);

    let busy: Vec<&Participant> = people
        .iter()
        .filter(|p| !ctx.participant(p.id).available)
        .collect();
    assert_eq!(busy.len(), 4);
    assert!(ctx.participant(outcome.unmatched[0].id).available);

    let batches = ctx.stores.match_history.insert_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(ctx.stores.match_history.records().len(), 2);
}

/// With no history every size pairs floor(n/2) and nobody appears twice.
#[test_context(TestHarness)]
#[tokio::test]
async fn everyone_pairs_once_without_history(ctx: &TestHarness) {
    ctx.add_participants(8);

    let outcome = ctx.run_round_shuffled(FisherYates::seeded(3)).await.unwrap();

    assert_eq!(outcome.pairs.len(), 4);
    let mut seen = HashSet::new();
    for pair in &outcome.pairs {
        assert_ne!(pair.participant_a_id(), pair.participant_b_id());
        assert!(seen.insert(pair.participant_a_id()));
        assert!(seen.insert(pair.participant_b_id()));
    }
}

/// Banned participants never reach the pairing engine.
#[test_context(TestHarness)]
#[tokio::test]
async fn banned_participants_are_never_paired(ctx: &TestHarness) {
    let people = ctx.add_participants(4);
    ctx.stores.participants.force_banned(people[0].id, true);
    ctx.stores.participants.force_banned(people[3].id, true);

    let outcome = ctx.run_round_shuffled(FisherYates::from_entropy()).await.unwrap();

    assert_eq!(outcome.eligible_count, 2);
    assert_eq!(outcome.pairs.len(), 1);
    assert!(!outcome.pairs[0].contains(people[0].id));
    assert!(!outcome.pairs[0].contains(people[3].id));
    assert!(ctx.participant(people[0].id).available);
}

/// Outcome exposes the external ids callers use for delivery.
#[test_context(TestHarness)]
#[tokio::test]
async fn outcome_carries_external_ids(ctx: &TestHarness) {
    ctx.add_participants(2);

    let outcome = ctx.run_round().await.unwrap();

    assert_eq!(outcome.pairs[0].participant_a_external_id(), "ext-p1");
    assert_eq!(outcome.pairs[0].participant_b_external_id(), "ext-p2");
}

// =============================================================================
// Recency
// =============================================================================

/// A pair matched yesterday is skipped while someone else is compatible.
#[test_context(TestHarness)]
#[tokio::test]
async fn recent_pair_is_not_repeated(ctx: &TestHarness) {
    let people = ctx.add_participants(3);
    ctx.matched_days_ago(people[0].id, people[1].id, 1);

    let outcome = ctx.run_round().await.unwrap();

    assert_eq!(outcome.pairs.len(), 1);
    assert_eq!(outcome.pairs[0].participant_a_id(), people[0].id);
    assert_eq!(outcome.pairs[0].participant_b_id(), people[2].id);
    assert!(ctx.participant(people[1].id).available);
}

/// If the recent pair are the only two candidates, both stay free.
#[test_context(TestHarness)]
#[tokio::test]
async fn only_recent_pair_stays_unmatched(ctx: &TestHarness) {
    let people = ctx.add_participants(2);
    ctx.matched_days_ago(people[1].id, people[0].id, 1);

    let outcome = ctx.run_round_shuffled(FisherYates::from_entropy()).await.unwrap();

    assert!(outcome.is_empty());
    assert_eq!(outcome.unmatched.len(), 2);
    assert_eq!(ctx.write_count(), 0);
}

/// A match older than the window no longer blocks the pair.
#[test_context(TestHarness)]
#[tokio::test]
async fn match_outside_window_can_repeat(ctx: &TestHarness) {
    let people = ctx.add_participants(2);
    ctx.matched_days_ago(people[0].id, people[1].id, 31);

    let outcome = ctx.run_round().await.unwrap();

    assert_eq!(outcome.pairs.len(), 1);
}

/// History lookups give the same answer in both argument orders.
#[test_context(TestHarness)]
#[tokio::test]
async fn history_is_symmetric(ctx: &TestHarness) {
    let people = ctx.add_participants(3);
    ctx.matched_days_ago(people[0].id, people[1].id, 1);
    let history = ctx.deps.match_history.as_ref();
    let window = Duration::days(30);

    for (a, b) in [(0, 1), (0, 2), (1, 2)] {
        let forward = was_recently_matched(history, people[a].id, people[b].id, window, ctx.now)
            .await
            .unwrap();
        let backward = was_recently_matched(history, people[b].id, people[a].id, window, ctx.now)
            .await
            .unwrap();
        assert_eq!(forward, backward);
    }
}

/// Pairs recorded by a round block the same pair in the next round.
#[test_context(TestHarness)]
#[tokio::test]
async fn next_round_respects_pairs_just_recorded(ctx: &TestHarness) {
    let people = ctx.add_participants(2);
    ctx.run_round().await.unwrap();

    for person in &people {
        ctx.stores.participants.force_availability(person.id, true);
    }
    let again = ctx.run_round().await.unwrap();

    assert!(again.is_empty());
}

// =============================================================================
// Determinism
// =============================================================================

/// Same seed, same candidates, same history: same pairs.
#[tokio::test]
async fn seeded_shuffle_is_deterministic() {
    async fn run_once() -> Vec<(String, String)> {
        let ctx = <TestHarness as test_context::AsyncTestContext>::setup().await;
        let people = ctx.add_participants(7);
        ctx.matched_days_ago(people[0].id, people[4].id, 3);
        ctx.matched_days_ago(people[2].id, people[5].id, 3);

        ctx.run_round_shuffled(FisherYates::seeded(11))
            .await
            .unwrap()
            .pairs
            .iter()
            .map(|p| {
                (
                    p.participant_a.display_name.clone(),
                    p.participant_b.display_name.clone(),
                )
            })
            .collect()
    }

    let first = run_once().await;
    let second = run_once().await;

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

// =============================================================================
// Failures
// =============================================================================

/// History lookup failure is treated as "not recent" and the round proceeds.
#[test_context(TestHarness)]
#[tokio::test]
async fn lookup_failure_fails_open(ctx: &TestHarness) {
    let people = ctx.add_participants(2);
    ctx.matched_days_ago(people[0].id, people[1].id, 1);
    ctx.stores.match_history.fail_lookups_for(people[0].id);

    let outcome = ctx.run_round().await.unwrap();

    assert_eq!(outcome.pairs.len(), 1);
    assert!(outcome.pairs[0].contains(people[0].id));
    assert!(outcome.pairs[0].contains(people[1].id));
}

/// Under fail-closed a failed lookup skips the pair instead.
#[test_context(TestHarness)]
#[tokio::test]
async fn lookup_failure_fails_closed_when_configured(ctx: &mut TestHarness) {
    ctx.settings.recency_policy = RecencyLookupPolicy::FailClosed;
    let people = ctx.add_participants(3);
    ctx.stores.match_history.fail_lookups_for(people[0].id);

    let outcome = ctx.run_round().await.unwrap();

    assert_eq!(outcome.pairs.len(), 1);
    assert_eq!(outcome.pairs[0].participant_a_id(), people[1].id);
    assert_eq!(outcome.pairs[0].participant_b_id(), people[2].id);
    assert!(ctx.participant(people[0].id).available);
}

/// Availability update failure aborts the round; earlier pairs stay applied
/// and nothing is inserted.
#[test_context(TestHarness)]
#[tokio::test]
async fn availability_failure_aborts_round(ctx: &TestHarness) {
    let people = ctx.add_participants(4);
    ctx.stores
        .participants
        .fail_availability_updates_for(people[2].id);

    let err = ctx.run_round().await.unwrap_err();

    assert_eq!(err.step, RoundStep::UpdateAvailability);
    assert_eq!(err.pairs_applied, 1);
    assert!(!ctx.participant(people[0].id).available);
    assert!(!ctx.participant(people[1].id).available);
    assert!(ctx.participant(people[3].id).available);
    assert!(ctx.stores.match_history.insert_batches().is_empty());
}

/// A participant deleted between listing and update aborts the round with the
/// store's not-found error; nothing is inserted.
#[test_context(TestHarness)]
#[tokio::test]
async fn availability_not_found_aborts_round(ctx: &TestHarness) {
    let people = ctx.add_participants(4);
    ctx.stores.participants.remove_after_listing(people[3].id);

    let err = ctx.run_round().await.unwrap_err();

    assert_eq!(err.step, RoundStep::UpdateAvailability);
    assert_eq!(err.pairs_applied, 1);
    assert!(matches!(err.source, StoreError::NotFound(id) if id == people[3].id));
    assert!(!ctx.participant(people[2].id).available);
    assert!(ctx.stores.match_history.insert_batches().is_empty());
}

/// Insert failure aborts the round; flipped participants are not rolled back.
#[test_context(TestHarness)]
#[tokio::test]
async fn insert_failure_leaves_participants_flipped(ctx: &TestHarness) {
    let people = ctx.add_participants(4);
    ctx.stores.match_history.fail_inserts();

    let err = ctx.run_round().await.unwrap_err();

    assert_eq!(err.step, RoundStep::InsertHistory);
    assert_eq!(err.pairs_applied, 2);
    assert!(people.iter().all(|p| !ctx.participant(p.id).available));
    assert!(ctx.stores.match_history.records().is_empty());
}
