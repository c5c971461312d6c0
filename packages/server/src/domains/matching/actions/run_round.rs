//! Run matching round action - one round end-to-end

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::domains::matching::errors::{RoundError, RoundStep};
use crate::domains::matching::models::{MatchedPair, NewMatchRecord, RoundOutcome};
use crate::domains::matching::pairing::{FisherYates, PairingEngine, Shuffler};
use crate::domains::matching::recency::RecencyOracle;
use crate::domains::matching::settings::MatchingSettings;
use crate::domains::participant::models::Participant;
use crate::kernel::ServerDeps;

/// Run one matching round.
///
/// This action:
/// 1. Loads eligible participants
/// 2. Returns an empty outcome (no writes) if fewer than two are eligible
/// 3. Pairs them, checking recency against the configured window
/// 4. Marks both members of every pair unavailable
/// 5. Stores all pairs in one batch insert
///
/// Returns the formed pairs for the caller to notify. Any store failure in
/// steps 1, 4 or 5 aborts the round; updates already applied stay applied.
#[instrument(skip_all, fields(window_days = settings.recency_window_days, policy = %settings.recency_policy))]
pub async fn run_round(
    deps: &ServerDeps,
    settings: &MatchingSettings,
) -> Result<RoundOutcome, RoundError> {
    let shuffler = FisherYates::from_seed(settings.shuffle_seed);
    run_round_with(deps, settings, shuffler, Utc::now()).await
}

/// `run_round` with an explicit shuffle source and clock
pub async fn run_round_with<S: Shuffler>(
    deps: &ServerDeps,
    settings: &MatchingSettings,
    shuffler: S,
    now: DateTime<Utc>,
) -> Result<RoundOutcome, RoundError> {
    let listed = deps
        .participants
        .list_eligible_participants()
        .await
        .map_err(|e| RoundError::new(RoundStep::ListCandidates, 0, e))?;

    let listed_count = listed.len();
    let candidates: Vec<Participant> = listed.into_iter().filter(Participant::is_eligible).collect();
    if candidates.len() != listed_count {
        warn!(
            "Participant store returned {} ineligible participant(s); excluded from round",
            listed_count - candidates.len()
        );
    }

    if candidates.len() < 2 {
        info!(
            "Not enough eligible participants to match ({})",
            candidates.len()
        );
        return Ok(RoundOutcome::insufficient_candidates(candidates));
    }

    let eligible_count = candidates.len();
    info!("Matching {} eligible participants", eligible_count);

    let oracle = RecencyOracle::new(
        deps.match_history.clone(),
        settings.recency_window(),
        settings.recency_policy,
        now,
    );
    let pairing = PairingEngine::new(shuffler).pair(candidates, &oracle).await;

    let mut pairs: Vec<MatchedPair> = Vec::with_capacity(pairing.pairs.len());
    let mut records: Vec<NewMatchRecord> = Vec::with_capacity(pairing.pairs.len());

    for (a, b) in pairing.pairs {
        let participant_a = mark_unavailable(deps, a, pairs.len()).await?;
        let participant_b = mark_unavailable(deps, b, pairs.len()).await?;

        records.push(NewMatchRecord::new(participant_a.id, participant_b.id));
        pairs.push(MatchedPair {
            participant_a,
            participant_b,
        });
    }

    if !records.is_empty() {
        deps.match_history
            .insert_match_records(records)
            .await
            .map_err(|e| RoundError::new(RoundStep::InsertHistory, pairs.len(), e))?;
    }

    info!(
        "Matching round complete: {} pairs formed, {} participants left unmatched",
        pairs.len(),
        pairing.unmatched.len()
    );

    Ok(RoundOutcome {
        pairs,
        unmatched: pairing.unmatched,
        eligible_count,
    })
}

async fn mark_unavailable(
    deps: &ServerDeps,
    participant: Participant,
    pairs_applied: usize,
) -> Result<Participant, RoundError> {
    deps.participants
        .set_availability(participant.id, false)
        .await
        .map_err(|e| RoundError::new(RoundStep::UpdateAvailability, pairs_applied, e))
}
