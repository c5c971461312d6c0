use serde::Serialize;

use crate::common::ParticipantId;
use crate::domains::participant::models::Participant;

/// One pair formed in a round, with both participants' records as they stand
/// after the round marked them unavailable.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MatchedPair {
    pub participant_a: Participant,
    pub participant_b: Participant,
}

impl MatchedPair {
    pub fn participant_a_id(&self) -> ParticipantId {
        self.participant_a.id
    }

    pub fn participant_b_id(&self) -> ParticipantId {
        self.participant_b.id
    }

    pub fn participant_a_external_id(&self) -> &str {
        &self.participant_a.external_id
    }

    pub fn participant_b_external_id(&self) -> &str {
        &self.participant_b.external_id
    }

    pub fn contains(&self, participant_id: ParticipantId) -> bool {
        self.participant_a.id == participant_id || self.participant_b.id == participant_id
    }
}

/// Result of one matching round. Not persisted; the caller consumes it for
/// notification and drops it.
#[derive(Serialize, Debug, Clone, Default)]
pub struct RoundOutcome {
    /// Pairs in the order the greedy scan discovered them
    pub pairs: Vec<MatchedPair>,
    /// Eligible participants nobody could be paired with; still available
    pub unmatched: Vec<Participant>,
    pub eligible_count: usize,
}

impl RoundOutcome {
    /// Outcome of a round that had fewer than two eligible candidates
    pub fn insufficient_candidates(candidates: Vec<Participant>) -> Self {
        Self {
            eligible_count: candidates.len(),
            pairs: Vec::new(),
            unmatched: candidates,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn matched_participant_count(&self) -> usize {
        self.pairs.len() * 2
    }
}
