use std::fmt;
use thiserror::Error;

use crate::kernel::StoreError;

/// Store call of a matching round that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStep {
    AcquireLock,
    ListCandidates,
    UpdateAvailability,
    InsertHistory,
}

impl fmt::Display for RoundStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AcquireLock => f.write_str("acquiring the round lock"),
            Self::ListCandidates => f.write_str("listing eligible participants"),
            Self::UpdateAvailability => f.write_str("updating participant availability"),
            Self::InsertHistory => f.write_str("inserting match history"),
        }
    }
}

/// A matching round aborted by a store failure.
///
/// Side effects already applied are not rolled back. `pairs_applied` counts the
/// pairs whose participants were both marked unavailable before the failure; if
/// the failure hit the second update of a pair, the first participant of that
/// pair is also left unavailable.
#[derive(Error, Debug)]
#[error("matching round failed while {step} ({pairs_applied} pair(s) already applied): {source}")]
pub struct RoundError {
    pub step: RoundStep,
    pub pairs_applied: usize,
    #[source]
    pub source: StoreError,
}

impl RoundError {
    pub fn new(step: RoundStep, pairs_applied: usize, source: StoreError) -> Self {
        Self {
            step,
            pairs_applied,
            source,
        }
    }

    /// True if some participants may have been marked unavailable with no
    /// match recorded for them
    pub fn left_partial_effects(&self) -> bool {
        match self.step {
            RoundStep::AcquireLock | RoundStep::ListCandidates => false,
            RoundStep::UpdateAvailability | RoundStep::InsertHistory => true,
        }
    }
}
