// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The matching round, recency checks and admin actions are domain functions
// that call these traits.
//
// Naming convention: Base* for trait names (e.g., BaseParticipantStore)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::common::ParticipantId;
use crate::domains::matching::models::{MatchRecord, NewMatchRecord};
use crate::domains::participant::models::{NewParticipant, Participant, ProfileUpdate};

// =============================================================================
// Store errors
// =============================================================================

/// Failure of a participant or match-history store call.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or rejected the call.
    #[error("store unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),

    /// An update targeted a participant id the store does not know.
    #[error("participant not found: {0}")]
    NotFound(ParticipantId),

    /// The call was rejected before reaching the backend.
    #[error("invalid store query: {0}")]
    InvalidQuery(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Participant Store Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseParticipantStore: Send + Sync {
    /// All participants that are available and not banned
    async fn list_eligible_participants(&self) -> StoreResult<Vec<Participant>>;

    /// Unconditionally set `available`; fails with `NotFound` for unknown ids
    async fn set_availability(
        &self,
        participant_id: ParticipantId,
        available: bool,
    ) -> StoreResult<Participant>;

    /// Every participant regardless of status, oldest first
    async fn list_participants(&self) -> StoreResult<Vec<Participant>>;

    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<Participant>>;

    async fn insert_participant(&self, participant: NewParticipant) -> StoreResult<Participant>;

    /// Unconditionally set `banned`; fails with `NotFound` for unknown ids
    async fn set_banned(
        &self,
        participant_id: ParticipantId,
        banned: bool,
    ) -> StoreResult<Participant>;

    /// Overwrite the profile fields set in `update`; fails with `NotFound` for unknown ids
    async fn update_profile(
        &self,
        participant_id: ParticipantId,
        update: ProfileUpdate,
    ) -> StoreResult<Participant>;
}

// =============================================================================
// Match History Store Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseMatchHistoryStore: Send + Sync {
    /// Records where the participant sits in either slot, created at or after `since`
    async fn list_recent_matches_for(
        &self,
        participant_id: ParticipantId,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<MatchRecord>>;

    /// Full history for the participant in either slot, newest first
    async fn list_matches_for(&self, participant_id: ParticipantId) -> StoreResult<Vec<MatchRecord>>;

    /// Insert the whole batch or nothing; `created_at` is assigned by the store
    async fn insert_match_records(
        &self,
        batch: Vec<NewMatchRecord>,
    ) -> StoreResult<Vec<MatchRecord>>;
}

// =============================================================================
// Round Lock Trait (Infrastructure)
// =============================================================================

/// Held for the duration of one matching round
#[async_trait]
pub trait RoundLease: Send {
    async fn release(self: Box<Self>) -> StoreResult<()>;
}

/// Mutual exclusion for matching rounds across every process sharing the stores
#[async_trait]
pub trait BaseRoundLock: Send + Sync {
    /// Take the lock without waiting; `None` while another holder has it
    async fn try_acquire(&self) -> StoreResult<Option<Box<dyn RoundLease>>>;
}
