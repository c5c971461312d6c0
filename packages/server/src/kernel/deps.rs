//! Server dependencies (using traits for testability)
//!
//! This module provides the dependency container used by every domain action,
//! plus the Postgres adapters that back the store traits in production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

use crate::common::ParticipantId;
use crate::domains::matching::models::{MatchRecord, NewMatchRecord};
use crate::domains::participant::models::{NewParticipant, Participant, ProfileUpdate};
use crate::kernel::{
    BaseMatchHistoryStore, BaseParticipantStore, BaseRoundLock, RoundLease, StoreError,
    StoreResult,
};

// =============================================================================
// Postgres participant store (implements BaseParticipantStore trait)
// =============================================================================

pub struct PgParticipantStore {
    pool: PgPool,
}

impl PgParticipantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseParticipantStore for PgParticipantStore {
    async fn list_eligible_participants(&self) -> StoreResult<Vec<Participant>> {
        Ok(Participant::find_eligible(&self.pool).await?)
    }

    async fn set_availability(
        &self,
        participant_id: ParticipantId,
        available: bool,
    ) -> StoreResult<Participant> {
        Participant::update_availability(participant_id, available, &self.pool)
            .await?
            .ok_or(StoreError::NotFound(participant_id))
    }

    async fn list_participants(&self) -> StoreResult<Vec<Participant>> {
        Ok(Participant::find_all(&self.pool).await?)
    }

    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<Participant>> {
        Ok(Participant::find_by_external_id(external_id, &self.pool).await?)
    }

    async fn insert_participant(&self, participant: NewParticipant) -> StoreResult<Participant> {
        Ok(Participant::insert(&participant, &self.pool).await?)
    }

    async fn set_banned(
        &self,
        participant_id: ParticipantId,
        banned: bool,
    ) -> StoreResult<Participant> {
        Participant::update_banned(participant_id, banned, &self.pool)
            .await?
            .ok_or(StoreError::NotFound(participant_id))
    }

    async fn update_profile(
        &self,
        participant_id: ParticipantId,
        update: ProfileUpdate,
    ) -> StoreResult<Participant> {
        Participant::update_profile(participant_id, &update, &self.pool)
            .await?
            .ok_or(StoreError::NotFound(participant_id))
    }
}

// =============================================================================
// Postgres match history store (implements BaseMatchHistoryStore trait)
// =============================================================================

pub struct PgMatchHistoryStore {
    pool: PgPool,
}

impl PgMatchHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseMatchHistoryStore for PgMatchHistoryStore {
    async fn list_recent_matches_for(
        &self,
        participant_id: ParticipantId,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<MatchRecord>> {
        Ok(MatchRecord::find_recent_for(participant_id, since, &self.pool).await?)
    }

    async fn list_matches_for(&self, participant_id: ParticipantId) -> StoreResult<Vec<MatchRecord>> {
        Ok(MatchRecord::find_for(participant_id, &self.pool).await?)
    }

    async fn insert_match_records(
        &self,
        batch: Vec<NewMatchRecord>,
    ) -> StoreResult<Vec<MatchRecord>> {
        Ok(MatchRecord::insert_batch(&batch, &self.pool).await?)
    }
}

// =============================================================================
// Postgres round lock (implements BaseRoundLock trait)
// =============================================================================

/// Advisory lock key shared by every process that runs matching rounds
pub const MATCH_ROUND_LOCK_KEY: i64 = 0x7061_6972_696e_67;

/// Transaction-scoped advisory lock. The lease keeps one pooled connection
/// inside an open transaction; Postgres drops the lock when it ends, including
/// when the connection is lost.
pub struct PgRoundLock {
    pool: PgPool,
}

impl PgRoundLock {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseRoundLock for PgRoundLock {
    async fn try_acquire(&self) -> StoreResult<Option<Box<dyn RoundLease>>> {
        let mut tx = self.pool.begin().await?;
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
            .bind(MATCH_ROUND_LOCK_KEY)
            .fetch_one(&mut *tx)
            .await?;

        if !acquired {
            tx.rollback().await?;
            return Ok(None);
        }
        Ok(Some(Box::new(PgRoundLease { tx })))
    }
}

struct PgRoundLease {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RoundLease for PgRoundLease {
    async fn release(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to actions
#[derive(Clone)]
pub struct ServerDeps {
    pub participants: Arc<dyn BaseParticipantStore>,
    pub match_history: Arc<dyn BaseMatchHistoryStore>,
    pub round_lock: Arc<dyn BaseRoundLock>,
}

impl ServerDeps {
    pub fn new(
        participants: Arc<dyn BaseParticipantStore>,
        match_history: Arc<dyn BaseMatchHistoryStore>,
        round_lock: Arc<dyn BaseRoundLock>,
    ) -> Self {
        Self {
            participants,
            match_history,
            round_lock,
        }
    }

    /// Stores and round lock backed by the same Postgres pool
    pub fn postgres(pool: PgPool) -> Self {
        Self::new(
            Arc::new(PgParticipantStore::new(pool.clone())),
            Arc::new(PgMatchHistoryStore::new(pool.clone())),
            Arc::new(PgRoundLock::new(pool)),
        )
    }
}
