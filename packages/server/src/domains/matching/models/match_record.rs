use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{MatchId, ParticipantId};

/// MatchRecord model - one stored pairing
///
/// The pair is unordered: `(a, b)` and `(b, a)` describe the same relationship.
/// Records are only ever inserted, never updated or deleted.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub id: MatchId,
    pub participant_a_id: ParticipantId,
    pub participant_b_id: ParticipantId,
    pub created_at: DateTime<Utc>,
}

/// A pairing accumulated during a round, before the store assigns id and timestamp
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewMatchRecord {
    pub participant_a_id: ParticipantId,
    pub participant_b_id: ParticipantId,
}

impl NewMatchRecord {
    pub fn new(participant_a_id: ParticipantId, participant_b_id: ParticipantId) -> Self {
        Self {
            participant_a_id,
            participant_b_id,
        }
    }
}

impl MatchRecord {
    /// True if the participant sits in either slot
    pub fn involves(&self, participant_id: ParticipantId) -> bool {
        self.participant_a_id == participant_id || self.participant_b_id == participant_id
    }

    /// True if this record pairs `a` with `b`, in either ordering
    pub fn pairs(&self, a: ParticipantId, b: ParticipantId) -> bool {
        (self.participant_a_id == a && self.participant_b_id == b)
            || (self.participant_a_id == b && self.participant_b_id == a)
    }

    /// Records involving the participant created at or after `since`, newest first
    pub async fn find_recent_for(
        participant_id: ParticipantId,
        since: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM matches
             WHERE (participant_a_id = $1 OR participant_b_id = $1)
               AND created_at >= $2
             ORDER BY created_at DESC",
        )
        .bind(participant_id)
        .bind(since)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Full history for one participant, newest first
    pub async fn find_for(participant_id: ParticipantId, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM matches
             WHERE participant_a_id = $1 OR participant_b_id = $1
             ORDER BY created_at DESC",
        )
        .bind(participant_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Insert a batch in a single statement, so it lands entirely or not at all
    pub async fn insert_batch(batch: &[NewMatchRecord], pool: &PgPool) -> Result<Vec<Self>> {
        let ids: Vec<MatchId> = batch.iter().map(|_| MatchId::new()).collect();
        let a_ids: Vec<ParticipantId> = batch.iter().map(|r| r.participant_a_id).collect();
        let b_ids: Vec<ParticipantId> = batch.iter().map(|r| r.participant_b_id).collect();

        sqlx::query_as::<_, Self>(
            "INSERT INTO matches (id, participant_a_id, participant_b_id)
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[])
             RETURNING *",
        )
        .bind(ids)
        .bind(a_ids)
        .bind(b_ids)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
