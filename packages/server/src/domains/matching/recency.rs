//! Recency oracle - answers "were these two paired within the window?"
//!
//! History is queried for the first participant only. The store returns records
//! where that participant sits in either slot, so the answer does not depend on
//! argument order.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::common::ParticipantId;
use crate::domains::matching::settings::RecencyLookupPolicy;
use crate::kernel::{BaseMatchHistoryStore, StoreError, StoreResult};

/// Raw recency lookup. Store failures are returned to the caller untouched.
pub async fn was_recently_matched(
    history: &dyn BaseMatchHistoryStore,
    a: ParticipantId,
    b: ParticipantId,
    window: Duration,
    now: DateTime<Utc>,
) -> StoreResult<bool> {
    let since = now.checked_sub_signed(window).ok_or_else(|| {
        StoreError::InvalidQuery(format!("recency window {} is out of range", window))
    })?;
    let records = history.list_recent_matches_for(a, since).await?;

    Ok(records.iter().any(|record| record.pairs(a, b)))
}

/// Compatibility check consulted by the pairing engine for every candidate pair
#[async_trait]
pub trait RecencyCheck: Send + Sync {
    async fn is_recent(&self, a: ParticipantId, b: ParticipantId) -> bool;
}

/// Recency oracle bound to one round: fixed "now", window and failure policy
pub struct RecencyOracle {
    history: Arc<dyn BaseMatchHistoryStore>,
    window: Duration,
    policy: RecencyLookupPolicy,
    now: DateTime<Utc>,
}

impl RecencyOracle {
    pub fn new(
        history: Arc<dyn BaseMatchHistoryStore>,
        window: Duration,
        policy: RecencyLookupPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            history,
            window,
            policy,
            now,
        }
    }

    pub async fn was_recently_matched(
        &self,
        a: ParticipantId,
        b: ParticipantId,
    ) -> StoreResult<bool> {
        was_recently_matched(self.history.as_ref(), a, b, self.window, self.now).await
    }
}

#[async_trait]
impl RecencyCheck for RecencyOracle {
    async fn is_recent(&self, a: ParticipantId, b: ParticipantId) -> bool {
        match self.was_recently_matched(a, b).await {
            Ok(recent) => {
                debug!("Recency check {} / {}: recent = {}", a, b, recent);
                recent
            }
            Err(e) => {
                let assumed = self.policy.assume_recent();
                warn!(
                    participant_a = %a,
                    participant_b = %b,
                    policy = %self.policy,
                    "Match history lookup failed, assuming recent = {}: {}",
                    assumed,
                    e
                );
                assumed
            }
        }
    }
}
