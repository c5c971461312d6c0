//! Match history query action

use anyhow::{Context, Result};
use tracing::info;

use crate::common::ParticipantId;
use crate::domains::matching::models::MatchRecord;
use crate::kernel::ServerDeps;

/// Every recorded pairing involving the participant, newest first
pub async fn list_match_history(
    participant_id: ParticipantId,
    deps: &ServerDeps,
) -> Result<Vec<MatchRecord>> {
    info!("Listing match history for participant {}", participant_id);

    deps.match_history
        .list_matches_for(participant_id)
        .await
        .with_context(|| format!("Failed to list matches for participant {}", participant_id))
}
