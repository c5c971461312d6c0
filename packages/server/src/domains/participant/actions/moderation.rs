//! Ban / unban actions
//!
//! Authorization happens in the caller; these only flip the flag.

use anyhow::{Context, Result};
use tracing::info;

use crate::common::ParticipantId;
use crate::domains::participant::models::Participant;
use crate::kernel::ServerDeps;

/// Permanently exclude a participant from matching
pub async fn ban_participant(participant_id: ParticipantId, deps: &ServerDeps) -> Result<Participant> {
    let updated = deps
        .participants
        .set_banned(participant_id, true)
        .await
        .with_context(|| format!("Failed to ban participant {}", participant_id))?;

    info!("Admin banned participant: {}", updated.id);
    Ok(updated)
}

/// Lift a ban. Availability is left as it was.
pub async fn unban_participant(
    participant_id: ParticipantId,
    deps: &ServerDeps,
) -> Result<Participant> {
    let updated = deps
        .participants
        .set_banned(participant_id, false)
        .await
        .with_context(|| format!("Failed to unban participant {}", participant_id))?;

    info!("Admin unbanned participant: {}", updated.id);
    Ok(updated)
}
