//! "Find a new partner" action - a participant asks to join the next round

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::domains::participant::models::Participant;
use crate::kernel::ServerDeps;

/// Mark the participant behind `external_id` available for the next round.
///
/// Banned participants can still flip the flag; they stay out of rounds
/// because eligibility also requires `banned = false`.
pub async fn request_new_partner(external_id: &str, deps: &ServerDeps) -> Result<Participant> {
    let participant = deps
        .participants
        .find_by_external_id(external_id)
        .await
        .context("Failed to look up participant")?
        .ok_or_else(|| anyhow!("No participant registered with external id {}", external_id))?;

    let updated = deps
        .participants
        .set_availability(participant.id, true)
        .await
        .context("Failed to update availability")?;

    info!("Participant {} is available for the next round", updated.id);
    Ok(updated)
}
