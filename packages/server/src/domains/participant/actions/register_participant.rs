//! Register participant action

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::domains::participant::models::{NewParticipant, Participant};
use crate::kernel::ServerDeps;

/// Register a participant, or return the existing record for the same
/// external id. New participants start available and unbanned.
pub async fn register_participant(new: NewParticipant, deps: &ServerDeps) -> Result<Participant> {
    info!("Registering participant with external id: {}", new.external_id);

    if let Some(existing) = deps
        .participants
        .find_by_external_id(&new.external_id)
        .await
        .context("Failed to look up participant")?
    {
        debug!("Participant already exists, returning existing: {}", existing.id);
        return Ok(existing);
    }

    let created = deps
        .participants
        .insert_participant(new)
        .await
        .context("Failed to insert participant")?;

    info!("Participant registered successfully: {}", created.id);
    Ok(created)
}
