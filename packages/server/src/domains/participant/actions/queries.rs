//! Participant query actions

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::domains::participant::models::{Participant, ParticipantStatus};
use crate::kernel::ServerDeps;

/// Admin overview of the participant base
#[derive(Serialize, Debug, Clone)]
pub struct ParticipantOverview {
    pub total: usize,
    pub free: usize,
    pub busy: usize,
    pub banned: usize,
    pub participants: Vec<Participant>,
}

/// List every participant with status counts
pub async fn list_participants(deps: &ServerDeps) -> Result<ParticipantOverview> {
    info!("Listing participants");

    let participants = deps
        .participants
        .list_participants()
        .await
        .context("Failed to list participants")?;

    let count = |status: ParticipantStatus| {
        participants.iter().filter(|p| p.status() == status).count()
    };

    Ok(ParticipantOverview {
        total: participants.len(),
        free: count(ParticipantStatus::Free),
        busy: count(ParticipantStatus::Busy),
        banned: count(ParticipantStatus::Banned),
        participants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::TestDependencies;

    #[tokio::test]
    async fn counts_each_status() {
        let test_deps = TestDependencies::new();
        test_deps.participants.add_named("P1");
        let p2 = test_deps.participants.add_named("P2");
        let p3 = test_deps.participants.add_named("P3");
        test_deps.participants.force_availability(p2.id, false);
        test_deps.participants.force_banned(p3.id, true);

        let overview = list_participants(&test_deps.deps()).await.unwrap();

        assert_eq!(overview.total, 3);
        assert_eq!((overview.free, overview.busy, overview.banned), (1, 1, 1));
    }
}
