//! Edit profile action - a registered participant changes how they are introduced

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use crate::domains::participant::models::{Participant, ProfileUpdate};
use crate::kernel::ServerDeps;

/// Update the profile of the participant behind `external_id`.
///
/// Fields left `None` keep their stored value. Matching state (`available`,
/// `banned`) is never touched.
pub async fn update_profile(
    external_id: &str,
    update: ProfileUpdate,
    deps: &ServerDeps,
) -> Result<Participant> {
    if update.is_empty() {
        bail!("Nothing to update: give at least one profile field");
    }

    let participant = deps
        .participants
        .find_by_external_id(external_id)
        .await
        .context("Failed to look up participant")?
        .ok_or_else(|| anyhow!("No participant registered with external id {}", external_id))?;

    let updated = deps
        .participants
        .update_profile(participant.id, update)
        .await
        .with_context(|| format!("Failed to update profile of participant {}", participant.id))?;

    info!("Participant {} updated profile", updated.id);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::TestDependencies;

    #[tokio::test]
    async fn changes_only_the_given_fields() {
        let test_deps = TestDependencies::new();
        let p1 = test_deps.participants.add_named("P1");
        test_deps.participants.force_availability(p1.id, false);

        let updated = update_profile(
            &p1.external_id,
            ProfileUpdate {
                display_name: Some("Pavel S.".to_string()),
                organization: Some("Fablab".to_string()),
                ..Default::default()
            },
            &test_deps.deps(),
        )
        .await
        .unwrap();

        assert_eq!(updated.display_name, "Pavel S.");
        assert_eq!(updated.organization, "Fablab");
        assert_eq!(updated.role_title, p1.role_title);
        assert!(!updated.available);
        assert_eq!(test_deps.participants.get(p1.id).unwrap(), updated);
    }

    #[tokio::test]
    async fn unknown_external_id_is_an_error() {
        let test_deps = TestDependencies::new();
        let update = ProfileUpdate {
            role_title: Some("Mentor".to_string()),
            ..Default::default()
        };

        assert!(update_profile("nobody", update, &test_deps.deps()).await.is_err());
    }

    #[tokio::test]
    async fn empty_update_is_rejected_without_store_calls() {
        let test_deps = TestDependencies::new();
        let p1 = test_deps.participants.add_named("P1");

        let result = update_profile(&p1.external_id, ProfileUpdate::default(), &test_deps.deps()).await;

        assert!(result.is_err());
        assert_eq!(test_deps.participants.call_count(), 0);
    }
}
