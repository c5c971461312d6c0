use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::ParticipantId;

/// Participant model - SQL persistence layer
///
/// Matching only looks at `id`, `available` and `banned`. The remaining fields
/// are carried through so callers can introduce the two people to each other.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    /// Messaging-platform id, used for outbound delivery only
    pub external_id: String,
    pub username: Option<String>,
    pub display_name: String,
    pub role_title: String,
    pub organization: String,

    // Status
    pub available: bool,
    pub banned: bool,

    pub created_at: DateTime<Utc>,
}

/// Admin-facing status derived from the `available` and `banned` flags
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ParticipantStatus {
    Free,
    Busy,
    Banned,
}

/// Fields supplied when a participant registers
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewParticipant {
    pub external_id: String,
    pub username: Option<String>,
    pub display_name: String,
    pub role_title: String,
    pub organization: String,
}

/// Profile fields a participant may change after registering.
/// `None` leaves the stored value as it is.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub role_title: Option<String>,
    pub organization: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.role_title.is_none() && self.organization.is_none()
    }

    /// Apply the set fields to an in-memory participant
    pub fn apply_to(&self, participant: &mut Participant) {
        if let Some(display_name) = &self.display_name {
            participant.display_name = display_name.clone();
        }
        if let Some(role_title) = &self.role_title {
            participant.role_title = role_title.clone();
        }
        if let Some(organization) = &self.organization {
            participant.organization = organization.clone();
        }
    }
}

impl Participant {
    /// Eligible for the next round: available and not banned
    pub fn is_eligible(&self) -> bool {
        self.available && !self.banned
    }

    /// Status shown in admin listings; a ban outranks availability
    pub fn status(&self) -> ParticipantStatus {
        if self.banned {
            ParticipantStatus::Banned
        } else if self.available {
            ParticipantStatus::Free
        } else {
            ParticipantStatus::Busy
        }
    }

    /// Find all participants eligible for matching
    pub async fn find_eligible(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM participants
             WHERE available = true
               AND banned = false
             ORDER BY created_at",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Find every participant, oldest registration first
    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM participants ORDER BY created_at")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_external_id(external_id: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM participants WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Insert new participant (available, not banned)
    pub async fn insert(new: &NewParticipant, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO participants (
                id,
                external_id,
                username,
                display_name,
                role_title,
                organization,
                available,
                banned
             )
             VALUES ($1, $2, $3, $4, $5, $6, true, false)
             RETURNING *",
        )
        .bind(ParticipantId::new())
        .bind(&new.external_id)
        .bind(&new.username)
        .bind(&new.display_name)
        .bind(&new.role_title)
        .bind(&new.organization)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Update availability. Returns None if the id is unknown.
    pub async fn update_availability(
        id: ParticipantId,
        available: bool,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE participants SET available = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(available)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Update profile fields, keeping the stored value where the update has none.
    /// Returns None if the id is unknown.
    pub async fn update_profile(
        id: ParticipantId,
        update: &ProfileUpdate,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE participants
             SET display_name = COALESCE($2, display_name),
                 role_title = COALESCE($3, role_title),
                 organization = COALESCE($4, organization)
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&update.display_name)
        .bind(&update.role_title)
        .bind(&update.organization)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Update ban flag. Returns None if the id is unknown.
    pub async fn update_banned(
        id: ParticipantId,
        banned: bool,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("UPDATE participants SET banned = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(banned)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(available: bool, banned: bool) -> Participant {
        Participant {
            id: ParticipantId::new(),
            external_id: "100200300".to_string(),
            username: Some("olga_k".to_string()),
            display_name: "Olga K.".to_string(),
            role_title: "Backend engineer".to_string(),
            organization: "Northwind".to_string(),
            available,
            banned,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn banned_participant_is_never_eligible() {
        assert!(!participant(true, true).is_eligible());
        assert!(!participant(false, true).is_eligible());
    }

    #[test]
    fn only_available_unbanned_is_eligible() {
        assert!(participant(true, false).is_eligible());
        assert!(!participant(false, false).is_eligible());
    }

    #[test]
    fn status_prefers_banned_over_availability() {
        assert_eq!(participant(true, true).status(), ParticipantStatus::Banned);
        assert_eq!(participant(true, false).status(), ParticipantStatus::Free);
        assert_eq!(participant(false, false).status(), ParticipantStatus::Busy);
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ParticipantStatus::Banned).unwrap(),
            "\"banned\""
        );
    }

    #[test]
    fn profile_update_keeps_unset_fields() {
        let mut p = participant(true, false);
        ProfileUpdate {
            role_title: Some("Staff engineer".to_string()),
            ..Default::default()
        }
        .apply_to(&mut p);

        assert_eq!(p.role_title, "Staff engineer");
        assert_eq!(p.display_name, "Olga K.");
        assert_eq!(p.organization, "Northwind");
    }
}
