//! Participant domain actions - registration, profile, moderation and availability

mod availability;
mod moderation;
mod profile;
mod queries;
mod register_participant;

pub use availability::request_new_partner;
pub use moderation::{ban_participant, unban_participant};
pub use profile::update_profile;
pub use queries::{list_participants, ParticipantOverview};
pub use register_participant::register_participant;
