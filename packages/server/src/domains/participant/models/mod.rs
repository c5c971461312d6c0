pub mod participant;

pub use participant::{NewParticipant, Participant, ParticipantStatus, ProfileUpdate};
