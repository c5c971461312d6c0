//! Participant domain - community members who get paired
//!
//! Registration and moderation are thin wrappers over the participant store;
//! the matching domain only reads `available`/`banned` and writes `available`.

pub mod actions;
pub mod models;

pub use models::{NewParticipant, Participant, ParticipantStatus, ProfileUpdate};
