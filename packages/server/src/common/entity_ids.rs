//! Typed ID definitions for the domain entities.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Participant entities (community members who get paired).
pub struct Participant;

/// Marker type for MatchRecord entities (one stored pairing).
pub struct MatchRecord;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for Participant entities. This is the internal id used in match history.
pub type ParticipantId = Id<Participant>;

/// Typed ID for MatchRecord entities.
pub type MatchId = Id<MatchRecord>;
