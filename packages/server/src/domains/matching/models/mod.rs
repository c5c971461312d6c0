pub mod match_record;
pub mod outcome;

pub use match_record::{MatchRecord, NewMatchRecord};
pub use outcome::{MatchedPair, RoundOutcome};
