//! Matching domain - pairs free participants into one-on-one meetings
//!
//! Flow:
//!   trigger (cron / admin) → RoundRunner → run_round
//!     → PairingEngine (shuffle + greedy scan, RecencyOracle per candidate pair)
//!     → availability updates → one batch insert into match history

pub mod actions;
pub mod errors;
pub mod models;
pub mod pairing;
pub mod recency;
pub mod runner;
pub mod settings;

pub use errors::{RoundError, RoundStep};
pub use models::{MatchRecord, MatchedPair, NewMatchRecord, RoundOutcome};
pub use pairing::{FisherYates, Pairing, PairingEngine, Shuffler};
pub use recency::{was_recently_matched, RecencyCheck, RecencyOracle};
pub use runner::{RoundRunner, RoundTrigger, TriggerSource};
pub use settings::{
    parse_recency_window_days, MatchingSettings, RecencyLookupPolicy, DEFAULT_RECENCY_WINDOW_DAYS,
    MAX_RECENCY_WINDOW_DAYS,
};
