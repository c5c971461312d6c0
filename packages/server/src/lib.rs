// Community pairing service - Core
//
// Periodically pairs free participants into one-on-one meetings, never pairing
// the same two people again within the recency window.
//
// Domain logic lives in domains/*; store traits, Postgres adapters, test
// doubles and the scheduler live in kernel/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
