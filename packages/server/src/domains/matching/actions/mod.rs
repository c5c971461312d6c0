//! Matching domain actions - business logic functions
//!
//! Actions are async functions called by the round runner (scheduled or
//! manual trigger) and the admin CLI. They take `ServerDeps` and return plain results.

mod history;
mod run_round;

pub use history::list_match_history;
pub use run_round::{run_round, run_round_with};
