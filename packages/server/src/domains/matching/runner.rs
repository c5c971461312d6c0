//! Round runner - serializes round triggers.
//!
//! The cron job and manual admin triggers share one runner per process. Across
//! processes (server and `admin_cli`) rounds are serialized by the round lock in
//! `ServerDeps`. A trigger that arrives while a round is in flight, here or
//! elsewhere, is skipped rather than queued, so at most one round touches the
//! stores at a time.

use std::fmt;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::domains::matching::actions::run_round;
use crate::domains::matching::errors::{RoundError, RoundStep};
use crate::domains::matching::models::RoundOutcome;
use crate::domains::matching::settings::MatchingSettings;
use crate::kernel::ServerDeps;

/// Who asked for the round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Scheduled,
    Manual,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => f.write_str("scheduled"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

#[derive(Debug)]
pub enum RoundTrigger {
    Completed(RoundOutcome),
    /// Another round was still running
    Skipped,
}

pub struct RoundRunner {
    deps: ServerDeps,
    settings: MatchingSettings,
    in_flight: Mutex<()>,
}

impl RoundRunner {
    pub fn new(deps: ServerDeps, settings: MatchingSettings) -> Self {
        Self {
            deps,
            settings,
            in_flight: Mutex::new(()),
        }
    }

    /// Run a round unless one is already running
    pub async fn trigger(&self, source: TriggerSource) -> Result<RoundTrigger, RoundError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!("Skipping {} matching round: previous round still running", source);
            return Ok(RoundTrigger::Skipped);
        };

        let lease = match self.deps.round_lock.try_acquire().await {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                warn!("Skipping {} matching round: another process is running one", source);
                return Ok(RoundTrigger::Skipped);
            }
            Err(e) => {
                let e = RoundError::new(RoundStep::AcquireLock, 0, e);
                error!("{} matching round not started: {}", source, e);
                return Err(e);
            }
        };

        info!("Running {} matching round", source);
        let result = run_round(&self.deps, &self.settings).await;
        if let Err(e) = lease.release().await {
            warn!("Failed to release round lock: {}", e);
        }

        match result {
            Ok(outcome) => {
                info!(
                    "{} matching round completed. Created {} pairs.",
                    source,
                    outcome.pairs.len()
                );
                Ok(RoundTrigger::Completed(outcome))
            }
            Err(e) => {
                error!(
                    step = %e.step,
                    pairs_applied = e.pairs_applied,
                    partial = e.left_partial_effects(),
                    "{} matching round failed: {}",
                    source,
                    e
                );
                Err(e)
            }
        }
    }
}
